use serde::{Deserialize, Serialize};

use crate::values::{Quantity, Venue};

/// Token allowance a venue contract needs before the agent can trade through it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Venue whose contracts spend the token
    pub venue: Venue,
    pub token: String,
    pub spender: String,
    pub amount: Quantity,
}
