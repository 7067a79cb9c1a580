//! Control loop states
//!
//! Each state is a persistent object driven by repeated `tick` calls. A tick
//! does a bounded amount of work and returns `Some(event)` once the state is
//! finished. `setup` is called every time the state is entered and resets
//! its resumption data.

mod approvals;
mod bridge;
mod collect;
mod error;
mod execute;
mod identify;
mod post_trade;
mod setup;
mod wait;

pub use approvals::SetApprovals;
pub use bridge::CheckBridgeRequest;
pub use collect::{Collect, CollectScope};
pub use error::ErrorState;
pub use execute::ExecuteOrders;
pub use identify::IdentifyOpportunity;
pub use post_trade::PostTrade;
pub use setup::Setup;
pub use wait::{CoolDown, NoOpportunity};

use crate::context::StateContext;
use crate::error::Result;
use crate::transitions::Event;

pub(crate) trait State {
    /// Reset resumption data on (re)entry
    fn setup(&mut self);

    /// Advance by one step
    async fn tick(&mut self, ctx: &mut StateContext) -> Result<Option<Event>>;
}
