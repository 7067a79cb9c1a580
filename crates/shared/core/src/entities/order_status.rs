use serde::{Deserialize, Serialize};

/// Order lifecycle status as reported by a venue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created locally, not yet sent
    New,
    /// Resting on the venue
    Open,
    /// Partially filled
    PartiallyFilled,
    /// Completely filled
    Filled,
    /// Cancelled by the user or the venue
    Cancelled,
    /// Rejected by the venue
    Rejected,
    /// Expired (time in force elapsed)
    Expired,
}

impl OrderStatus {
    /// Returns true if the order is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Cancelled
                | OrderStatus::Rejected
                | OrderStatus::Expired
        )
    }

    /// Returns true if the order is still working on the venue
    pub fn is_active(&self) -> bool {
        matches!(self, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    /// Returns true if the venue refused or dropped the order without a fill
    pub fn is_failure(&self) -> bool {
        matches!(self, OrderStatus::Rejected | OrderStatus::Expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classes() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(!OrderStatus::Filled.is_failure());
        assert!(OrderStatus::Rejected.is_failure());
        assert!(OrderStatus::Open.is_active());
        assert!(!OrderStatus::New.is_active());
    }
}
