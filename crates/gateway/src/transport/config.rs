//! Logical addresses
//!
//! Envelopes carry string addresses so replies can be routed back to whoever
//! asked, and so logs name both ends of every exchange.

use meridian_core::Address;

pub struct Addresses;

impl Addresses {
    /// The gateway task manager: `gateway/dcxt`
    pub fn gateway() -> Address {
        Address::new("gateway/dcxt")
    }

    /// An agent control loop: `agent/{name}`
    pub fn agent(name: &str) -> Address {
        Address::new(format!("agent/{}", name))
    }

    /// Outcome notifications for an agent: `notifications.{name}`
    pub fn notifications(name: &str) -> String {
        format!("notifications.{}", name)
    }
}
