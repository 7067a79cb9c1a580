//! Exchange and bridge adapters
//!
//! Live venue clients implement the `meridian-ports` traits outside this
//! crate. The paper adapters here keep state in memory and are used for dry
//! runs and tests.

pub mod paper;

pub use paper::{PaperBridge, PaperCall, PaperExchange};
