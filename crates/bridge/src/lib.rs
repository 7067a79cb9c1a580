//! Meridian Bridge Tracker
//!
//! Follows cross-chain transfers from the initial bridge request until the
//! bridge reports a terminal status. Requests and status checks go through
//! the gateway like every other call; the tracker only decides when to ask
//! and what an answer means.

pub mod error;
pub mod tracker;

pub use error::{BridgeError, Result};
pub use tracker::{BridgeRecord, BridgeRequestTracker, StatusUpdate, TransferState};
