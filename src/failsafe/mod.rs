//! # Failsafe Module
//!
//! The station-side failsafe latch and the alert-to-action decision table.

pub mod decision;
pub mod state;

pub use decision::{decide, Decision};
pub use state::{
    Activation, FailsafeAction, FailsafeAuthority, FailsafeEvent, FailsafeEventKind, FailsafeSnapshot,
    FailsafeState,
};
