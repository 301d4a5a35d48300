//! Plan-and-apply loop
//!
//! 1. Refreshing - read every resource in state from the remote
//! 2. Planning - compare manifest, refreshed state and schema per resource
//! 3. Executing - apply changes in parallel with progress and confirmation

pub mod differ;
pub mod executor;
pub mod planner;

pub use planner::{Failure, Plan, Refresh};
