//! Movement processing: request, settle and cancel subscriptions and redemptions.

pub mod locks;
pub mod processor;

pub use locks::MovementLocks;
pub use processor::{settled_movement, MovementProcessor, SettlementRules};
