#![forbid(unsafe_code)]

pub mod catalog;
pub mod common;
pub mod layout;
pub mod state;

pub use common::{ContractViolation, ReasonCodeId, SchemaVersion, Validate};
