//! Shared types, models and fulfillment logic for the logistics platform
//!
//! This crate holds everything that does not touch I/O: the domain models,
//! input validation helpers and the stock allocation core used by the
//! backend services and the browser (via WASM).

pub mod fulfillment;
pub mod models;
pub mod types;
pub mod validation;

pub use fulfillment::*;
pub use models::*;
pub use types::*;
pub use validation::*;
