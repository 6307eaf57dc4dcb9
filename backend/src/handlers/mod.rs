//! HTTP handlers for the logistics platform

pub mod admin;
pub mod catalog;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod users;

pub use admin::*;
pub use catalog::*;
pub use health::*;
pub use inventory::*;
pub use orders::*;
pub use users::*;
