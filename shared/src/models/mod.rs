//! Domain models for the logistics platform

mod carrier;
mod inventory;
mod product;
mod purchase_order;
mod sales_order;
mod supplier;
mod user;
mod warehouse;

pub use carrier::*;
pub use inventory::*;
pub use product::*;
pub use purchase_order::*;
pub use sales_order::*;
pub use supplier::*;
pub use user::*;
pub use warehouse::*;

/// A stored enum value that no variant matches
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
