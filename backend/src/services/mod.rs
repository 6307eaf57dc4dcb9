//! Business logic services for the logistics platform

pub mod carrier;
pub mod inventory;
pub mod product;
pub mod purchase_order;
pub mod sales_order;
pub mod supplier;
pub mod user;
pub mod warehouse;

pub use carrier::CarrierService;
pub use inventory::InventoryService;
pub use product::ProductService;
pub use purchase_order::PurchaseOrderService;
pub use sales_order::SalesOrderService;
pub use supplier::SupplierService;
pub use user::UserService;
pub use warehouse::WarehouseService;
