// Tables read by the analytics repository
pub mod entry;
pub mod entry_detail;
pub mod inventory;
pub mod inventory_snapshot;
pub mod product;
pub mod sale;
pub mod sale_detail;
pub mod store;
pub mod store_on_inventory;
