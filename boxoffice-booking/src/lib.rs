pub mod controller;
pub mod lifecycle;

pub use controller::{BookingPolicy, InventoryController};
