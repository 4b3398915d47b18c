pub mod expiring;
pub mod fridge;
pub mod placement;
