pub mod cli;
pub mod config;
pub mod error;
pub mod inventory;
pub mod layout;
pub mod persist;
pub mod server;
pub mod store;
