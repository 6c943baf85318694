pub mod admin;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod products;
pub mod reconcile;
pub mod resolve;
pub mod schema;
pub mod store;
