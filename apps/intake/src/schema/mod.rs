pub mod defaults;
pub mod handlers;
pub mod models;
pub mod resolver;
pub mod store;
