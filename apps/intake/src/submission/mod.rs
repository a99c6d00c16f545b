pub mod handlers;
pub mod models;
pub mod normalizer;
pub mod persister;
pub mod router;
pub mod sanitize;
pub mod storage;
