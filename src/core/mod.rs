pub mod chat;
pub mod config;
pub mod ids;
pub mod message;
pub mod routes;
pub mod storage;
pub mod text_wrapping;
pub mod token_store;
