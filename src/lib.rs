pub mod api;
pub mod attachments;
pub mod config;
pub mod conversation;
pub mod model;
pub mod notify;
pub mod storage;
pub mod ws;
