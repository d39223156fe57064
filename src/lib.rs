pub mod bus;
pub mod chat;
pub mod config;
pub mod directory;
pub mod entity;
pub mod error;
pub mod membership;
pub mod messages;
pub mod reactions;
pub mod repository;
pub mod server;
pub mod service;
pub mod store;
pub mod subscription;
pub mod upload;

#[cfg(test)]
mod testing;

pub use error::{ChatError, Result};
pub use service::ChatService;
