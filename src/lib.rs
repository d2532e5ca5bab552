pub mod config;
pub mod error;
pub mod explore;
pub mod hardware;
pub mod messages;
pub mod runtime;
