pub mod config;
pub mod db;
pub mod log;
pub mod managers;
pub mod server;
pub mod services;
pub mod span;
pub mod websocket;
