//! Authenticated HTTPS reboot trigger.

pub mod action;
pub mod audit;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod security;
pub mod trigger;

pub use config::TriggerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use trigger::TriggerHandler;
