pub mod baseline;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod readiness;
pub mod vault;
