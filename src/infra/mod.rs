//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod error;
pub mod fs;
pub mod http;
pub mod telemetry;
