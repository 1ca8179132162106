//! Application services layer.

pub mod articles;
pub mod error;
pub mod pagination;
pub mod render;
pub mod repos;
