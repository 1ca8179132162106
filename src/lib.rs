//! folio: a small markdown blog server.
//!
//! Articles are markdown files in a directory. They are listed newest first,
//! rendered to HTML with highlighted code on the server and served over axum
//! with content-encoding negotiation.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
