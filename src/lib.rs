#![forbid(unsafe_code)]

//! Catalog/search data flow for the clipshare video app.
//!
//! The crate turns `(page, category, sort)` selections into provider search
//! requests, caches the provider's pagination cursors, normalizes raw
//! search/detail records into a uniform summary shape, and maintains the
//! observable catalog state the binaries serve.

pub mod catalog;
pub mod config;
pub mod cursor;
pub mod error;
pub mod normalize;
pub mod provider;
pub mod query;
