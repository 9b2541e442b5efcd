//! Catalog browsing and chapter reading core for a MangaDex-style API.
//!
//! The crate is consumed by UI code: it owns pagination, sentinel-driven
//! loading, the chapter reading session and favorites, and exposes them
//! through [`internal::engine::Engine`] and the sans-IO state machines it
//! drives.

pub mod api;
pub mod config;
pub mod internal;
pub mod utils;

pub use api::{CatalogClient, CatalogSource, FetchError};
pub use config::AppConfig;
pub use internal::engine::{Action, Engine};
