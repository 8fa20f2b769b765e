//! # Tipline Common Library
//!
//! Shared code for the tipline service:
//! - Database schema, initialization, and settings access
//! - Domain models and status enums
//! - Embargo window computation
//! - Configuration loading
//! - Pagination utilities

pub mod config;
pub mod db;
pub mod embargo;
pub mod error;
pub mod models;
pub mod pagination;

pub use error::{Error, Result};
pub use models::Role;
