//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and the embedded schema
//! - SQLite pragma configuration
//! - Repository layer over funds, portfolio, quotas and movements

pub mod migrations;
pub mod repo;

pub use migrations::init_db;
pub use repo::Repository;
