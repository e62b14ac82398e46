/// Database module for PostgreSQL integration
///
/// This module provides:
/// - Connection pooling and embedded migrations
/// - Repository traits with PostgreSQL and in-memory implementations
/// - Database models and schema
/// - Diesel ORM integration

pub mod connection;
pub mod models;
pub mod repositories;
pub mod schema;

pub use connection::{establish_connection_pool, DatabaseError, DatabasePool};
