//! # fred-data Database Crate
//!
//! This crate is the application's only door to the hosted analytical
//! database that stores the FRED economic series.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application asks for a
//!   `Series` over a `DateRange` and receives a `ResultSet`.
//! - **Bound, never interpolated:** Request dates are always sent as query
//!   parameters and cast by the database.
//! - **Asynchronous & Pooled:** Queries run on a shared `PgPool`, so concurrent
//!   requests issue independent queries on independent connections.
//!
//! ## Public API
//!
//! - `connect` / `close`: open, verify and release the connection pool.
//! - `execute` / `QueryOptions`: run any parameterised statement into a `ResultSet`.
//! - `DbRepository`: one accessor per economic series.
//! - `SeriesSource`: the trait the HTTP layer consumes.
//! - `DbError` / `QueryError`: the errors returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod decode;
pub mod error;
pub mod executor;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{close, connect, ping};
pub use error::{DbError, QueryError, QueryStage};
pub use executor::{execute, QueryOptions};
pub use repository::{template, DbRepository, SeriesSource};
