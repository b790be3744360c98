//! # fred-data Core Types
//!
//! The shared data model for the service: the dynamically-typed `Value`
//! produced by the database driver, the ordered `Row` and `ResultSet`
//! built from it, and the compile-time `Series` catalogue.
//!
//! As a Layer 0 crate it has no knowledge of the database or HTTP layers.

pub mod error;
pub mod row;
pub mod series;
pub mod value;

// Re-export the core types to provide a clean public API.
pub use error::CoreError;
pub use row::{ResultSet, Row};
pub use series::{DateRange, Series, SeriesKind};
pub use value::Value;
