use std::fmt;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Failed to load environment variables for database connection: {0}")]
    ConnectionConfigError(String),

    #[error("Failed to connect to the database: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error(transparent)]
    Query(#[from] QueryError),
}

/// The point in the execution pipeline at which a query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStage {
    /// Submitting the statement or receiving its first response.
    Execute,
    /// Resolving the column list of the result.
    Columns,
    /// Decoding a row's values.
    Scan,
    /// Reading further rows from the cursor.
    Iterate,
    /// The caller cancelled the query before it completed.
    Cancelled,
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            QueryStage::Execute => "execute",
            QueryStage::Columns => "columns",
            QueryStage::Scan => "scan",
            QueryStage::Iterate => "iterate",
            QueryStage::Cancelled => "cancelled",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
#[error("Query failed at stage '{stage}': {source}")]
pub struct QueryError {
    pub stage: QueryStage,
    #[source]
    pub source: BoxError,
}

impl QueryError {
    pub fn new(stage: QueryStage, source: impl Into<BoxError>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}
