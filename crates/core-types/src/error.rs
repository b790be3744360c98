use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Row has {values} values but the projection has {columns} columns")]
    ColumnMismatch { columns: usize, values: usize },
}
