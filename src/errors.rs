//! Centralized error handling for parasub
//!
//! This module provides structured error types to replace the generic `Box<dyn Error>`
//! pattern, enabling better error context and type safety. Configuration errors
//! (bad slice specs, shape mismatches, unknown names) are recoverable and surface
//! through these types; divergence inside a collective region is not recoverable
//! and goes through [`crate::comm::group_abort`] instead.

use std::fmt;

/// Main error type for parasub operations
#[derive(Debug)]
pub enum SubsetError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// I/O operation errors
    IoError(std::io::Error),

    /// Variable not found in a dataset
    VariableNotFound { var: String },

    /// Dimension not found in a dataset
    DimensionNotFound { dim: String },

    /// Invalid slice specification
    InvalidSlice { message: String },

    /// Invalid lat/lon box specification
    InvalidBox { message: String },

    /// Array shapes do not conform for the requested operation
    ShapeMismatch { message: String },

    /// Aggregating dimensions of differing identity
    NameMismatch { expected: String, found: String },

    /// Datasets cannot be aggregated (dimension or variable lists differ)
    AggregationError { message: String },

    /// Worker group / thread pool configuration error
    GroupError(String),

    /// Array shape or dimension error from the ndarray glue
    ArrayError(ndarray::ShapeError),

    /// Generic error
    Generic(String),
}

impl fmt::Display for SubsetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubsetError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            SubsetError::IoError(e) => write!(f, "I/O error: {}", e),
            SubsetError::VariableNotFound { var } => {
                write!(f, "Variable '{}' not found in dataset", var)
            }
            SubsetError::DimensionNotFound { dim } => {
                write!(f, "Dimension '{}' not found in dataset", dim)
            }
            SubsetError::InvalidSlice { message } => {
                write!(f, "Invalid slice specification: {}", message)
            }
            SubsetError::InvalidBox { message } => {
                write!(f, "Invalid lat/lon box specification: {}", message)
            }
            SubsetError::ShapeMismatch { message } => write!(f, "Shape mismatch: {}", message),
            SubsetError::NameMismatch { expected, found } => {
                write!(f, "Name mismatch: expected '{}', found '{}'", expected, found)
            }
            SubsetError::AggregationError { message } => {
                write!(f, "Aggregation error: {}", message)
            }
            SubsetError::GroupError(msg) => write!(f, "Worker group error: {}", msg),
            SubsetError::ArrayError(e) => write!(f, "Array error: {}", e),
            SubsetError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SubsetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubsetError::NetCDFError(e) => Some(e),
            SubsetError::IoError(e) => Some(e),
            SubsetError::ArrayError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for SubsetError {
    fn from(error: netcdf::Error) -> Self {
        SubsetError::NetCDFError(error)
    }
}

impl From<std::io::Error> for SubsetError {
    fn from(error: std::io::Error) -> Self {
        SubsetError::IoError(error)
    }
}

impl From<ndarray::ShapeError> for SubsetError {
    fn from(error: ndarray::ShapeError) -> Self {
        SubsetError::ArrayError(error)
    }
}

impl From<String> for SubsetError {
    fn from(error: String) -> Self {
        SubsetError::Generic(error)
    }
}

impl From<&str> for SubsetError {
    fn from(error: &str) -> Self {
        SubsetError::Generic(error.to_string())
    }
}

/// Result type alias for parasub operations
pub type Result<T> = std::result::Result<T, SubsetError>;
