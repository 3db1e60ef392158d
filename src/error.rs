//! Error types for slotquery
//!
//! Two concerns can fail: parsing a document into the DOM value tree, and
//! reading or writing a computed accessor property. Each gets its own error
//! enum, wrapped by a top-level `Error`.
//!
//! All errors use the `thiserror` crate for minimal boilerplate and
//! proper error trait implementations.

use thiserror::Error;

/// Result type alias for slotquery operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for slotquery.
#[derive(Error, Debug)]
pub enum Error {
  /// HTML parsing error
  #[error("Parse error: {0}")]
  Parse(#[from] ParseError),

  /// Computed-property access error
  #[error("Accessor error: {0}")]
  Accessor(#[from] AccessorError),
}

/// Errors that occur while parsing HTML into the document tree.
#[derive(Error, Debug)]
pub enum ParseError {
  /// The input could not be parsed as HTML.
  #[error("Invalid HTML: {message}")]
  InvalidHtml { message: String },
}

/// Errors surfaced by the computed-property registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessorError {
  /// No descriptor has been installed under this key.
  #[error("property '{key}' is not defined")]
  UndefinedProperty { key: String },

  /// Accessor properties carry no setter; writes are always rejected.
  #[error("property '{key}' is read-only")]
  ReadOnlyProperty { key: String },
}
