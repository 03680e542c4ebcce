use thiserror::Error;


/// Result type alias using scalargrad's [Error].

pub type Result<T> = std::result::Result<T, Error>;


/// Errors raised while building or differentiating a computation graph.

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
  /// An operator received an operand kind it does not support.
  #[error("Unsupported operand type {operand} for '{operator}'")]
  TypeMismatch {
    /// Kind of the rejected operand
    operand: String,
    /// Symbol of the operator
    operator: String,
  },

  /// Input lies outside the domain of a function.
  #[error("Domain error: {operation} is undefined for {value}")]
  DomainError {
    operation: &'static str,
    value: f64,
  },

  #[error("Division by zero")]
  DivisionByZero,

  /// A cycle was found in a provenance graph.
  ///
  /// Graphs built through this crate are acyclic, so this signals a broken invariant.
  #[error("Structural violation: cycle through node {node}")]
  StructuralViolation {
    node: usize,
  },

  /// Elementwise operation over slices of different lengths.
  #[error("Length mismatch: {lhs} vs {rhs}")]
  LengthMismatch {
    lhs: usize,
    rhs: usize,
  },

  #[error("IO error: {0}")]
  Io(String),

  #[error("Serialization error: {0}")]
  Serialization(String),
}


impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Self {
    Self::Io(err.to_string())
  }
}

impl From<postcard::Error> for Error {
  fn from(err: postcard::Error) -> Self {
    Self::Serialization(err.to_string())
  }
}
