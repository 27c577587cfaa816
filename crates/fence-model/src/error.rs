//! Error types for the model layer

/// Errors raised while building model values from untrusted input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Operation name outside the closed set of kinds
    #[error("unknown operation: '{0}'")]
    UnknownOperation(String),

    /// JSON value that should have been an object
    #[error("expected a JSON object, got {0}")]
    NotARecord(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_operation_display() {
        let err = ModelError::UnknownOperation("findRandom".to_string());
        assert_eq!(err.to_string(), "unknown operation: 'findRandom'");
    }
}
