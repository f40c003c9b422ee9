// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error types for the metrology engine and optimizers.

use std::fmt;

/// Result type alias for metrology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate error types.
#[derive(Debug)]
pub enum Error {
    /// Configuration error
    Config(String),
    /// Input contract violation
    Validation(ValidationError),
    /// Numerical failure
    Numerical(NumericalError),
    /// Optimization method cannot drive the requested objective
    UnsupportedMethod {
        method: String,
        objective: String,
        alternatives: Vec<String>,
    },
    /// IO error
    Io(std::io::Error),
    /// Serialization error
    Serialization(String),
}

impl Error {
    /// Whether an optimizer may value the offending candidate as
    /// non-improving and continue the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Numerical(NumericalError::SingularMatrix(_)))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(msg) => write!(f, "Configuration error: {}", msg),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Numerical(e) => write!(f, "Numerical error: {}", e),
            Error::UnsupportedMethod {
                method,
                objective,
                alternatives,
            } => write!(
                f,
                "{} is not available when the objective function is {}. Supported methods are {}",
                method,
                objective,
                alternatives.join(", ")
            ),
            Error::Io(e) => write!(f, "IO error: {}", e),
            Error::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Numerical(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Validation(e)
    }
}

impl From<NumericalError> for Error {
    fn from(e: NumericalError) -> Self {
        Error::Numerical(e)
    }
}

impl From<serde_yml::Error> for Error {
    fn from(e: serde_yml::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Input contract violations.
#[derive(Debug)]
pub enum ValidationError {
    /// Field validation failed
    Field { field: String, message: String },
    /// Matrix or vector has the wrong shape
    DimensionMismatch {
        what: String,
        expected: String,
        actual: String,
    },
    /// Number of derivative operators does not match the parameter count
    ParameterCount { expected: usize, actual: usize },
    /// Enumerated option outside its closed set
    UnknownVariant {
        field: String,
        value: String,
        expected: String,
    },
    /// Physics constraint violated
    PhysicsConstraint(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Field { field, message } => {
                write!(f, "Field '{}': {}", field, message)
            }
            ValidationError::DimensionMismatch {
                what,
                expected,
                actual,
            } => write!(
                f,
                "Dimension mismatch for {}: expected {}, got {}",
                what, expected, actual
            ),
            ValidationError::ParameterCount { expected, actual } => write!(
                f,
                "Parameter count mismatch: expected {}, got {}",
                expected, actual
            ),
            ValidationError::UnknownVariant {
                field,
                value,
                expected,
            } => write!(
                f,
                "{} should be chosen in {}, got '{}'",
                field, expected, value
            ),
            ValidationError::PhysicsConstraint(msg) => {
                write!(f, "Physics constraint violated: {}", msg)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Numerical failures raised by the linear-algebra core.
#[derive(Debug)]
pub enum NumericalError {
    /// Matrix could not be inverted or orthonormalized
    SingularMatrix(String),
    /// Eigendecomposition produced an unusable result
    EigenDecomposition(String),
    /// NaN or infinity encountered
    NonFinite(String),
}

impl fmt::Display for NumericalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericalError::SingularMatrix(msg) => write!(f, "Singular matrix: {}", msg),
            NumericalError::EigenDecomposition(msg) => {
                write!(f, "Eigendecomposition failed: {}", msg)
            }
            NumericalError::NonFinite(msg) => write!(f, "Non-finite value: {}", msg),
        }
    }
}

impl std::error::Error for NumericalError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_error_display_config() {
        let e = Error::Config("popsize must be > 0".into());
        assert_eq!(e.to_string(), "Configuration error: popsize must be > 0");
    }

    #[test]
    fn test_error_display_unknown_variant() {
        let e = Error::Validation(ValidationError::UnknownVariant {
            field: "rep".into(),
            value: "diag".into(),
            expected: "{original, eigen}".into(),
        });
        assert_eq!(
            e.to_string(),
            "Validation error: rep should be chosen in {original, eigen}, got 'diag'"
        );
    }

    #[test]
    fn test_error_display_parameter_count() {
        let e = ValidationError::ParameterCount {
            expected: 2,
            actual: 3,
        };
        assert_eq!(e.to_string(), "Parameter count mismatch: expected 2, got 3");
    }

    #[test]
    fn test_error_display_unsupported_method() {
        let e = Error::UnsupportedMethod {
            method: "AD".into(),
            objective: "HCRB".into(),
            alternatives: vec!["PSO".into(), "DE".into(), "NM".into(), "DDPG".into()],
        };
        assert_eq!(
            e.to_string(),
            "AD is not available when the objective function is HCRB. Supported methods are PSO, DE, NM, DDPG"
        );
    }

    #[test]
    fn test_error_display_numerical() {
        let e = Error::Numerical(NumericalError::SingularMatrix("pivot 0".into()));
        assert_eq!(e.to_string(), "Numerical error: Singular matrix: pivot 0");
    }

    #[test]
    fn test_recoverable_only_for_singular() {
        assert!(Error::Numerical(NumericalError::SingularMatrix("x".into())).is_recoverable());
        assert!(!Error::Numerical(NumericalError::EigenDecomposition("x".into())).is_recoverable());
        assert!(!Error::Config("x".into()).is_recoverable());
    }

    #[test]
    fn test_error_source() {
        assert!(Error::Io(std::io::Error::other("disk")).source().is_some());
        assert!(Error::Numerical(NumericalError::NonFinite("x".into()))
            .source()
            .is_some());
        assert!(Error::Config("x".into()).source().is_none());
    }

    #[test]
    fn test_from_serde_yaml_error() {
        let yaml_err = serde_yml::from_str::<serde_yml::Value>("{{{{").unwrap_err();
        let e: Error = yaml_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let e: Error = json_err.into();
        assert!(matches!(e, Error::Serialization(_)));
    }
}
