// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Closed option sets and result types for the information engine.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Logarithmic derivative family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LdKind {
    /// Symmetric logarithmic derivative: ∂ρ = (ρL + Lρ)/2.
    #[default]
    Sld,
    /// Right logarithmic derivative: ∂ρ = ρL.
    Rld,
    /// Left logarithmic derivative: ∂ρ = L†ρ.
    Lld,
}

impl fmt::Display for LdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LdKind::Sld => write!(f, "SLD"),
            LdKind::Rld => write!(f, "RLD"),
            LdKind::Lld => write!(f, "LLD"),
        }
    }
}

impl FromStr for LdKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SLD" | "sld" => Ok(LdKind::Sld),
            "RLD" | "rld" => Ok(LdKind::Rld),
            "LLD" | "lld" => Ok(LdKind::Lld),
            other => Err(ValidationError::UnknownVariant {
                field: "dtype".into(),
                value: other.into(),
                expected: "{SLD, RLD, LLD}".into(),
            }),
        }
    }
}

/// Representation basis for logarithmic derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    /// Same basis as the density matrix.
    #[default]
    Original,
    /// Eigenbasis of the density matrix.
    Eigen,
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::Original => write!(f, "original"),
            Basis::Eigen => write!(f, "eigen"),
        }
    }
}

impl FromStr for Basis {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Basis::Original),
            "eigen" => Ok(Basis::Eigen),
            other => Err(ValidationError::UnknownVariant {
                field: "rep".into(),
                value: other.into(),
                expected: "{original, eigen}".into(),
            }),
        }
    }
}

/// Fisher information: a scalar for one parameter, a matrix otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Information {
    Scalar(f64),
    Matrix(Array2<f64>),
}

impl Information {
    /// Collapse a `P × P` matrix to a scalar when `P = 1`.
    pub fn from_matrix(m: Array2<f64>) -> Self {
        if m.dim() == (1, 1) {
            Information::Scalar(m[[0, 0]])
        } else {
            Information::Matrix(m)
        }
    }

    /// Number of estimated parameters.
    pub fn param_num(&self) -> usize {
        match self {
            Information::Scalar(_) => 1,
            Information::Matrix(m) => m.nrows(),
        }
    }

    /// The scalar value, if this is single-parameter information.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Information::Scalar(v) => Some(*v),
            Information::Matrix(_) => None,
        }
    }

    /// Matrix view; a scalar becomes a `1 × 1` matrix.
    pub fn to_matrix(&self) -> Array2<f64> {
        match self {
            Information::Scalar(v) => Array2::from_elem((1, 1), *v),
            Information::Matrix(m) => m.clone(),
        }
    }
}

/// Result of a Holevo bound computation.
#[derive(Debug, Clone)]
pub struct HolevoBound {
    /// Minimized `Tr(W Re Z) + ‖√W Im Z √W‖₁`.
    pub value: f64,
    /// Optimal Hermitian operators `X_i`, one per parameter.
    pub x: Vec<Array2<num_complex::Complex64>>,
    /// Distance from `value` to the best certified lower bound.
    pub gap: f64,
    /// L-BFGS iterations over all smoothing stages.
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ld_kind_parse() {
        assert_eq!("SLD".parse::<LdKind>().unwrap(), LdKind::Sld);
        assert_eq!("rld".parse::<LdKind>().unwrap(), LdKind::Rld);
        let err = "XLD".parse::<LdKind>().unwrap_err();
        assert_eq!(err.to_string(), "dtype should be chosen in {SLD, RLD, LLD}, got 'XLD'");
    }

    #[test]
    fn test_basis_parse() {
        assert_eq!("eigen".parse::<Basis>().unwrap(), Basis::Eigen);
        let err = "diag".parse::<Basis>().unwrap_err();
        assert_eq!(err.to_string(), "rep should be chosen in {original, eigen}, got 'diag'");
    }

    #[test]
    fn test_information_from_matrix() {
        let one = Information::from_matrix(Array2::from_elem((1, 1), 2.5));
        assert_eq!(one.as_scalar(), Some(2.5));
        assert_eq!(one.param_num(), 1);

        let two = Information::from_matrix(Array2::eye(2));
        assert_eq!(two.as_scalar(), None);
        assert_eq!(two.param_num(), 2);
        assert_eq!(two.to_matrix(), Array2::<f64>::eye(2));
    }

    #[test]
    fn test_ld_kind_serde() {
        let yaml = serde_yml::to_string(&LdKind::Rld).unwrap();
        assert!(yaml.contains("RLD"));
        let back: Basis = serde_yml::from_str("eigen").unwrap();
        assert_eq!(back, Basis::Eigen);
    }
}
