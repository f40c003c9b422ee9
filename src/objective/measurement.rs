// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Measurement objective: fixed `(ρ, ∂ρ)`, candidate POVM, CFIM only.

use ndarray::Array2;
use num_complex::Complex64;

use super::{BoundEvaluator, BoundKind, Objective, ObjectiveOptions};
use crate::error::{Result, ValidationError};
use crate::measurement::MeasurementParam;
use crate::optimize::{Candidate, SearchSpace};
use crate::validation::{validate_density_matrix, validate_derivatives};

pub struct MeasurementObjective {
    rho: Array2<Complex64>,
    drho: Vec<Array2<Complex64>>,
    evaluator: BoundEvaluator,
    space: SearchSpace,
}

impl MeasurementObjective {
    pub fn new(
        rho: Array2<Complex64>,
        drho: Vec<Array2<Complex64>>,
        param: MeasurementParam,
        options: ObjectiveOptions,
    ) -> Result<Self> {
        validate_density_matrix(&rho, 1e-8)?;
        let dim = validate_derivatives(&rho, &drho)?;
        param.validate(dim)?;
        let evaluator = BoundEvaluator::new(BoundKind::Cfim, dim, drho.len(), options)?;
        Ok(Self {
            rho,
            drho,
            evaluator,
            space: SearchSpace::Measurement { param, dim },
        })
    }
}

impl Objective for MeasurementObjective {
    fn space(&self) -> &SearchSpace {
        &self.space
    }

    fn bound(&self) -> BoundKind {
        BoundKind::Cfim
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64> {
        let Candidate::Measurement(m) = self.space.decode(x)? else {
            return Err(ValidationError::Field {
                field: "x".into(),
                message: "expected a measurement".into(),
            }
            .into());
        };
        self.evaluator.value_with_povm(&self.rho, &self.drho, &m.povm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::{qfim, Basis, LdKind};
    use crate::linalg::{c, I};
    use crate::measurement::{computational_basis, MeasurementCandidate};
    use approx::assert_relative_eq;
    use ndarray::Array1;

    /// |+⟩ rotated about z: ∂ρ = −i[σz/2, ρ].
    fn phase_model() -> (Array2<Complex64>, Vec<Array2<Complex64>>) {
        let rho = Array2::from_elem((2, 2), c(0.5));
        let mut drho = Array2::zeros((2, 2));
        drho[[0, 1]] = -I * 0.5;
        drho[[1, 0]] = I * 0.5;
        (rho, vec![drho])
    }

    #[test]
    fn test_projective_measurement_attains_qfi() {
        let (rho, drho) = phase_model();
        let objective =
            MeasurementObjective::new(rho.clone(), drho.clone(), MeasurementParam::Projective, ObjectiveOptions::default())
                .unwrap();

        // σy eigenbasis is optimal for this model
        let s = 1.0 / 2f64.sqrt();
        let up = Array1::from(vec![c(s), I * s]);
        let down = Array1::from(vec![c(s), -I * s]);
        let x = MeasurementCandidate::from_projective_vectors(&[up, down]);
        let cfi = objective.evaluate(&x).unwrap();

        let qfi = qfim(&rho, &drho, LdKind::Sld, Basis::Original, 1e-8)
            .unwrap()
            .as_scalar()
            .unwrap();
        assert_relative_eq!(cfi, qfi, epsilon = 1e-8);

        let z = MeasurementCandidate::from_projective_vectors(&[
            Array1::from(vec![c(1.0), c(0.0)]),
            Array1::from(vec![c(0.0), c(1.0)]),
        ]);
        assert!(objective.evaluate(&z).unwrap().abs() < 1e-10);
    }

    #[test]
    fn test_rotation_measurement() {
        let (rho, drho) = phase_model();
        let param = MeasurementParam::Rotation {
            basis: computational_basis(2),
        };
        let objective = MeasurementObjective::new(rho, drho, param, ObjectiveOptions::default()).unwrap();
        assert_eq!(objective.bound(), BoundKind::Cfim);
        assert_eq!(objective.space().dimension(), 3);
        let value = objective.evaluate(&[0.0, 0.0, 0.0]).unwrap();
        assert!(value.abs() < 1e-10);
    }

    #[test]
    fn test_rejects_invalid_state() {
        let (_, drho) = phase_model();
        let bad = Array2::from_elem((2, 2), c(1.0));
        assert!(MeasurementObjective::new(bad, drho, MeasurementParam::Projective, ObjectiveOptions::default())
            .is_err());
    }
}
