/*
Copyright 2017 Takashi Ogura

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/
use crate::errors::*;

/// weight of each translational degree of freedom
pub const TRANSLATION_WEIGHT: f64 = 2.0;
/// weight of the rotation around a fixed axis
pub const ROTATION_AXIS_WEIGHT: f64 = 2.0;
/// weight of each quaternion component
pub const QUATERNION_WEIGHT: f64 = 0.4;

/// Distance in the configuration space
pub trait DistanceMetric {
    fn distance(&self, c0: &[f64], c1: &[f64]) -> f64;
}

impl<F> DistanceMetric for F
where
    F: Fn(&[f64], &[f64]) -> f64,
{
    fn distance(&self, c0: &[f64], c1: &[f64]) -> f64 {
        self(c0, c1)
    }
}

/// Rotational degrees of freedom of the base
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AffineRotation {
    /// rotation around a fixed axis, one value
    Axis,
    /// quaternion, four values
    Quaternion,
}

/// Affine degrees of freedom appended after the joints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AffineDofs {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub rotation: Option<AffineRotation>,
}

impl AffineDofs {
    fn weights(&self) -> Vec<f64> {
        let mut weights = [self.x, self.y, self.z]
            .iter()
            .filter(|enabled| **enabled)
            .map(|_| TRANSLATION_WEIGHT)
            .collect::<Vec<_>>();
        match self.rotation {
            Some(AffineRotation::Axis) => weights.push(ROTATION_AXIS_WEIGHT),
            Some(AffineRotation::Quaternion) => weights.extend([QUATERNION_WEIGHT; 4]),
            None => {}
        }
        weights
    }
}

/// `sqrt(sum(w_i * (c0_i - c1_i)^2))`
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedDistanceMetric {
    weights: Vec<f64>,
}

impl WeightedDistanceMetric {
    /// Every weight must be positive and finite, so that only equal
    /// configurations are at distance zero
    pub fn new(weights: Vec<f64>) -> Result<Self> {
        if let Some(w) = weights.iter().find(|w| !(**w > 0.0 && w.is_finite())) {
            return Err(Error::Config(format!("invalid distance weight {}", w)));
        }
        Ok(WeightedDistanceMetric { weights })
    }

    /// Joint weights followed by the fixed weights of the affine dofs
    pub fn from_dofs(joint_weights: &[f64], affine: AffineDofs) -> Result<Self> {
        let mut weights = joint_weights.to_vec();
        weights.extend(affine.weights());
        Self::new(weights)
    }

    pub fn dof(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl DistanceMetric for WeightedDistanceMetric {
    fn distance(&self, c0: &[f64], c1: &[f64]) -> f64 {
        debug_assert_eq!(c0.len(), self.weights.len());
        debug_assert_eq!(c1.len(), self.weights.len());
        self.weights
            .iter()
            .zip(c0.iter().zip(c1.iter()))
            .map(|(w, (a, b))| w * (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_from_dofs() {
        let metric = WeightedDistanceMetric::from_dofs(
            &[1.0, 0.5],
            AffineDofs {
                x: true,
                y: true,
                z: false,
                rotation: Some(AffineRotation::Quaternion),
            },
        )
        .unwrap();
        assert_eq!(metric.weights(), &[1.0, 0.5, 2.0, 2.0, 0.4, 0.4, 0.4, 0.4]);

        let metric = WeightedDistanceMetric::from_dofs(
            &[1.0],
            AffineDofs {
                z: true,
                rotation: Some(AffineRotation::Axis),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(metric.dof(), 3);
        assert!(WeightedDistanceMetric::new(vec![1.0, -1.0]).is_err());
        assert!(WeightedDistanceMetric::new(vec![1.0, 0.0]).is_err());
        assert!(WeightedDistanceMetric::new(vec![1.0, f64::NAN]).is_err());
        assert!(WeightedDistanceMetric::new(vec![f64::INFINITY]).is_err());
        assert!(WeightedDistanceMetric::from_dofs(&[0.0], AffineDofs::default()).is_err());
    }

    #[test]
    fn test_metric_properties() {
        let metric = WeightedDistanceMetric::new(vec![1.0, 4.0, 0.25]).unwrap();
        let a = [0.3, -1.2, 2.0];
        let b = [1.0, 0.5, -0.7];
        assert_eq!(metric.distance(&a, &a), 0.0);
        assert!((metric.distance(&a, &b) - metric.distance(&b, &a)).abs() < 1e-12);
        let expected = (0.7f64.powi(2) + 4.0 * 1.7f64.powi(2) + 0.25 * 2.7f64.powi(2)).sqrt();
        assert!((metric.distance(&a, &b) - expected).abs() < 1e-12);
        assert!(metric.distance(&a, &b) > 0.0);
    }
}
