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
use rand::Rng;
use std::f64::consts::PI;

use crate::collision::IntervalType;
use crate::errors::*;

/// Closed range of a single degree of freedom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Range { min, max }
    }
    pub fn clamp(&self, value: f64) -> f64 {
        if value > self.max {
            self.max
        } else if value < self.min {
            self.min
        } else {
            value
        }
    }
}

/// Clamp joint angles to set angles safely
pub fn generate_clamped_joint_angles_from_limits(
    angles: &[f64],
    limits: &[Option<Range>],
) -> Result<Vec<f64>> {
    if angles.len() != limits.len() {
        return Err(Error::from("size mismatch of input angles and limits"));
    }
    Ok(limits
        .iter()
        .zip(angles.iter())
        .map(|(range, angle)| match *range {
            Some(ref range) => range.clamp(*angle),
            None => *angle,
        })
        .collect())
}

/// Generate random joint angles from the optional limits
///
/// If the limit is None, -PI <-> PI is used.
pub fn generate_random_joint_angles_from_limits<R>(limits: &[Option<Range>], rng: &mut R) -> Vec<f64>
where
    R: Rng + ?Sized,
{
    limits
        .iter()
        .map(|range| match *range {
            Some(ref range) => (range.max - range.min) * rng.gen::<f64>() + range.min,
            None => (rng.gen::<f64>() - 0.5) * 2.0 * PI,
        })
        .collect()
}

/// Euclidean distance between two configurations
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert!(a.len() == b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Linear interpolation `vec1 + (vec2 - vec1) * ratio`
pub fn lerp(vec1: &[f64], vec2: &[f64], ratio: f64) -> Vec<f64> {
    debug_assert!(vec1.len() == vec2.len());
    vec1.iter()
        .zip(vec2.iter())
        .map(|(v1, v2)| v1 + (v2 - v1) * ratio)
        .collect()
}

/// Interpolate two vectors with the length
///
/// The end points are included or excluded following `interval`. At least one
/// division is made, so a zero length segment yields its end points only.
pub fn interpolate(
    vec1: &[f64],
    vec2: &[f64],
    unit_length: f64,
    interval: IntervalType,
) -> Vec<Vec<f64>> {
    assert_eq!(vec1.len(), vec2.len());
    let dist = distance(vec1, vec2);
    let num = if unit_length > 0.0 {
        ((dist / unit_length).ceil() as usize).max(1)
    } else {
        1
    };
    let first = if interval.includes_start() { 0 } else { 1 };
    let last = if interval.includes_end() { num } else { num - 1 };
    (first..=last)
        .map(|i| lerp(vec1, vec2, i as f64 / num as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_funcs() {
        let mut rng = StdRng::seed_from_u64(1);
        let limits: Vec<Option<Range>> =
            vec![None, Some(Range::new(-1.0, 1.0)), Some(Range::new(0.0, 0.1))];
        for _ in 0..1000 {
            let angles = generate_random_joint_angles_from_limits(&limits, &mut rng);
            assert_eq!(angles.len(), limits.len());
            assert!(angles[0] >= -PI && angles[0] < PI);
            assert!(angles[1] >= -1.0 && angles[1] < 1.0);
            assert!(angles[2] >= 0.0 && angles[2] < 0.1);
        }
        let angles_fail = vec![0.1];
        assert!(generate_clamped_joint_angles_from_limits(&angles_fail, &limits).is_err());

        let angles1 = vec![100.0, -2.0, 0.5];
        let clamped = generate_clamped_joint_angles_from_limits(&angles1, &limits).unwrap();
        const TORELANCE: f64 = 0.00001;
        assert!((clamped[0] - 100.0).abs() < TORELANCE);
        assert!((clamped[1] - (-1.0)).abs() < TORELANCE);
        assert!((clamped[2] - 0.1).abs() < TORELANCE);
    }

    #[test]
    fn test_interpolate_interval() {
        let a = [0.0, 0.0];
        let b = [1.0, 0.0];
        let closed = interpolate(&a, &b, 0.25, IntervalType::Closed);
        assert_eq!(closed.len(), 5);
        assert_eq!(closed[0], vec![0.0, 0.0]);
        assert_eq!(closed[4], vec![1.0, 0.0]);

        let open_start = interpolate(&a, &b, 0.25, IntervalType::OpenStart);
        assert_eq!(open_start.len(), 4);
        assert!((open_start[0][0] - 0.25).abs() < 1e-12);
        assert_eq!(open_start[3], vec![1.0, 0.0]);

        let open = interpolate(&a, &b, 0.25, IntervalType::Open);
        assert_eq!(open.len(), 3);

        // zero length segment still yields its end point
        let same = interpolate(&a, &a, 0.1, IntervalType::OpenStart);
        assert_eq!(same.len(), 1);
    }
}
