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
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::metric::DistanceMetric;
use crate::funcs::*;

/// scale of the initial random offset relative to the radius
const NEIGHBOR_SPREAD: f64 = 10.0;
/// accepted relative error of the neighbor distance
const NEIGHBOR_TOLERANCE: f64 = 0.2;
const NEIGHBOR_MAX_ITERATIONS: usize = 64;
const MIN_DISTANCE: f64 = 1e-12;

/// Random configurations within the limits
pub struct SampleFunction<M>
where
    M: DistanceMetric,
{
    limits: Vec<Range>,
    metric: M,
    rng: StdRng,
}

impl<M> SampleFunction<M>
where
    M: DistanceMetric,
{
    pub fn new(limits: Vec<Range>, metric: M) -> Self {
        SampleFunction {
            limits,
            metric,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn dof(&self) -> usize {
        self.limits.len()
    }

    pub fn limits(&self) -> &[Range] {
        &self.limits
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Each dimension is drawn uniformly within its limit
    pub fn sample_uniform(&mut self) -> Vec<f64> {
        let rng = &mut self.rng;
        self.limits
            .iter()
            .map(|range| range.min + (range.max - range.min) * rng.gen::<f64>())
            .collect()
    }

    /// Random configuration around `current`
    ///
    /// The target distance is `radius * u` with `u` drawn from (0, 1]. A random
    /// offset is halved toward `current` while it is too far and stretched
    /// away while it is too near, until the distance is within 20% of the
    /// target. The result is clamped into the limits, so it may end up nearer.
    pub fn sample_neighbor(&mut self, current: &[f64], radius: f64) -> Vec<f64> {
        debug_assert_eq!(current.len(), self.limits.len());
        let target = radius * (1.0 - self.rng.gen::<f64>());
        if !(target.is_finite() && target > MIN_DISTANCE) {
            return self.clamp(current.to_vec());
        }
        let mut sample = current
            .iter()
            .map(|c| c + NEIGHBOR_SPREAD * radius * (self.rng.gen::<f64>() - 0.5))
            .collect::<Vec<_>>();

        for _ in 0..NEIGHBOR_MAX_ITERATIONS {
            if self.metric.distance(&sample, current) <= target * (1.0 + NEIGHBOR_TOLERANCE) {
                break;
            }
            for (s, c) in sample.iter_mut().zip(current) {
                *s = 0.5 * c + 0.5 * *s;
            }
        }
        for _ in 0..NEIGHBOR_MAX_ITERATIONS {
            let dist = self.metric.distance(&sample, current);
            if dist >= target * (1.0 - NEIGHBOR_TOLERANCE) || dist <= MIN_DISTANCE {
                break;
            }
            for (s, c) in sample.iter_mut().zip(current) {
                *s = 1.2 * *s - 0.2 * c;
            }
        }
        self.clamp(sample)
    }

    fn clamp(&self, mut sample: Vec<f64>) -> Vec<f64> {
        for (s, range) in sample.iter_mut().zip(&self.limits) {
            *s = range.clamp(*s);
        }
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::WeightedDistanceMetric;

    fn sampler() -> SampleFunction<WeightedDistanceMetric> {
        SampleFunction::new(
            vec![Range::new(-1.0, 1.0), Range::new(0.0, 2.0), Range::new(-10.0, 10.0)],
            WeightedDistanceMetric::new(vec![1.0, 1.0, 1.0]).unwrap(),
        )
        .with_seed(7)
    }

    #[test]
    fn test_sample_uniform() {
        let mut sampler = sampler();
        for _ in 0..1000 {
            let s = sampler.sample_uniform();
            assert_eq!(s.len(), 3);
            for (v, range) in s.iter().zip(sampler.limits()) {
                assert!(*v >= range.min && *v <= range.max);
            }
        }
    }

    #[test]
    fn test_sample_neighbor() {
        let mut sampler = sampler();
        let current = [0.0, 1.0, 0.0];
        let metric = WeightedDistanceMetric::new(vec![1.0, 1.0, 1.0]).unwrap();
        for _ in 0..1000 {
            let s = sampler.sample_neighbor(&current, 0.1);
            assert!(metric.distance(&s, &current) <= 0.1 * 1.2 + 1e-9);
            for (v, range) in s.iter().zip(sampler.limits()) {
                assert!(*v >= range.min && *v <= range.max);
            }
        }
    }

    #[test]
    fn test_sample_neighbor_degenerate_radius() {
        let mut sampler = sampler();
        assert_eq!(sampler.sample_neighbor(&[0.5, 1.0, 0.0], 0.0), vec![0.5, 1.0, 0.0]);
        assert_eq!(sampler.sample_neighbor(&[5.0, 1.0, 0.0], f64::NAN), vec![1.0, 1.0, 0.0]);
    }
}
