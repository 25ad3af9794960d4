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
use log::*;
use nalgebra as na;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::funcs::*;

/// Inverse kinematics of the arm of a manipulator
pub trait InverseKinematicsSolver {
    /// Joint values of the arm reaching `target_pose`, starting from `seed`
    fn solve(&mut self, target_pose: &na::Isometry3<f64>, seed: &[f64]) -> Option<Vec<f64>>;
}

impl<F> InverseKinematicsSolver for F
where
    F: FnMut(&na::Isometry3<f64>, &[f64]) -> Option<Vec<f64>>,
{
    fn solve(&mut self, target_pose: &na::Isometry3<f64>, seed: &[f64]) -> Option<Vec<f64>> {
        self(target_pose, seed)
    }
}

/// Retry the inner solver from random initial joint values
pub struct RandomInitializeIkSolver<I>
where
    I: InverseKinematicsSolver,
{
    pub solver: I,
    pub limits: Vec<Option<Range>>,
    pub num_max_try: usize,
    rng: StdRng,
}

impl<I> RandomInitializeIkSolver<I>
where
    I: InverseKinematicsSolver,
{
    pub fn new(solver: I, limits: Vec<Option<Range>>, num_max_try: usize) -> Self {
        RandomInitializeIkSolver {
            solver,
            limits,
            num_max_try,
            rng: StdRng::from_entropy(),
        }
    }
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl<I> InverseKinematicsSolver for RandomInitializeIkSolver<I>
where
    I: InverseKinematicsSolver,
{
    fn solve(&mut self, target_pose: &na::Isometry3<f64>, seed: &[f64]) -> Option<Vec<f64>> {
        let first_seed = match generate_clamped_joint_angles_from_limits(seed, &self.limits) {
            Ok(clamped) => clamped,
            Err(err) => {
                warn!("seed is not clamped: {}", err);
                seed.to_vec()
            }
        };
        if let Some(solution) = self.solver.solve(target_pose, &first_seed) {
            return Some(solution);
        }
        for _ in 0..self.num_max_try {
            let random_seed = generate_random_joint_angles_from_limits(&self.limits, &mut self.rng);
            if let Some(solution) = self.solver.solve(target_pose, &random_seed) {
                return Some(solution);
            }
        }
        None
    }
}
