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
use rand::Rng;
use std::mem;

use super::metric::DistanceMetric;
use super::ordered_index::OrderedIndex;
use super::sampler::SampleFunction;
use super::tree::{ExtendResult, SpatialTree, StepValidator};
use crate::collision::IntervalType;
use crate::errors::*;
use crate::funcs::*;

/// moves of a projection smaller than this keep a shortcut on the constraint
const CONSTRAINT_TOLERANCE: f64 = 1e-6;

struct GoalCandidate {
    config: Vec<f64>,
    /// distance to the tree when it was last checked
    distance: f64,
}

/// RRT based path planner on top of [`SpatialTree`]
pub struct RrtPlanner<M>
where
    M: DistanceMetric + Clone,
{
    sampler: SampleFunction<M>,
    metric: M,
    pub step_length: f64,
    pub max_try: usize,
    pub num_smoothing: usize,
    pub goal_sample_prob: f64,
}

impl<M> RrtPlanner<M>
where
    M: DistanceMetric + Clone,
{
    pub fn sampler(&mut self) -> &mut SampleFunction<M> {
        &mut self.sampler
    }

    fn check_dof(&self, config: &[f64], name: &str) -> Result<()> {
        if config.len() != self.sampler.dof() {
            return Err(Error::Config(format!(
                "{} has {} values, but dof is {}",
                name,
                config.len(),
                self.sampler.dof()
            )));
        }
        Ok(())
    }

    fn check_feasible<V>(config: &[f64], validator: &mut V, name: &str) -> Result<()>
    where
        V: StepValidator + ?Sized,
    {
        if validator.is_segment_colliding(config, config, IntervalType::Closed) {
            return Err(Error::Planning(format!("{} is colliding", name)));
        }
        Ok(())
    }

    /// Plan a path from `start` to `goal` with RRT-Connect and smooth it
    pub fn plan<V>(&mut self, start: &[f64], goal: &[f64], validator: &mut V) -> Result<Vec<Vec<f64>>>
    where
        V: StepValidator + ?Sized,
    {
        self.check_dof(start, "start")?;
        self.check_dof(goal, "goal")?;
        Self::check_feasible(start, validator, "start")?;
        Self::check_feasible(goal, validator, "goal")?;

        let mut tree_a = SpatialTree::new(self.metric.clone(), self.step_length)?;
        let mut tree_b = SpatialTree::new(self.metric.clone(), self.step_length)?;
        tree_a.reset(start);
        tree_b.reset(goal);
        let mut a_is_start = true;

        for i in 0..self.max_try {
            let q_rand = self.sampler.sample_uniform();
            if let (ExtendResult::Success, Some(new_index)) | (ExtendResult::Connected, Some(new_index)) =
                tree_a.extend(&q_rand, true, validator)
            {
                let q_new = tree_a.nodes()[new_index].config.clone();
                if let (ExtendResult::Connected, Some(reached)) = tree_b.extend(&q_new, false, validator) {
                    info!("connected after {} tries ({} + {} nodes)", i, tree_a.len(), tree_b.len());
                    let mut path_a = tree_a.path_to(new_index);
                    let mut path_b = tree_b.path_to(reached);
                    if !a_is_start {
                        mem::swap(&mut path_a, &mut path_b);
                    }
                    // both halves end at the connecting configuration
                    path_b.pop();
                    path_a.extend(path_b.into_iter().rev());
                    self.smooth_path(&mut path_a, validator);
                    return Ok(path_a);
                }
            }
            mem::swap(&mut tree_a, &mut tree_b);
            a_is_start = !a_is_start;
        }
        Err(Error::Planning(format!("failed to connect in {} tries", self.max_try)))
    }

    /// Shortcut random pairs of the path
    ///
    /// A shortcut replaces the configurations between two points by a straight
    /// line discretized with `step_length`. It is taken only if every point of
    /// the line already satisfies the constraint of the validator and the line
    /// is collision free.
    pub fn smooth_path<V>(&mut self, path: &mut Vec<Vec<f64>>, validator: &mut V)
    where
        V: StepValidator + ?Sized,
    {
        for _ in 0..self.num_smoothing {
            if path.len() < 3 {
                return;
            }
            let rng = self.sampler.rng();
            let start = rng.gen_range(0..path.len() - 2);
            let end = rng.gen_range(start + 2..path.len());
            let shortcut = interpolate(&path[start], &path[end], self.step_length, IntervalType::Open);
            let mut previous = path[start].as_slice();
            let mut is_on_constraint = true;
            for point in &shortcut {
                let mut projected = point.clone();
                if !validator.constrain(previous, &mut projected)
                    || distance(point, &projected) > CONSTRAINT_TOLERANCE
                {
                    is_on_constraint = false;
                    break;
                }
                previous = point.as_slice();
            }
            if !is_on_constraint || validator.is_segment_colliding(&path[start], &path[end], IntervalType::Open) {
                continue;
            }
            let tail = path.split_off(end);
            path.truncate(start + 1);
            path.extend(shortcut);
            path.extend(tail);
        }
    }

    /// Grow a tree from `start` until it reaches a goal from `sample_goal`
    ///
    /// With probability `goal_sample_prob` (and whenever no goal is known)
    /// a new goal is requested. Goals are kept sorted by their distance to the
    /// tree. Every iteration extends the tree one step toward a random
    /// configuration, which is drawn around the closest goal half of the
    /// time, and then tries to connect the closest goal.
    pub fn plan_with_goal_sampler<V, G>(
        &mut self,
        start: &[f64],
        validator: &mut V,
        mut sample_goal: G,
    ) -> Result<Vec<Vec<f64>>>
    where
        V: StepValidator + ?Sized,
        G: FnMut(&mut V) -> Result<Vec<f64>>,
    {
        self.check_dof(start, "start")?;
        Self::check_feasible(start, validator, "start")?;
        let mut tree = SpatialTree::new(self.metric.clone(), self.step_length)?;
        tree.reset(start);
        let mut goals = OrderedIndex::new(|goal: &GoalCandidate| goal.distance);

        for i in 0..self.max_try {
            if goals.is_empty() || self.sampler.rng().gen::<f64>() < self.goal_sample_prob {
                match sample_goal(&mut *validator) {
                    Ok(config) => {
                        self.check_dof(&config, "goal")?;
                        if let Some((_, distance)) = tree.get_nearest(&config) {
                            debug!("new goal at distance {}", distance);
                            goals.add(GoalCandidate { config, distance });
                        }
                    }
                    Err(err) if goals.is_empty() => return Err(err),
                    Err(err) => debug!("goal sampling failed: {}", err),
                }
            }
            let closest = match goals.element(0) {
                Some(goal) => goal,
                None => continue,
            };

            let q_rand = if self.sampler.rng().gen::<bool>() {
                let (config, radius) = (closest.config.clone(), closest.distance);
                self.sampler.sample_neighbor(&config, radius)
            } else {
                self.sampler.sample_uniform()
            };
            tree.extend(&q_rand, true, validator);

            let mut goal = goals.remove(0);
            match tree.extend(&goal.config, false, validator) {
                (ExtendResult::Connected, Some(reached)) => {
                    info!("reached a goal after {} tries ({} nodes)", i, tree.len());
                    let mut path = tree.path_to(reached);
                    self.smooth_path(&mut path, validator);
                    return Ok(path);
                }
                _ => {
                    if let Some((_, distance)) = tree.get_nearest(&goal.config) {
                        goal.distance = distance;
                    }
                    goals.add(goal);
                }
            }
        }
        Err(Error::Planning(format!(
            "no goal was reached in {} tries ({} goals)",
            self.max_try,
            goals.len()
        )))
    }
}

/// Builder pattern to create [`RrtPlanner`]
pub struct RrtPlannerBuilder<M>
where
    M: DistanceMetric + Clone,
{
    limits: Vec<Range>,
    metric: M,
    step_length: f64,
    max_try: usize,
    num_smoothing: usize,
    goal_sample_prob: f64,
    seed: Option<u64>,
}

impl<M> RrtPlannerBuilder<M>
where
    M: DistanceMetric + Clone,
{
    pub fn new(limits: Vec<Range>, metric: M) -> Self {
        RrtPlannerBuilder {
            limits,
            metric,
            step_length: 0.1,
            max_try: 5000,
            num_smoothing: 100,
            goal_sample_prob: 0.1,
            seed: None,
        }
    }
    pub fn step_length(mut self, step_length: f64) -> Self {
        self.step_length = step_length;
        self
    }
    pub fn max_try(mut self, max_try: usize) -> Self {
        self.max_try = max_try;
        self
    }
    pub fn num_smoothing(mut self, num_smoothing: usize) -> Self {
        self.num_smoothing = num_smoothing;
        self
    }
    pub fn goal_sample_prob(mut self, goal_sample_prob: f64) -> Self {
        self.goal_sample_prob = goal_sample_prob;
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
    pub fn finalize(self) -> Result<RrtPlanner<M>> {
        if !(self.step_length > 0.0 && self.step_length.is_finite()) {
            return Err(Error::Config(format!("invalid step length {}", self.step_length)));
        }
        if !(0.0..=1.0).contains(&self.goal_sample_prob) {
            return Err(Error::Config(format!(
                "goal sample probability {} is not in [0, 1]",
                self.goal_sample_prob
            )));
        }
        let mut sampler = SampleFunction::new(self.limits, self.metric.clone());
        if let Some(seed) = self.seed {
            sampler = sampler.with_seed(seed);
        }
        Ok(RrtPlanner {
            sampler,
            metric: self.metric,
            step_length: self.step_length,
            max_try: self.max_try,
            num_smoothing: self.num_smoothing,
            goal_sample_prob: self.goal_sample_prob,
        })
    }
}
