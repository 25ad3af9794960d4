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

use super::metric::DistanceMetric;
use crate::collision::{IntervalType, SegmentCollision};
use crate::errors::*;
use crate::funcs::lerp;

const REACHED_DISTANCE: f64 = 1e-9;
/// an accepted step must get closer to the target by this ratio of the step length
const MIN_PROGRESS_RATIO: f64 = 1e-3;

/// Outcome of [`SpatialTree::extend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendResult {
    /// the first step was refused
    Failed,
    /// some steps were added before a step was refused
    Success,
    /// the target was reached, or one step was added in one step mode
    Connected,
}

/// Acceptance test of a single step of [`SpatialTree::extend`]
pub trait StepValidator {
    /// Move `candidate`, reached from `from`, onto the task constraints.
    /// Returning false refuses the step.
    fn constrain(&mut self, _from: &[f64], _candidate: &mut [f64]) -> bool {
        true
    }
    fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool;
}

/// Step validator using only a collision oracle
pub struct Unconstrained<'a, C>(pub &'a mut C)
where
    C: SegmentCollision + ?Sized;

impl<'a, C> StepValidator for Unconstrained<'a, C>
where
    C: SegmentCollision + ?Sized,
{
    fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool {
        self.0.is_segment_colliding(from, to, interval)
    }
}

/// Step validator adding a projection function to another validator
pub struct Constrained<V, F>
where
    V: StepValidator,
    F: FnMut(&[f64], &mut [f64]) -> bool,
{
    pub validator: V,
    pub constraint: F,
}

impl<V, F> StepValidator for Constrained<V, F>
where
    V: StepValidator,
    F: FnMut(&[f64], &mut [f64]) -> bool,
{
    fn constrain(&mut self, from: &[f64], candidate: &mut [f64]) -> bool {
        self.validator.constrain(from, candidate) && (self.constraint)(from, candidate)
    }
    fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool {
        self.validator.is_segment_colliding(from, to, interval)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// `None` only for the root
    pub parent: Option<usize>,
    pub config: Vec<f64>,
}

/// Append only tree of configurations with nearest neighbor search
///
/// Node 0 is the root and every other node refers to a parent with a smaller
/// index.
pub struct SpatialTree<M>
where
    M: DistanceMetric,
{
    nodes: Vec<Node>,
    metric: M,
    step_length: f64,
    dof: usize,
    best_distance: f64,
}

impl<M> SpatialTree<M>
where
    M: DistanceMetric,
{
    pub fn new(metric: M, step_length: f64) -> Result<Self> {
        if !(step_length > 0.0 && step_length.is_finite()) {
            return Err(Error::Config(format!("invalid step length {}", step_length)));
        }
        Ok(SpatialTree {
            nodes: Vec::with_capacity(5000),
            metric,
            step_length,
            dof: 0,
            best_distance: 0.0,
        })
    }

    /// Clear all nodes and seed the root
    pub fn reset(&mut self, root: &[f64]) {
        self.nodes.clear();
        self.dof = root.len();
        self.best_distance = 0.0;
        self.nodes.push(Node {
            parent: None,
            config: root.to_vec(),
        });
    }

    pub fn add_node(&mut self, parent: Option<usize>, config: Vec<f64>) -> Result<usize> {
        match parent {
            None if self.nodes.is_empty() => {
                self.dof = config.len();
            }
            None => {
                return Err(Error::InvalidNode(
                    "the tree already has a root".to_owned(),
                ))
            }
            Some(parent) if parent >= self.nodes.len() => {
                return Err(Error::InvalidNode(format!(
                    "parent {} does not exist (len={})",
                    parent,
                    self.nodes.len()
                )))
            }
            Some(_) => {}
        }
        if config.len() != self.dof {
            return Err(Error::InvalidNode(format!(
                "dof mismatch: {} != {}",
                config.len(),
                self.dof
            )));
        }
        self.nodes.push(Node { parent, config });
        Ok(self.nodes.len() - 1)
    }

    /// Index of the nearest node and its distance, `None` if the tree is empty
    pub fn get_nearest(&mut self, query: &[f64]) -> Option<(usize, f64)> {
        let metric = &self.metric;
        let nearest = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (i, metric.distance(query, &node.config)))
            .fold(None, |best: Option<(usize, f64)>, (i, dist)| match best {
                Some((_, best_dist)) if best_dist <= dist => best,
                _ => Some((i, dist)),
            });
        if let Some((_, dist)) = nearest {
            self.best_distance = dist;
        }
        nearest
    }

    /// Grow the tree from the nearest node toward `target`
    ///
    /// Each step is at most `step_length` long and is accepted only if the
    /// validator keeps it and the segment from the current node is collision
    /// free (the start is not checked again). Unless it reaches the target, a
    /// step must also get closer to it by `1e-3 * step_length`, which bounds
    /// the number of steps of a call. Returns the result and the index
    /// of the last node on the extended branch.
    pub fn extend<V>(&mut self, target: &[f64], one_step: bool, validator: &mut V) -> (ExtendResult, Option<usize>)
    where
        V: StepValidator + ?Sized,
    {
        let (mut last, _) = match self.get_nearest(target) {
            Some(nearest) => nearest,
            None => return (ExtendResult::Failed, None),
        };
        let mut has_added = false;
        let refused = |has_added: bool| {
            if has_added {
                ExtendResult::Success
            } else {
                ExtendResult::Failed
            }
        };
        loop {
            let current = &self.nodes[last].config;
            let dist = self.metric.distance(current, target);
            if dist <= REACHED_DISTANCE {
                return (ExtendResult::Connected, Some(last));
            }
            let mut candidate = if dist > self.step_length {
                lerp(current, target, self.step_length / dist)
            } else {
                target.to_vec()
            };

            if !validator.constrain(current, &mut candidate) {
                return (refused(has_added), Some(last));
            }
            let step = self.metric.distance(current, &candidate);
            let remaining = self.metric.distance(&candidate, target);
            let too_slow = remaining > REACHED_DISTANCE && dist - remaining < MIN_PROGRESS_RATIO * self.step_length;
            if step <= REACHED_DISTANCE || step > self.step_length * (1.0 + 1e-9) || too_slow {
                debug!("projected step does not progress: step={}, remaining={}", step, remaining);
                return (refused(has_added), Some(last));
            }
            if validator.is_segment_colliding(current, &candidate, IntervalType::OpenStart) {
                return (refused(has_added), Some(last));
            }

            self.nodes.push(Node {
                parent: Some(last),
                config: candidate,
            });
            last = self.nodes.len() - 1;
            has_added = true;
            if one_step || remaining <= REACHED_DISTANCE {
                return (ExtendResult::Connected, Some(last));
            }
        }
    }

    /// Configurations from the root to `index`
    pub fn path_to(&self, index: usize) -> Vec<Vec<f64>> {
        let mut path = Vec::new();
        let mut current = Some(index);
        while let Some(i) = current {
            let node = &self.nodes[i];
            path.push(node.config.clone());
            current = node.parent;
        }
        path.reverse();
        path
    }

    pub fn get_config(&self, index: usize) -> Option<&[f64]> {
        self.nodes.get(index).map(|node| node.config.as_slice())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn dof(&self) -> usize {
        self.dof
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn step_length(&self) -> f64 {
        self.step_length
    }

    /// Distance found by the last nearest neighbor search
    pub fn best_distance(&self) -> f64 {
        self.best_distance
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::distance;
    use crate::planner::WeightedDistanceMetric;

    /// free space except a wall at `x in [wall, wall + 0.1]`
    struct Wall {
        wall: Option<f64>,
        checks: usize,
    }

    impl StepValidator for Wall {
        fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], _: IntervalType) -> bool {
            self.checks += 1;
            match self.wall {
                Some(w) => from[0].max(to[0]) >= w && from[0].min(to[0]) <= w + 0.1,
                None => false,
            }
        }
    }

    fn tree() -> SpatialTree<WeightedDistanceMetric> {
        let mut tree = SpatialTree::new(WeightedDistanceMetric::new(vec![1.0, 1.0]).unwrap(), 0.1).unwrap();
        tree.reset(&[0.0, 0.0]);
        tree
    }

    fn assert_tree_invariants(tree: &SpatialTree<WeightedDistanceMetric>) {
        assert!(tree.nodes()[0].parent.is_none());
        for (i, node) in tree.nodes().iter().enumerate().skip(1) {
            let parent = node.parent.unwrap();
            assert!(parent < i);
            let parent_config = tree.get_config(parent).unwrap();
            assert!(distance(parent_config, &node.config) <= tree.step_length() + 1e-9);
        }
    }

    #[test]
    fn test_add_node() {
        let mut tree = tree();
        assert_eq!(tree.add_node(Some(0), vec![1.0, 0.0]).unwrap(), 1);
        assert_eq!(tree.add_node(Some(1), vec![2.0, 0.0]).unwrap(), 2);
        assert!(tree.add_node(Some(5), vec![2.0, 0.0]).is_err());
        assert!(tree.add_node(None, vec![2.0, 0.0]).is_err());
        assert!(tree.add_node(Some(0), vec![2.0]).is_err());
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.dof(), 2);
        assert_eq!(tree.path_to(2), vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]]);
    }

    #[test]
    fn test_get_nearest() {
        let mut tree = SpatialTree::new(WeightedDistanceMetric::new(vec![1.0]).unwrap(), 0.1).unwrap();
        assert!(tree.get_nearest(&[0.0]).is_none());
        tree.add_node(None, vec![0.0]).unwrap();
        tree.add_node(Some(0), vec![1.0]).unwrap();
        tree.add_node(Some(1), vec![2.0]).unwrap();
        let (index, dist) = tree.get_nearest(&[1.2]).unwrap();
        assert_eq!(index, 1);
        assert!((dist - 0.2).abs() < 1e-12);
        assert!((tree.best_distance() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_extend_connected() {
        let mut tree = tree();
        let mut free = Wall { wall: None, checks: 0 };
        let (result, last) = tree.extend(&[0.55, 0.0], false, &mut free);
        assert_eq!(result, ExtendResult::Connected);
        let last = last.unwrap();
        assert_eq!(tree.get_config(last).unwrap(), &[0.55, 0.0]);
        // 5 full steps and a short one
        assert_eq!(tree.len(), 7);
        assert_eq!(free.checks, 6);
        assert_tree_invariants(&tree);

        // already in the tree
        let (result, again) = tree.extend(&[0.55, 0.0], false, &mut free);
        assert_eq!(result, ExtendResult::Connected);
        assert_eq!(again, Some(last));
        assert_eq!(tree.len(), 7);
    }

    #[test]
    fn test_extend_success_and_failed() {
        let mut tree = tree();
        let mut wall = Wall {
            wall: Some(0.35),
            checks: 0,
        };
        let (result, last) = tree.extend(&[1.0, 0.0], false, &mut wall);
        assert_eq!(result, ExtendResult::Success);
        let last = tree.get_config(last.unwrap()).unwrap();
        assert!(last[0] < 0.35);
        assert_tree_invariants(&tree);

        let len = tree.len();
        let (result, _) = tree.extend(&[1.0, 0.0], false, &mut wall);
        assert_eq!(result, ExtendResult::Failed);
        assert_eq!(tree.len(), len);
    }

    #[test]
    fn test_extend_one_step() {
        let mut tree = tree();
        let mut free = Wall { wall: None, checks: 0 };
        let (result, last) = tree.extend(&[0.0, 1.0], true, &mut free);
        assert_eq!(result, ExtendResult::Connected);
        assert_eq!(tree.len(), 2);
        let config = tree.get_config(last.unwrap()).unwrap();
        assert!((config[1] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_extend_with_constraint() {
        let mut tree = tree();
        let mut free = Wall { wall: None, checks: 0 };
        // the second coordinate must stay below 0.25
        let mut constrained = Constrained {
            validator: Unconstrained(&mut free),
            constraint: |_: &[f64], candidate: &mut [f64]| candidate[1] < 0.25,
        };
        let (result, _) = tree.extend(&[0.0, 1.0], false, &mut constrained);
        assert_eq!(result, ExtendResult::Success);
        assert_eq!(tree.len(), 3);
        assert_tree_invariants(&tree);
    }

    #[test]
    fn test_extend_stops_when_projection_stalls() {
        let mut tree = tree();
        tree.reset(&[1.4, 0.04]);
        let mut free = Wall { wall: None, checks: 0 };
        // x creeps toward 1.5 by halves while y flips sign, so every step is
        // long but the target at x=2 gets closer by less and less
        let mut constrained = Constrained {
            validator: Unconstrained(&mut free),
            constraint: |from: &[f64], candidate: &mut [f64]| {
                candidate[0] = from[0] + (1.5 - from[0]) * 0.5;
                candidate[1] = -from[1];
                true
            },
        };
        let (result, last) = tree.extend(&[2.0, 0.0], false, &mut constrained);
        assert_eq!(result, ExtendResult::Success);
        assert!(tree.len() < 20);
        let last = tree.get_config(last.unwrap()).unwrap();
        assert!(last[0] < 1.5);
        assert_tree_invariants(&tree);
    }

    impl SegmentCollision for Wall {
        fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool {
            StepValidator::is_segment_colliding(self, from, to, interval)
        }
    }

    #[test]
    fn test_extend_empty_tree() {
        let mut tree = SpatialTree::new(WeightedDistanceMetric::new(vec![1.0]).unwrap(), 0.1).unwrap();
        let mut free = Wall { wall: None, checks: 0 };
        assert_eq!(tree.extend(&[1.0], false, &mut free), (ExtendResult::Failed, None));
        assert!(SpatialTree::new(WeightedDistanceMetric::new(vec![1.0]).unwrap(), 0.0).is_err());
    }
}
