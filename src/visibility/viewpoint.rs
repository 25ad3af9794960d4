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
use na::{Isometry3, Point3, Vector3};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::path::PathBuf;

use super::constraint::VisibilityConstraint;
use super::files;
use crate::collision::Scene;
use crate::errors::*;
use crate::ik::InverseKinematicsSolver;

const MIN_DIRECTION_LENGTH: f64 = 1e-9;

/// Unit vectors of a subdivided icosahedron
///
/// Each level splits every triangle into four, `levels` gives
/// `10 * 4^levels + 2` vertices.
pub fn geodesic_sphere(levels: usize) -> Vec<Vector3<f64>> {
    let t = (1.0 + 5.0f64.sqrt()) / 2.0;
    let mut vertices = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
    .collect::<Vec<_>>();
    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..levels {
        let mut midpoints = HashMap::new();
        let mut midpoint = |a: usize, b: usize, vertices: &mut Vec<Vector3<f64>>| {
            *midpoints.entry((a.min(b), a.max(b))).or_insert_with(|| {
                vertices.push((vertices[a] + vertices[b]).normalize());
                vertices.len() - 1
            })
        };
        let mut subdivided = Vec::with_capacity(faces.len() * 4);
        for &[a, b, c] in &faces {
            let ab = midpoint(a, b, &mut vertices);
            let bc = midpoint(b, c, &mut vertices);
            let ca = midpoint(c, a, &mut vertices);
            subdivided.extend([[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = subdivided;
    }
    vertices
}

/// Camera pose looking along `dir` at `target_center` from `distance`
///
/// The camera is rolled by `roll` around its view axis, and placed so that
/// the target center projects onto `convex_center` (a point at unit depth).
pub fn compute_camera_pose(
    dir: &Vector3<f64>,
    distance: f64,
    roll: f64,
    target_center: &Point3<f64>,
    convex_center: &Point3<f64>,
) -> Isometry3<f64> {
    let mut up = Vector3::y() - dir * dir.y;
    if up.norm_squared() < 0.001 {
        up = Vector3::z() - dir * dir.z;
    }
    let up = up.normalize();
    let right = up.cross(dir);
    let (sin, cos) = roll.sin_cos();
    let rotation = na::Rotation3::from_matrix_unchecked(na::Matrix3::from_columns(&[
        right * cos + up * sin,
        -right * sin + up * cos,
        *dir,
    ]));
    let translation = target_center - (rotation * convex_center.coords) * distance;
    Isometry3::from_parts(
        na::Translation3::from(translation.coords),
        na::UnitQuaternion::from_rotation_matrix(&rotation),
    )
}

/// Random order of indices consumed one by one
#[derive(Debug, Clone)]
pub struct PermutationState {
    order: Vec<usize>,
    cursor: usize,
}

impl PermutationState {
    pub fn new<R>(len: usize, rng: &mut R) -> Self
    where
        R: rand::Rng + ?Sized,
    {
        let mut state = PermutationState {
            order: (0..len).collect(),
            cursor: 0,
        };
        state.reshuffle(rng);
        state
    }

    /// Start a new random pass over all indices
    pub fn reshuffle<R>(&mut self, rng: &mut R)
    where
        R: rand::Rng + ?Sized,
    {
        self.order.shuffle(rng);
        self.cursor = 0;
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Iterator for PermutationState {
    type Item = usize;
    fn next(&mut self) -> Option<usize> {
        let index = self.order.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(index)
    }
}

/// Candidate camera poses of [`ViewpointGenerator`]
#[derive(Debug, Clone, PartialEq)]
pub enum PoseSource {
    /// directions of a geodesic sphere at several distances
    Procedural,
    /// view directions whose length is the distance
    Directions(Vec<Vector3<f64>>),
    /// camera transforms relative to the target
    Transforms(Vec<Isometry3<f64>>),
    /// file of view directions
    DirectionFile(PathBuf),
    /// file of camera transforms
    TransformFile(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewpointParameters {
    pub source: PoseSource,
    /// rolls around the view axis for each direction
    pub num_rolls: usize,
    pub num_distances: usize,
    pub min_distance: f64,
    pub delta_distance: f64,
    pub sphere_subdivisions: usize,
    pub seed: Option<u64>,
}

impl Default for ViewpointParameters {
    fn default() -> Self {
        ViewpointParameters {
            source: PoseSource::Procedural,
            num_rolls: 8,
            num_distances: 5,
            min_distance: 0.2,
            delta_distance: 0.06,
            sphere_subdivisions: 3,
            seed: None,
        }
    }
}

/// Goal configurations from which the camera sees the target
pub struct ViewpointGenerator<I>
where
    I: InverseKinematicsSolver,
{
    constraint: VisibilityConstraint,
    ik: I,
    camera_poses: Vec<Isometry3<f64>>,
    permutation: PermutationState,
    rng: StdRng,
    num_evaluations: usize,
}

impl<I> ViewpointGenerator<I>
where
    I: InverseKinematicsSolver,
{
    /// Generate the camera poses around the target of `constraint`
    pub fn new<S>(scene: &S, constraint: VisibilityConstraint, ik: I, params: &ViewpointParameters) -> Result<Self>
    where
        S: Scene + ?Sized,
    {
        if params.num_rolls == 0 {
            return Err(Error::Config("number of rolls must be positive".to_owned()));
        }
        let target_center = scene.local_aabb(constraint.target())?.center;
        let convex_center = *constraint.region().center();
        let delta_roll = 2.0 * PI / params.num_rolls as f64;
        let with_rolls = |dir: &Vector3<f64>, distance: f64| {
            (0..params.num_rolls)
                .map(|i| compute_camera_pose(dir, distance, delta_roll * i as f64, &target_center, &convex_center))
                .collect::<Vec<_>>()
        };
        let from_directions = |directions: &[Vector3<f64>]| {
            let mut poses = Vec::with_capacity(directions.len() * params.num_rolls);
            for dir in directions {
                let distance = dir.norm();
                if distance < MIN_DIRECTION_LENGTH {
                    warn!("ignore zero length view direction");
                    continue;
                }
                poses.extend(with_rolls(&(dir / distance), distance));
            }
            poses
        };

        let camera_poses = match params.source {
            PoseSource::Procedural => {
                let mut poses = Vec::new();
                for dir in geodesic_sphere(params.sphere_subdivisions) {
                    for i in 0..params.num_distances {
                        poses.extend(with_rolls(&dir, params.min_distance + params.delta_distance * i as f64));
                    }
                }
                poses
            }
            PoseSource::Directions(ref directions) => from_directions(directions),
            PoseSource::DirectionFile(ref path) => from_directions(&files::read_directions(path)?),
            PoseSource::Transforms(ref transforms) => transforms.clone(),
            PoseSource::TransformFile(ref path) => files::read_transforms(path)?,
        };
        if camera_poses.is_empty() {
            return Err(Error::Config("no camera pose is generated".to_owned()));
        }
        debug!("have {} camera pose hypotheses", camera_poses.len());

        let mut rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let permutation = PermutationState::new(camera_poses.len(), &mut rng);
        Ok(ViewpointGenerator {
            constraint,
            ik,
            camera_poses,
            permutation,
            rng,
            num_evaluations: 0,
        })
    }

    /// Find a configuration seeing the target
    ///
    /// The candidates are tested in the order of the current permutation,
    /// continuing where the previous call stopped. If it runs out, the
    /// candidates are reshuffled and tested once more before giving up.
    pub fn sample<S>(&mut self, scene: &mut S) -> Result<Vec<f64>>
    where
        S: Scene + ?Sized,
    {
        for pass in 0..2 {
            if pass > 0 {
                debug!("all camera poses are used, reshuffle");
                self.permutation.reshuffle(&mut self.rng);
            }
            while let Some(index) = self.permutation.next() {
                self.num_evaluations += 1;
                let tcamera = self.constraint.target_pose() * self.camera_poses[index];
                if let Some(sample) = self.constraint.sample_with_camera(scene, &mut self.ik, &tcamera)? {
                    return Ok(sample);
                }
            }
        }
        Err(Error::SamplingExhaustion {
            num_poses: self.camera_poses.len(),
        })
    }

    /// Camera poses relative to the target
    pub fn camera_pose_set(&self) -> &[Isometry3<f64>] {
        &self.camera_poses
    }

    /// Camera poses, relative to the target, whose view contains the target
    pub fn visible_camera_poses(&self) -> Vec<Isometry3<f64>> {
        self.camera_poses
            .iter()
            .filter(|pose| self.constraint.in_convex_region(&(self.constraint.target_pose() * *pose)))
            .cloned()
            .collect()
    }

    /// Number of candidates tested so far
    pub fn num_evaluations(&self) -> usize {
        self.num_evaluations
    }

    pub fn constraint(&self) -> &VisibilityConstraint {
        &self.constraint
    }

    pub fn constraint_mut(&mut self) -> &mut VisibilityConstraint {
        &mut self.constraint
    }

    /// Remove the stand-in box of the target from the scene
    pub fn destroy<S>(self, scene: &mut S) -> Result<()>
    where
        S: Scene + ?Sized,
    {
        self.constraint.destroy(scene)
    }
}
