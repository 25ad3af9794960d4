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
//! Interfaces to the collision environment
//!
//! The planner never owns the bodies it reasons about. Bodies and links are
//! referred to by [`BodyId`] / [`LinkId`] handles which are resolved through a
//! [`Scene`] every time they are needed.
use nalgebra as na;

use crate::errors::*;
use crate::geometry::{Aabb, Obb};

mod guard;
pub use guard::{EnableStateGuard, JointStateSaver};

mod shape_scene;
pub use shape_scene::{ForwardKinematics, ShapeScene};

/// Handle of a body in a [`Scene`]
pub type BodyId = usize;
/// Index of a link inside its body
pub type LinkId = usize;

/// Which end points of a segment are checked
///
/// ```text
/// Open     ( , )
/// OpenStart( , ]
/// OpenEnd  [ , )
/// Closed   [ , ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalType {
    Open,
    OpenStart,
    OpenEnd,
    Closed,
}

impl IntervalType {
    pub fn includes_start(self) -> bool {
        matches!(self, IntervalType::OpenEnd | IntervalType::Closed)
    }
    pub fn includes_end(self) -> bool {
        matches!(self, IntervalType::OpenStart | IntervalType::Closed)
    }
}

/// Collision check of a straight motion in configuration space
pub trait SegmentCollision {
    /// Returns true if any configuration between `start` and `end` collides
    fn is_segment_colliding(&mut self, start: &[f64], end: &[f64], interval: IntervalType) -> bool;
}

/// First body hit by a ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub link: LinkId,
    pub point: na::Point3<f64>,
}

/// Body storage, ray casting and collision queries of the environment
pub trait Scene {
    /// Closest hit among the enabled bodies
    fn ray_cast(&self, origin: &na::Point3<f64>, dir: &na::Vector3<f64>) -> Option<RayHit>;
    fn is_enabled(&self, body: BodyId) -> Result<bool>;
    fn set_enabled(&mut self, body: BodyId, enabled: bool) -> Result<()>;
    fn transform(&self, body: BodyId) -> Result<na::Isometry3<f64>>;
    fn set_transform(&mut self, body: BodyId, pose: &na::Isometry3<f64>) -> Result<()>;
    /// World transform of a link
    fn link_transform(&self, body: BodyId, link: LinkId) -> Result<na::Isometry3<f64>>;
    /// World oriented box of every link, built from the link local boxes
    fn link_obbs(&self, body: BodyId) -> Result<Vec<Obb>>;
    /// Box of the whole body in its own frame
    fn local_aabb(&self, body: BodyId) -> Result<Aabb>;
    /// Returns true if the link placed at `pose` touches any other enabled body
    fn is_link_colliding(&self, body: BodyId, link: LinkId, pose: &na::Isometry3<f64>) -> Result<bool>;
    /// Adds a single box body, disabled and at the origin
    fn add_box_body(&mut self, name: &str, aabb: &Aabb) -> BodyId;
    fn remove_body(&mut self, body: BodyId) -> Result<()>;
    fn joint_values(&self, body: BodyId) -> Result<Vec<f64>>;
    fn set_joint_values(&mut self, body: BodyId, values: &[f64]) -> Result<()>;
}
