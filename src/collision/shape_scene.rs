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
use parry3d_f64::query::{self, Ray, RayCast};
use parry3d_f64::shape::SharedShape;

use super::{BodyId, IntervalType, LinkId, RayHit, Scene, SegmentCollision};
use crate::errors::*;
use crate::funcs::interpolate;
use crate::geometry::{Aabb, Obb};

/// Link poses in the body frame computed from the joint values
pub type ForwardKinematics = Box<dyn Fn(&[f64]) -> Vec<na::Isometry3<f64>>>;

struct Link {
    name: String,
    shape: SharedShape,
    local_pose: na::Isometry3<f64>,
}

struct Body {
    name: String,
    pose: na::Isometry3<f64>,
    enabled: bool,
    links: Vec<Link>,
    joint_values: Vec<f64>,
    kinematics: Option<ForwardKinematics>,
}

impl Body {
    fn link_pose(&self, link: &Link) -> na::Isometry3<f64> {
        self.pose * link.local_pose
    }
}

/// Scene made of `parry3d` shapes
///
/// Each body is a list of links with one shape each. Bodies with a forward
/// kinematics function move their links when the joint values are set, which
/// makes one of them usable as the robot for segment collision checks.
pub struct ShapeScene {
    bodies: Vec<Option<Body>>,
    robot: Option<(BodyId, Vec<usize>)>,
    /// margin length for collision check
    pub prediction: f64,
    /// interpolation length of the segment collision check
    pub check_resolution: f64,
}

impl ShapeScene {
    pub fn new(prediction: f64) -> Self {
        ShapeScene {
            bodies: Vec::new(),
            robot: None,
            prediction,
            check_resolution: 0.02,
        }
    }

    /// Add an enabled body, links are `(name, shape, pose in the body frame)`
    pub fn add_body(
        &mut self,
        name: &str,
        links: Vec<(String, SharedShape, na::Isometry3<f64>)>,
        pose: na::Isometry3<f64>,
    ) -> BodyId {
        let links = links
            .into_iter()
            .map(|(name, shape, local_pose)| Link {
                name,
                shape,
                local_pose,
            })
            .collect::<Vec<_>>();
        debug!("add body {} with {} links", name, links.len());
        self.bodies.push(Some(Body {
            name: name.to_owned(),
            pose,
            enabled: true,
            links,
            joint_values: Vec::new(),
            kinematics: None,
        }));
        self.bodies.len() - 1
    }

    /// Attach a forward kinematics function with `dof` joints to a body
    pub fn set_forward_kinematics(
        &mut self,
        body: BodyId,
        initial_values: Vec<f64>,
        kinematics: ForwardKinematics,
    ) -> Result<()> {
        let entry = self.body_mut(body)?;
        let poses = kinematics(&initial_values);
        if poses.len() != entry.links.len() {
            return Err(Error::Config(format!(
                "kinematics of {} returns {} poses for {} links",
                entry.name,
                poses.len(),
                entry.links.len()
            )));
        }
        for (link, pose) in entry.links.iter_mut().zip(poses) {
            link.local_pose = pose;
        }
        entry.joint_values = initial_values;
        entry.kinematics = Some(kinematics);
        Ok(())
    }

    /// Use `body` as the moving robot of [`SegmentCollision`]
    ///
    /// Configurations passed to the segment check are the values of
    /// `active_joints`, the other joints keep their current values.
    pub fn set_active_robot(&mut self, body: BodyId, active_joints: Vec<usize>) -> Result<()> {
        let dof = self.body(body)?.joint_values.len();
        if let Some(joint) = active_joints.iter().find(|j| **j >= dof) {
            return Err(Error::Config(format!(
                "active joint {} is out of range (dof={})",
                joint, dof
            )));
        }
        self.robot = Some((body, active_joints));
        Ok(())
    }

    pub fn body_name(&self, body: BodyId) -> Result<&str> {
        Ok(&self.body(body)?.name)
    }

    pub fn link_name(&self, body: BodyId, link: LinkId) -> Result<&str> {
        let entry = self.body(body)?;
        entry
            .links
            .get(link)
            .map(|l| l.name.as_str())
            .ok_or(Error::UnknownLink { body, link })
    }

    /// Check if any link of the body touches other enabled bodies
    pub fn is_body_colliding(&self, body: BodyId) -> Result<bool> {
        let entry = self.body(body)?;
        for (i, link) in entry.links.iter().enumerate() {
            if self.is_link_colliding(body, i, &entry.link_pose(link))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn body(&self, body: BodyId) -> Result<&Body> {
        self.bodies
            .get(body)
            .and_then(|b| b.as_ref())
            .ok_or(Error::UnknownBody(body))
    }

    fn body_mut(&mut self, body: BodyId) -> Result<&mut Body> {
        self.bodies
            .get_mut(body)
            .and_then(|b| b.as_mut())
            .ok_or(Error::UnknownBody(body))
    }

    fn is_configuration_colliding(
        &mut self,
        body: BodyId,
        active_joints: &[usize],
        config: &[f64],
    ) -> Result<bool> {
        let mut values = self.joint_values(body)?;
        for (joint, value) in active_joints.iter().zip(config) {
            values[*joint] = *value;
        }
        self.set_joint_values(body, &values)?;
        self.is_body_colliding(body)
    }

    fn check_segment(&mut self, start: &[f64], end: &[f64], interval: IntervalType) -> Result<bool> {
        let (body, active_joints) = match self.robot {
            Some(ref robot) => robot.clone(),
            None => return Err(Error::Config("no active robot is set".to_owned())),
        };
        let saved = self.joint_values(body)?;
        let mut result = Ok(false);
        for config in interpolate(start, end, self.check_resolution, interval) {
            match self.is_configuration_colliding(body, &active_joints, &config) {
                Ok(false) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.set_joint_values(body, &saved)?;
        result
    }
}

impl SegmentCollision for ShapeScene {
    fn is_segment_colliding(&mut self, start: &[f64], end: &[f64], interval: IntervalType) -> bool {
        match self.check_segment(start, end, interval) {
            Ok(colliding) => colliding,
            Err(err) => {
                error!("segment collision check failed: {}", err);
                true
            }
        }
    }
}

fn to_aabb(aabb: &parry3d_f64::bounding_volume::Aabb) -> Aabb {
    Aabb::new(aabb.center(), aabb.half_extents())
}

impl Scene for ShapeScene {
    fn ray_cast(&self, origin: &na::Point3<f64>, dir: &na::Vector3<f64>) -> Option<RayHit> {
        let ray = Ray::new(*origin, *dir);
        let mut best: Option<(f64, BodyId, LinkId)> = None;
        for (id, body) in self.bodies.iter().enumerate() {
            let body = match body {
                Some(body) if body.enabled => body,
                _ => continue,
            };
            for (i, link) in body.links.iter().enumerate() {
                if let Some(toi) = link
                    .shape
                    .cast_ray(&body.link_pose(link), &ray, f64::MAX, true)
                {
                    if best.map_or(true, |(best_toi, _, _)| toi < best_toi) {
                        best = Some((toi, id, i));
                    }
                }
            }
        }
        best.map(|(toi, body, link)| RayHit {
            body,
            link,
            point: ray.point_at(toi),
        })
    }

    fn is_enabled(&self, body: BodyId) -> Result<bool> {
        Ok(self.body(body)?.enabled)
    }

    fn set_enabled(&mut self, body: BodyId, enabled: bool) -> Result<()> {
        self.body_mut(body)?.enabled = enabled;
        Ok(())
    }

    fn transform(&self, body: BodyId) -> Result<na::Isometry3<f64>> {
        Ok(self.body(body)?.pose)
    }

    fn set_transform(&mut self, body: BodyId, pose: &na::Isometry3<f64>) -> Result<()> {
        self.body_mut(body)?.pose = *pose;
        Ok(())
    }

    fn link_transform(&self, body: BodyId, link: LinkId) -> Result<na::Isometry3<f64>> {
        let entry = self.body(body)?;
        entry
            .links
            .get(link)
            .map(|l| entry.link_pose(l))
            .ok_or(Error::UnknownLink { body, link })
    }

    fn link_obbs(&self, body: BodyId) -> Result<Vec<Obb>> {
        let entry = self.body(body)?;
        Ok(entry
            .links
            .iter()
            .map(|link| Obb::from_aabb(&to_aabb(&link.shape.compute_local_aabb()), &entry.link_pose(link)))
            .collect())
    }

    fn local_aabb(&self, body: BodyId) -> Result<Aabb> {
        let entry = self.body(body)?;
        entry
            .links
            .iter()
            .map(|link| to_aabb(&link.shape.compute_aabb(&link.local_pose)))
            .reduce(|a, b| a.merged(&b))
            .ok_or_else(|| Error::Config(format!("body {} has no links", entry.name)))
    }

    fn is_link_colliding(&self, body: BodyId, link: LinkId, pose: &na::Isometry3<f64>) -> Result<bool> {
        let shape = &self
            .body(body)?
            .links
            .get(link)
            .ok_or(Error::UnknownLink { body, link })?
            .shape;
        for (id, other) in self.bodies.iter().enumerate() {
            let other = match other {
                Some(other) if other.enabled && id != body => other,
                _ => continue,
            };
            for other_link in &other.links {
                match query::distance(pose, &**shape, &other.link_pose(other_link), &*other_link.shape) {
                    Ok(dist) if dist < self.prediction => {
                        debug!("{} is colliding with {}:{} dist={}", body, other.name, other_link.name, dist);
                        return Ok(true);
                    }
                    Ok(_) => {}
                    Err(_) => {
                        warn!("distance query is not supported for {}:{}", other.name, other_link.name);
                    }
                }
            }
        }
        Ok(false)
    }

    fn add_box_body(&mut self, name: &str, aabb: &Aabb) -> BodyId {
        let shape = SharedShape::cuboid(aabb.half_extents.x, aabb.half_extents.y, aabb.half_extents.z);
        let local_pose = na::Isometry3::translation(aabb.center.x, aabb.center.y, aabb.center.z);
        let id = self.add_body(
            name,
            vec![(name.to_owned(), shape, local_pose)],
            na::Isometry3::identity(),
        );
        if let Some(Some(body)) = self.bodies.get_mut(id) {
            body.enabled = false;
        }
        id
    }

    fn remove_body(&mut self, body: BodyId) -> Result<()> {
        self.body(body)?;
        self.bodies[body] = None;
        if matches!(self.robot, Some((robot, _)) if robot == body) {
            self.robot = None;
        }
        Ok(())
    }

    fn joint_values(&self, body: BodyId) -> Result<Vec<f64>> {
        Ok(self.body(body)?.joint_values.clone())
    }

    fn set_joint_values(&mut self, body: BodyId, values: &[f64]) -> Result<()> {
        let entry = self.body_mut(body)?;
        if values.len() != entry.joint_values.len() {
            return Err(Error::Config(format!(
                "{} has {} joints, but {} values are given",
                entry.name,
                entry.joint_values.len(),
                values.len()
            )));
        }
        entry.joint_values.copy_from_slice(values);
        if let Some(ref kinematics) = entry.kinematics {
            let poses = kinematics(values);
            for (link, pose) in entry.links.iter_mut().zip(poses) {
                link.local_pose = pose;
            }
        }
        Ok(())
    }
}
