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
use std::path::PathBuf;

use super::culling::{CameraIntrinsics, ConvexRegion};
use super::files;
use super::occlusion::OcclusionSampler;
use crate::collision::{BodyId, IntervalType, JointStateSaver, LinkId, Scene, SegmentCollision};
use crate::errors::*;
use crate::geometry::Obb;
use crate::ik::InverseKinematicsSolver;
use crate::planner::StepValidator;

#[derive(Debug, Clone, PartialEq)]
pub enum SensorKind {
    Camera(CameraIntrinsics),
    Other,
}

/// Sensor attached to a link of the robot
#[derive(Debug, Clone, PartialEq)]
pub struct CameraSensor {
    pub name: String,
    pub link: LinkId,
    /// pose of the sensor in the frame of `link`
    pub relative_transform: na::Isometry3<f64>,
    pub kind: SensorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Manipulator {
    pub name: String,
    pub end_effector: LinkId,
    /// pose of the grasp frame in the end effector frame
    pub grasp: na::Isometry3<f64>,
    /// joints solved by the inverse kinematics, in the order of the solution
    pub arm_joints: Vec<usize>,
}

/// Description of a robot body in a [`Scene`]
#[derive(Debug, Clone, PartialEq)]
pub struct RobotHandle {
    pub body: BodyId,
    pub sensors: Vec<CameraSensor>,
    pub manipulators: Vec<Manipulator>,
    /// joints of the planning configuration
    pub active_joints: Vec<usize>,
    /// links moving rigidly with the camera, like the fingers of the gripper
    pub camera_child_links: Vec<LinkId>,
}

impl RobotHandle {
    /// Active configuration made from all joint values of the body
    pub fn active_values(&self, values: &[f64]) -> Vec<f64> {
        self.active_joints.iter().map(|j| values[*j]).collect()
    }

    /// Write an active configuration into all joint values of the body
    pub fn set_active_values(&self, values: &mut [f64], active: &[f64]) {
        for (joint, value) in self.active_joints.iter().zip(active) {
            values[*joint] = *value;
        }
    }
}

/// Where the visibility region comes from
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSource {
    /// the whole image
    ImageBorders,
    /// boundary points in pixels
    Points(Vec<na::Point2<f64>>),
    /// file of boundary points in pixels
    File(PathBuf),
}

/// Visibility of a target from a camera on the robot
///
/// The target is visible if all its link boxes are inside the convex region
/// of the image and no ray from the camera to the target is blocked.
pub struct VisibilityConstraint {
    robot: RobotHandle,
    sensor: CameraSensor,
    intrinsics: CameraIntrinsics,
    manipulator: Manipulator,
    sensor_inv: na::Isometry3<f64>,
    /// links checked for collision at a camera pose, with their pose relative to the camera
    child_links: Vec<(LinkId, na::Isometry3<f64>)>,
    target: BodyId,
    target_pose: na::Isometry3<f64>,
    target_obbs: Vec<Obb>,
    region: ConvexRegion,
    occlusion: OcclusionSampler,
}

impl VisibilityConstraint {
    pub fn robot(&self) -> &RobotHandle {
        &self.robot
    }

    pub fn sensor(&self) -> &CameraSensor {
        &self.sensor
    }

    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    pub fn manipulator(&self) -> &Manipulator {
        &self.manipulator
    }

    pub fn target(&self) -> BodyId {
        self.target
    }

    /// Pose of the target when the constraint was created or refreshed
    pub fn target_pose(&self) -> &na::Isometry3<f64> {
        &self.target_pose
    }

    /// Link boxes of the target in the world frame
    pub fn target_obbs(&self) -> &[Obb] {
        &self.target_obbs
    }

    pub fn region(&self) -> &ConvexRegion {
        &self.region
    }

    pub fn occlusion(&self) -> &OcclusionSampler {
        &self.occlusion
    }

    /// Read the target boxes again after the target moved
    pub fn refresh_target<S>(&mut self, scene: &S) -> Result<()>
    where
        S: Scene + ?Sized,
    {
        self.target_pose = scene.transform(self.target)?;
        self.target_obbs = scene.link_obbs(self.target)?;
        Ok(())
    }

    /// Camera pose of the current configuration of the robot
    pub fn camera_pose<S>(&self, scene: &S) -> Result<na::Isometry3<f64>>
    where
        S: Scene + ?Sized,
    {
        Ok(scene.link_transform(self.robot.body, self.sensor.link)? * self.sensor.relative_transform)
    }

    pub fn in_convex_region(&self, tcamera: &na::Isometry3<f64>) -> bool {
        let inside = self.region.contains(&self.target_obbs, tcamera);
        if !inside {
            trace!("target is not in the convex region");
        }
        inside
    }

    /// Returns true if the links around the camera collide at the camera pose
    pub fn is_gripper_colliding<S>(&self, scene: &S, tcamera: &na::Isometry3<f64>) -> Result<bool>
    where
        S: Scene + ?Sized,
    {
        for (link, offset) in &self.child_links {
            if scene.is_link_colliding(self.robot.body, *link, &(tcamera * offset))? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_occluded<S>(&self, scene: &mut S, tcamera: &na::Isometry3<f64>) -> Result<bool>
    where
        S: Scene + ?Sized,
    {
        self.occlusion.is_occluded(scene, &self.target_obbs, tcamera)
    }

    /// Active configuration seeing the target from `tcamera`
    ///
    /// The arm joints come from the inverse kinematics of the end effector
    /// pose implied by the camera pose, the other active joints keep their
    /// current values. Returns `None` if the camera pose is rejected. The
    /// joint values of the robot are restored before returning.
    pub fn sample_with_camera<S, I>(
        &self,
        scene: &mut S,
        ik: &mut I,
        tcamera: &na::Isometry3<f64>,
    ) -> Result<Option<Vec<f64>>>
    where
        S: Scene + ?Sized,
        I: InverseKinematicsSolver + ?Sized,
    {
        if !self.in_convex_region(tcamera) {
            return Ok(None);
        }
        if self.is_gripper_colliding(scene, tcamera)? {
            trace!("gripper is colliding");
            return Ok(None);
        }

        let body = self.robot.body;
        let target_pose = tcamera * self.sensor_inv * self.manipulator.grasp;
        let mut values = scene.joint_values(body)?;
        let seed = self
            .manipulator
            .arm_joints
            .iter()
            .map(|j| values[*j])
            .collect::<Vec<_>>();
        let solution = match ik.solve(&target_pose, &seed) {
            Some(solution) => solution,
            None => {
                debug!("no ik solution for camera at {}", tcamera.translation.vector);
                return Ok(None);
            }
        };
        if solution.len() != seed.len() {
            return Err(Error::Config(format!(
                "ik returned {} values for {} arm joints",
                solution.len(),
                seed.len()
            )));
        }
        for (joint, value) in self.manipulator.arm_joints.iter().zip(&solution) {
            values[*joint] = *value;
        }

        let mut saver = JointStateSaver::new(scene, body)?;
        saver.set_joint_values(body, &values)?;
        if self.is_occluded(&mut *saver, tcamera)? {
            return Ok(None);
        }
        Ok(Some(self.robot.active_values(&values)))
    }

    /// Returns true if the target is visible in the current configuration
    pub fn is_visible<S>(&self, scene: &mut S) -> Result<bool>
    where
        S: Scene + ?Sized,
    {
        let tcamera = self.camera_pose(scene)?;
        Ok(self.in_convex_region(&tcamera) && !self.is_occluded(scene, &tcamera)?)
    }

    /// Accept `candidate` only if the target is visible from it
    ///
    /// The candidate is never moved, the visibility constraint has no
    /// projection.
    pub fn project<S>(&self, scene: &mut S, _from: &[f64], candidate: &mut [f64]) -> Result<bool>
    where
        S: Scene + ?Sized,
    {
        let body = self.robot.body;
        let mut values = scene.joint_values(body)?;
        self.robot.set_active_values(&mut values, candidate);
        let mut saver = JointStateSaver::new(scene, body)?;
        saver.set_joint_values(body, &values)?;
        self.is_visible(&mut *saver)
    }

    /// Remove the stand-in box of the target from the scene
    pub fn destroy<S>(self, scene: &mut S) -> Result<()>
    where
        S: Scene + ?Sized,
    {
        self.occlusion.destroy(scene)
    }
}

/// Builder pattern to create [`VisibilityConstraint`]
pub struct VisibilityConstraintBuilder {
    robot: RobotHandle,
    target: BodyId,
    sensor_index: usize,
    region: RegionSource,
    ray_sample_density: f64,
    ray_offset: f64,
    obb_shrink: f64,
}

impl VisibilityConstraintBuilder {
    pub fn new(robot: RobotHandle, target: BodyId) -> Self {
        VisibilityConstraintBuilder {
            robot,
            target,
            sensor_index: 0,
            region: RegionSource::ImageBorders,
            ray_sample_density: 20.0,
            ray_offset: 0.05,
            obb_shrink: 0.95,
        }
    }
    pub fn sensor_index(mut self, sensor_index: usize) -> Self {
        self.sensor_index = sensor_index;
        self
    }
    pub fn region(mut self, region: RegionSource) -> Self {
        self.region = region;
        self
    }
    /// distance between rays in pixels
    pub fn ray_sample_density(mut self, ray_sample_density: f64) -> Self {
        self.ray_sample_density = ray_sample_density;
        self
    }
    pub fn ray_offset(mut self, ray_offset: f64) -> Self {
        self.ray_offset = ray_offset;
        self
    }
    pub fn obb_shrink(mut self, obb_shrink: f64) -> Self {
        self.obb_shrink = obb_shrink;
        self
    }

    /// Resolve the sensor and the manipulator and create the stand-in box
    pub fn finalize<S>(self, scene: &mut S) -> Result<VisibilityConstraint>
    where
        S: Scene + ?Sized,
    {
        let robot = self.robot;
        let sensor = robot
            .sensors
            .get(self.sensor_index)
            .cloned()
            .ok_or_else(|| Error::Config(format!("robot has no sensor {}", self.sensor_index)))?;
        let intrinsics = match sensor.kind {
            SensorKind::Camera(intrinsics) => intrinsics,
            SensorKind::Other => {
                return Err(Error::Config(format!("sensor {} is not a camera", sensor.name)));
            }
        };
        let manipulator = robot
            .manipulators
            .iter()
            .find(|m| m.end_effector == sensor.link)
            .cloned()
            .ok_or_else(|| {
                Error::Config(format!(
                    "no manipulator has the link {} of sensor {} as end effector",
                    sensor.link, sensor.name
                ))
            })?;
        let dof = scene.joint_values(robot.body)?.len();
        if let Some(joint) = robot
            .active_joints
            .iter()
            .chain(&manipulator.arm_joints)
            .find(|j| **j >= dof)
        {
            return Err(Error::Config(format!("joint {} is out of range (dof={})", joint, dof)));
        }

        let region = match self.region {
            RegionSource::ImageBorders => ConvexRegion::fallback(&intrinsics),
            RegionSource::Points(points) => ConvexRegion::from_image_points(&points, &intrinsics),
            RegionSource::File(path) => ConvexRegion::from_image_points(&files::read_points(path)?, &intrinsics),
        };

        let sensor_inv = sensor.relative_transform.inverse();
        let camera_link_inv = (scene.link_transform(robot.body, sensor.link)? * sensor.relative_transform).inverse();
        let mut child_links = vec![(sensor.link, sensor_inv)];
        for link in robot.camera_child_links.iter().filter(|l| **l != sensor.link) {
            child_links.push((*link, camera_link_inv * scene.link_transform(robot.body, *link)?));
        }

        let mut occlusion = OcclusionSampler::new(scene, self.target, self.ray_sample_density / intrinsics.fx)?;
        occlusion.ray_offset = self.ray_offset;
        occlusion.obb_shrink = self.obb_shrink;
        let target_pose = scene.transform(self.target)?;
        let target_obbs = scene.link_obbs(self.target)?;
        debug!(
            "visibility of body {} from sensor {} with {} planes",
            self.target,
            sensor.name,
            region.planes().len()
        );
        Ok(VisibilityConstraint {
            robot,
            sensor,
            intrinsics,
            manipulator,
            sensor_inv,
            child_links,
            target: self.target,
            target_pose,
            target_obbs,
            region,
            occlusion,
        })
    }
}

/// Step validator of a planner keeping the target visible
pub struct VisibilityStepValidator<'a, S>
where
    S: Scene + SegmentCollision + ?Sized,
{
    scene: &'a mut S,
    constraint: &'a VisibilityConstraint,
}

impl<'a, S> VisibilityStepValidator<'a, S>
where
    S: Scene + SegmentCollision + ?Sized,
{
    pub fn new(scene: &'a mut S, constraint: &'a VisibilityConstraint) -> Self {
        VisibilityStepValidator { scene, constraint }
    }

    pub fn scene(&mut self) -> &mut S {
        self.scene
    }
}

impl<'a, S> StepValidator for VisibilityStepValidator<'a, S>
where
    S: Scene + SegmentCollision + ?Sized,
{
    fn constrain(&mut self, from: &[f64], candidate: &mut [f64]) -> bool {
        match self.constraint.project(self.scene, from, candidate) {
            Ok(visible) => visible,
            Err(err) => {
                error!("visibility check failed: {}", err);
                false
            }
        }
    }
    fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool {
        self.scene.is_segment_colliding(from, to, interval)
    }
}
