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
//! Bounding volumes shared by the scene and the visibility tests
use nalgebra as na;
use na::{Isometry3, Point3, Vector3};

/// Axis aligned box in the frame of its owner
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub center: Point3<f64>,
    pub half_extents: Vector3<f64>,
}

impl Aabb {
    pub fn new(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Aabb {
            center,
            half_extents,
        }
    }

    /// Smallest box containing both boxes
    pub fn merged(&self, other: &Aabb) -> Aabb {
        let mins = (self.center - self.half_extents).inf(&(other.center - other.half_extents));
        let maxs = (self.center + self.half_extents).sup(&(other.center + other.half_extents));
        Aabb {
            center: na::center(&mins, &maxs),
            half_extents: (maxs - mins) * 0.5,
        }
    }
}

/// Oriented bounding box
///
/// `right`, `up` and `dir` are orthonormal, `extents` are the half lengths
/// along each of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obb {
    pub center: Point3<f64>,
    pub right: Vector3<f64>,
    pub up: Vector3<f64>,
    pub dir: Vector3<f64>,
    pub extents: Vector3<f64>,
}

impl Obb {
    /// Box aligned with the axes of `pose`
    pub fn from_aabb(aabb: &Aabb, pose: &Isometry3<f64>) -> Self {
        let rot = pose.rotation.to_rotation_matrix();
        Obb {
            center: pose * aabb.center,
            right: rot.matrix().column(0).into_owned(),
            up: rot.matrix().column(1).into_owned(),
            dir: rot.matrix().column(2).into_owned(),
            extents: aabb.half_extents,
        }
    }

    /// Express the box in another frame, `pose` maps the current frame into it
    pub fn transformed(&self, pose: &Isometry3<f64>) -> Self {
        Obb {
            center: pose * self.center,
            right: pose.rotation * self.right,
            up: pose.rotation * self.up,
            dir: pose.rotation * self.dir,
            extents: self.extents,
        }
    }

    /// Half width of the box projected on `normal`
    pub fn projected_radius(&self, normal: &Vector3<f64>) -> f64 {
        self.extents.x * normal.dot(&self.right).abs()
            + self.extents.y * normal.dot(&self.up).abs()
            + self.extents.z * normal.dot(&self.dir).abs()
    }

    /// Corners scaled toward the center by `scale`
    ///
    /// Corner `i` takes the negative `right` side when bit 2 is set, the
    /// negative `up` side for bit 1 and the negative `dir` side for bit 0.
    pub fn corners(&self, scale: f64) -> [Point3<f64>; 8] {
        let r = self.right * self.extents.x * scale;
        let u = self.up * self.extents.y * scale;
        let d = self.dir * self.extents.z * scale;
        let mut corners = [self.center; 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            let sr = if i & 4 == 0 { 1.0 } else { -1.0 };
            let su = if i & 2 == 0 { 1.0 } else { -1.0 };
            let sd = if i & 1 == 0 { 1.0 } else { -1.0 };
            *corner = self.center + r * sr + u * su + d * sd;
        }
        corners
    }
}

/// Plane `normal . p + offset = 0`, the positive side is the inside
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    pub fn new(normal: Vector3<f64>, offset: f64) -> Self {
        Plane { normal, offset }
    }

    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        self.normal.dot(&point.coords) + self.offset
    }

    /// Move the plane by `pose`
    pub fn transformed(&self, pose: &Isometry3<f64>) -> Self {
        let normal = pose.rotation * self.normal;
        Plane {
            normal,
            offset: self.offset - normal.dot(&pose.translation.vector),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    const TOLERANCE: f64 = 1e-9;

    #[test]
    fn test_obb_from_aabb() {
        let aabb = Aabb::new(Point3::new(0.1, 0.0, 0.0), Vector3::new(0.1, 0.2, 0.3));
        let pose = Isometry3::new(
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::z() * std::f64::consts::FRAC_PI_2,
        );
        let obb = Obb::from_aabb(&aabb, &pose);
        assert!((obb.center - Point3::new(1.0, 0.1, 0.0)).norm() < TOLERANCE);
        assert!((obb.right - Vector3::y()).norm() < TOLERANCE);
        assert!((obb.up + Vector3::x()).norm() < TOLERANCE);
        assert!((obb.projected_radius(&Vector3::x()) - 0.2).abs() < TOLERANCE);
        let back = obb.transformed(&pose.inverse());
        assert!((back.center - aabb.center).norm() < TOLERANCE);
        assert!((back.right - Vector3::x()).norm() < TOLERANCE);
    }

    #[test]
    fn test_corners_and_merge() {
        let obb = Obb::from_aabb(
            &Aabb::new(Point3::origin(), Vector3::new(1.0, 2.0, 3.0)),
            &Isometry3::identity(),
        );
        let corners = obb.corners(1.0);
        assert_eq!(corners[0], Point3::new(1.0, 2.0, 3.0));
        assert_eq!(corners[7], Point3::new(-1.0, -2.0, -3.0));
        assert_eq!(corners[5], Point3::new(-1.0, 2.0, -3.0));

        let a = Aabb::new(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(2.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 1.0));
        let m = a.merged(&b);
        assert!((m.center - Point3::new(1.0, 0.0, 0.0)).norm() < TOLERANCE);
        assert!((m.half_extents - Vector3::new(2.0, 1.0, 1.0)).norm() < TOLERANCE);
    }

    #[test]
    fn test_plane_transform() {
        let plane = Plane::new(Vector3::z(), 0.0);
        let pose = Isometry3::translation(0.0, 0.0, 1.0);
        let moved = plane.transformed(&pose);
        assert!(moved.signed_distance(&Point3::new(0.0, 0.0, 1.0)).abs() < TOLERANCE);
        assert!(moved.signed_distance(&Point3::new(0.0, 0.0, 2.0)) > 0.0);
    }
}
