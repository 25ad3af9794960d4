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
//! Containment tests of oriented boxes in the field of view
use log::*;
use nalgebra as na;
use na::{Isometry3, Point2, Point3, Vector2, Vector3};

use crate::geometry::{Obb, Plane};

const MIN_EDGE_LENGTH: f64 = 1e-12;

/// Pinhole camera parameters in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
    pub width: usize,
    pub height: usize,
}

impl CameraIntrinsics {
    /// Point on the image plane at unit depth
    pub fn normalize(&self, pixel: &Point2<f64>) -> Point2<f64> {
        Point2::new((pixel.x - self.cx) / self.fx, (pixel.y - self.cy) / self.fy)
    }
}

/// Visible volume of a camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    pub pos: Point3<f64>,
    pub right: Vector3<f64>,
    pub up: Vector3<f64>,
    pub dir: Vector3<f64>,
    pub near: f64,
    pub far: f64,
    pub cos_fovx: f64,
    pub sin_fovx: f64,
    pub cos_fovy: f64,
    pub sin_fovy: f64,
}

impl Frustum {
    /// Frustum of a camera at `pose` looking along its z axis
    ///
    /// The half angles are `atan(width / 2fx)` and `atan(height / 2fy)`.
    pub fn from_intrinsics(intrinsics: &CameraIntrinsics, pose: &Isometry3<f64>, near: f64, far: f64) -> Self {
        let fovx = (0.5 * intrinsics.width as f64 / intrinsics.fx).atan();
        let fovy = (0.5 * intrinsics.height as f64 / intrinsics.fy).atan();
        let rot = pose.rotation.to_rotation_matrix();
        Frustum {
            pos: Point3::from(pose.translation.vector),
            right: rot.matrix().column(0).into_owned(),
            up: rot.matrix().column(1).into_owned(),
            dir: rot.matrix().column(2).into_owned(),
            near,
            far,
            cos_fovx: fovx.cos(),
            sin_fovx: fovx.sin(),
            cos_fovy: fovy.cos(),
            sin_fovy: fovy.sin(),
        }
    }

    fn side_normals(&self) -> [Vector3<f64>; 4] {
        [
            self.right * self.cos_fovx - self.dir * self.sin_fovx,
            -self.right * self.cos_fovx - self.dir * self.sin_fovx,
            self.up * self.cos_fovy - self.dir * self.sin_fovy,
            -self.up * self.cos_fovy - self.dir * self.sin_fovy,
        ]
    }
}

/// Returns true if the whole box is inside the frustum
///
/// The side normals point outward, so the box is outside a side if its center
/// is farther than its projected half width toward the inside boundary.
pub fn in_frustum(obb: &Obb, frustum: &Frustum) -> bool {
    let v = obb.center - frustum.pos;
    for normal in frustum.side_normals().iter() {
        if v.dot(normal) > -obb.projected_radius(normal) {
            return false;
        }
    }
    let depth = v.dot(&frustum.dir);
    let radius = obb.projected_radius(&frustum.dir);
    depth >= frustum.near + radius && depth <= frustum.far - radius
}

/// Returns true if the whole box is on the positive side of every plane
pub fn in_convex_region(obb: &Obb, planes: &[Plane]) -> bool {
    planes
        .iter()
        .all(|plane| plane.signed_distance(&obb.center) >= obb.projected_radius(&plane.normal))
}

/// Convex polygon on the normalized image plane
///
/// Each edge is stored as a plane through the camera origin, so the region is
/// a cone in the camera frame. `center` is a point inside the polygon at unit
/// depth.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexRegion {
    planes: Vec<Plane>,
    center: Point3<f64>,
}

impl ConvexRegion {
    /// Region bounded by the polygon of `points` given in pixels
    ///
    /// Falls back to the image borders if less than 3 usable edges remain.
    pub fn from_image_points(points: &[Point2<f64>], intrinsics: &CameraIntrinsics) -> Self {
        if points.len() < 3 {
            warn!(
                "convex region has only {} points, using the image borders",
                points.len()
            );
            return Self::fallback(intrinsics);
        }
        let points = points.iter().map(|p| intrinsics.normalize(p)).collect::<Vec<_>>();
        let mean = points.iter().fold(Vector2::zeros(), |sum, p| sum + p.coords) / points.len() as f64;

        let mut planes = Vec::with_capacity(points.len());
        let mut prev = points[points.len() - 1];
        for point in &points {
            let edge = point - prev;
            if edge.norm() > MIN_EDGE_LENGTH {
                let mut normal = Vector2::new(edge.y, -edge.x);
                if normal.dot(&(mean - prev.coords)) < 0.0 {
                    normal = -normal;
                }
                let offset = -normal.dot(&prev.coords);
                let normal = Vector3::new(normal.x, normal.y, offset).normalize();
                planes.push(Plane::new(normal, 0.0));
            }
            prev = *point;
        }
        if planes.len() < 3 {
            warn!("convex region is degenerate, using the image borders");
            return Self::fallback(intrinsics);
        }

        // area weighted centroid of the triangle fan
        let mut total_area = 0.0;
        let mut weighted = Vector2::zeros();
        for i in 2..points.len() {
            let v0 = points[i - 1] - points[0];
            let v1 = points[i] - points[0];
            let area = (v0.x * v1.y - v0.y * v1.x).abs();
            weighted += (points[0].coords + points[i - 1].coords + points[i].coords) * area;
            total_area += area;
        }
        let center = if total_area > MIN_EDGE_LENGTH {
            weighted / (3.0 * total_area)
        } else {
            mean
        };
        ConvexRegion {
            planes,
            center: Point3::new(center.x, center.y, 1.0),
        }
    }

    /// Region of the whole image
    pub fn fallback(intrinsics: &CameraIntrinsics) -> Self {
        let width = intrinsics.width as f64;
        let height = intrinsics.height as f64;
        let planes = [
            Vector3::new(1.0, 0.0, intrinsics.cx / intrinsics.fx),
            Vector3::new(-1.0, 0.0, (width - intrinsics.cx) / intrinsics.fx),
            Vector3::new(0.0, 1.0, intrinsics.cy / intrinsics.fy),
            Vector3::new(0.0, -1.0, (height - intrinsics.cy) / intrinsics.fy),
        ]
        .iter()
        .map(|n| Plane::new(n.normalize(), 0.0))
        .collect();
        ConvexRegion {
            planes,
            center: Point3::new(0.0, 0.0, 1.0),
        }
    }

    /// Planes in the camera frame
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn center(&self) -> &Point3<f64> {
        &self.center
    }

    /// Planes in the world frame for a camera at `tcamera`
    pub fn world_planes(&self, tcamera: &Isometry3<f64>) -> Vec<Plane> {
        self.planes.iter().map(|plane| plane.transformed(tcamera)).collect()
    }

    /// Returns true if all boxes, given in the world frame, are in the region
    pub fn contains(&self, obbs: &[Obb], tcamera: &Isometry3<f64>) -> bool {
        let planes = self.world_planes(tcamera);
        obbs.iter().all(|obb| in_convex_region(obb, &planes))
    }
}
