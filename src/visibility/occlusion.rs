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
use na::{Isometry3, Point3, Vector2, Vector3};

use crate::collision::{BodyId, EnableStateGuard, Scene};
use crate::errors::*;
use crate::geometry::Obb;

const MIN_DEPTH: f64 = 1e-9;
const MIN_LENGTH: f64 = 1e-12;

/// Faces seen from the camera, one for each axis of the box
///
/// The corner indices follow [`Obb::corners`]. The last corner of a face is
/// diagonal to the first one.
fn visible_faces(obb: &Obb) -> [[usize; 4]; 3] {
    [
        if obb.right.z >= 0.0 { [4, 5, 6, 7] } else { [0, 1, 2, 3] },
        if obb.up.z >= 0.0 { [2, 3, 6, 7] } else { [0, 1, 4, 5] },
        if obb.dir.z >= 0.0 { [1, 3, 5, 7] } else { [0, 2, 4, 6] },
    ]
}

/// Call `test` for the points of a line from `start` to `end`, `delta` apart
fn sample_line<F>(start: Vector2<f64>, end: Vector2<f64>, delta: f64, test: &mut F) -> bool
where
    F: FnMut(&Vector3<f64>) -> bool,
{
    let num_steps = (((end - start).norm() / delta) as usize).max(1);
    let step = (end - start) / num_steps as f64;
    (0..=num_steps).all(|k| {
        let p = start + step * k as f64;
        test(&Vector3::new(p.x, p.y, 1.0))
    })
}

/// Sample rays over the silhouette of a box given in the camera frame
///
/// The corners, shrunk by `scale` so that the rays do not graze the edges,
/// are projected on the plane at unit depth. Each of the three faces seen by
/// the camera is swept by lines between two of its edges. Points are about
/// `delta` apart and passed to `test` as ray directions in the camera frame.
/// Returns true if `test` accepts every ray, and false if a corner is not in
/// front of the camera.
pub fn sample_projected_obb<F>(obb: &Obb, delta: f64, scale: f64, mut test: F) -> bool
where
    F: FnMut(&Vector3<f64>) -> bool,
{
    let corners = obb.corners(scale);
    if corners.iter().any(|c| c.z <= MIN_DEPTH) {
        debug!("box is not in front of the camera");
        return false;
    }
    let projected = corners
        .iter()
        .map(|c| Vector2::new(c.x / c.z, c.y / c.z))
        .collect::<Vec<_>>();

    for face in visible_faces(obb).iter() {
        let v0 = projected[face[0]];
        let v1 = projected[face[1]] - v0;
        let v2 = projected[face[2]] - v0;
        let v3 = projected[face[3]] - v0;
        let diagonal = v3.norm();
        if diagonal < MIN_LENGTH {
            continue;
        }
        let v3_perp = Vector2::new(-v3.y, v3.x) / diagonal;

        // from the diagonal toward the corner 1, including both ends
        let n1 = ((v3_perp.dot(&v1).abs() / delta) as usize).max(1);
        let (delta1, delta2) = (v1 / n1 as f64, (v1 - v3) / n1 as f64);
        for j in 0..=n1 {
            let start = v0 + delta1 * j as f64;
            let end = v0 + v3 + delta2 * j as f64;
            if !sample_line(start, end, delta, &mut test) {
                return false;
            }
        }

        // from the diagonal toward the corner 2, the diagonal is already done
        let n2 = (v3_perp.dot(&v2).abs() / delta) as usize;
        if n2 == 0 {
            continue;
        }
        let (delta1, delta2) = (v2 / n2 as f64, (v2 - v3) / n2 as f64);
        for j in 1..=n2 {
            let start = v0 + delta1 * j as f64;
            let end = v0 + v3 + delta2 * j as f64;
            if !sample_line(start, end, delta, &mut test) {
                return false;
            }
        }
    }
    true
}

/// Ray based occlusion test of a target body
///
/// Rays are cast against a box standing in for the target, so that the
/// first hit tells whether something is in front of the target. The box is a
/// body of the scene which is enabled only during [`OcclusionSampler::is_occluded`].
#[derive(Debug)]
pub struct OcclusionSampler {
    proxy: BodyId,
    target: BodyId,
    /// distance of the samples on the image plane at unit depth
    pub sample_delta: f64,
    /// distance from the camera to the ray origins
    pub ray_offset: f64,
    /// shrink factor of the sampled boxes
    pub obb_shrink: f64,
}

impl OcclusionSampler {
    /// Create the stand-in box of `target` in the scene
    pub fn new<S>(scene: &mut S, target: BodyId, sample_delta: f64) -> Result<Self>
    where
        S: Scene + ?Sized,
    {
        if !(sample_delta > 0.0) {
            return Err(Error::Config(format!("invalid sample delta {}", sample_delta)));
        }
        let aabb = scene.local_aabb(target)?;
        let proxy = scene.add_box_body("proxy_target", &aabb);
        let target_pose = scene.transform(target)?;
        scene.set_transform(proxy, &target_pose)?;
        debug!("created proxy body {} for target {}", proxy, target);
        Ok(OcclusionSampler {
            proxy,
            target,
            sample_delta,
            ray_offset: 0.05,
            obb_shrink: 0.95,
        })
    }

    pub fn proxy(&self) -> BodyId {
        self.proxy
    }

    pub fn target(&self) -> BodyId {
        self.target
    }

    /// Returns true if anything hides a part of the boxes from the camera
    ///
    /// `target_obbs` are in the world frame. The target is disabled and the
    /// stand-in box enabled while the rays are cast, the previous flags are
    /// restored on return.
    pub fn is_occluded<S>(&self, scene: &mut S, target_obbs: &[Obb], tcamera: &Isometry3<f64>) -> Result<bool>
    where
        S: Scene + ?Sized,
    {
        let target_pose = scene.transform(self.target)?;
        scene.set_transform(self.proxy, &target_pose)?;
        let guard = EnableStateGuard::new(scene, &[(self.proxy, true), (self.target, false)])?;
        let camera_inv = tcamera.inverse();
        for obb in target_obbs {
            let camera_obb = obb.transformed(&camera_inv);
            if !sample_projected_obb(&camera_obb, self.sample_delta, self.obb_shrink, |v| {
                self.test_ray(&*guard, tcamera, v)
            }) {
                debug!("target is occluded");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns true if the ray reaches the stand-in box first
    fn test_ray<S>(&self, scene: &S, tcamera: &Isometry3<f64>, v: &Vector3<f64>) -> bool
    where
        S: Scene + ?Sized,
    {
        let dir = tcamera.rotation * v.normalize();
        let origin = Point3::from(tcamera.translation.vector + dir * self.ray_offset);
        match scene.ray_cast(&origin, &dir) {
            None => {
                // the box is in front of the camera, missing it is tolerated
                debug!("ray {:?} hits nothing", dir);
                true
            }
            Some(hit) if hit.body == self.proxy => true,
            Some(hit) => {
                debug!("ray hits body {} link {} at {:?}", hit.body, hit.link, hit.point);
                false
            }
        }
    }

    /// Remove the stand-in box from the scene
    pub fn destroy<S>(self, scene: &mut S) -> Result<()>
    where
        S: Scene + ?Sized,
    {
        scene.remove_body(self.proxy)
    }
}
