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
//! # Motion Planning with Camera Visibility
//!
//! Sampling based planning of joint trajectories while a camera on the robot
//! keeps a target in sight. `parry3d` is used for the reference collision
//! scene, any environment implementing [`Scene`] and [`SegmentCollision`] can
//! be plugged in instead.
//!
//! # Example
//!
//! ```
//! use gaze_planner::{IntervalType, Range, RrtPlannerBuilder, StepValidator, WeightedDistanceMetric};
//!
//! /// free plane with a disk obstacle
//! struct Disk;
//!
//! impl StepValidator for Disk {
//!     fn is_segment_colliding(&mut self, from: &[f64], to: &[f64], interval: IntervalType) -> bool {
//!         gaze_planner::interpolate(from, to, 0.01, interval)
//!             .iter()
//!             .any(|p| p[0] * p[0] + p[1] * p[1] < 0.25)
//!     }
//! }
//!
//! let mut planner = RrtPlannerBuilder::new(
//!     vec![Range::new(-2.0, 2.0), Range::new(-2.0, 2.0)],
//!     WeightedDistanceMetric::new(vec![1.0, 1.0]).unwrap(),
//! )
//! .step_length(0.1)
//! .seed(0)
//! .finalize()
//! .unwrap();
//! let path = planner.plan(&[-1.0, 0.0], &[1.0, 0.0], &mut Disk).unwrap();
//! println!("path = {:?}", path);
//! ```

mod errors;
pub use errors::*;

mod funcs;
pub use funcs::*;

mod geometry;
pub use geometry::*;

mod ik;
pub use ik::*;

pub mod collision;
pub use collision::*;

pub mod planner;
pub use planner::*;

pub mod visibility;
pub use visibility::*;
