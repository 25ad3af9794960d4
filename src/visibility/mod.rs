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
//! Keep a target in the view of a camera mounted on the robot
//!
//! [`VisibilityConstraint`] tells whether the target is seen from a camera
//! pose, and [`ViewpointGenerator`] turns camera poses around the target into
//! goal configurations for the planner.
mod culling;
pub use culling::*;

mod occlusion;
pub use occlusion::*;

mod constraint;
pub use constraint::*;

mod viewpoint;
pub use viewpoint::*;

pub mod files;
