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
use std::ops::{Deref, DerefMut};

use super::{BodyId, Scene};
use crate::errors::*;

/// Toggles enabled flags of bodies and restores the previous flags on drop
///
/// The guard borrows the scene mutably and gives access to it through
/// `Deref`, so every query made while the flags are toggled goes through it.
pub struct EnableStateGuard<'a, S>
where
    S: Scene + ?Sized,
{
    scene: &'a mut S,
    saved: Vec<(BodyId, bool)>,
}

impl<'a, S> EnableStateGuard<'a, S>
where
    S: Scene + ?Sized,
{
    /// Sets each `(body, enabled)` pair, remembering the previous flags
    ///
    /// If one of the bodies is unknown, the flags already changed are restored
    /// before the error is returned.
    pub fn new(scene: &'a mut S, settings: &[(BodyId, bool)]) -> Result<Self> {
        let mut guard = EnableStateGuard {
            scene,
            saved: Vec::with_capacity(settings.len()),
        };
        for &(body, enabled) in settings {
            let previous = guard.scene.is_enabled(body)?;
            guard.scene.set_enabled(body, enabled)?;
            guard.saved.push((body, previous));
        }
        Ok(guard)
    }
}

impl<'a, S> Deref for EnableStateGuard<'a, S>
where
    S: Scene + ?Sized,
{
    type Target = S;
    fn deref(&self) -> &S {
        self.scene
    }
}

impl<'a, S> DerefMut for EnableStateGuard<'a, S>
where
    S: Scene + ?Sized,
{
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<'a, S> Drop for EnableStateGuard<'a, S>
where
    S: Scene + ?Sized,
{
    fn drop(&mut self) {
        for &(body, enabled) in self.saved.iter().rev() {
            if let Err(err) = self.scene.set_enabled(body, enabled) {
                error!("failed to restore enabled flag of body {}: {}", body, err);
            }
        }
    }
}

/// Restores the joint values of a body on drop
pub struct JointStateSaver<'a, S>
where
    S: Scene + ?Sized,
{
    scene: &'a mut S,
    body: BodyId,
    saved: Vec<f64>,
}

impl<'a, S> JointStateSaver<'a, S>
where
    S: Scene + ?Sized,
{
    pub fn new(scene: &'a mut S, body: BodyId) -> Result<Self> {
        let saved = scene.joint_values(body)?;
        Ok(JointStateSaver { scene, body, saved })
    }
}

impl<'a, S> Deref for JointStateSaver<'a, S>
where
    S: Scene + ?Sized,
{
    type Target = S;
    fn deref(&self) -> &S {
        self.scene
    }
}

impl<'a, S> DerefMut for JointStateSaver<'a, S>
where
    S: Scene + ?Sized,
{
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<'a, S> Drop for JointStateSaver<'a, S>
where
    S: Scene + ?Sized,
{
    fn drop(&mut self) {
        if let Err(err) = self.scene.set_joint_values(self.body, &self.saved) {
            error!("failed to restore joint values of body {}: {}", self.body, err);
        }
    }
}
