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
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::collision::BodyId;

#[derive(Debug, Error)]
/// Error for `gaze_planner`
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("failed to parse {}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("body {0} is not in the scene")]
    UnknownBody(BodyId),
    #[error("link {link} is not a part of body {body}")]
    UnknownLink { body: BodyId, link: usize },
    #[error("invalid node: {0}")]
    InvalidNode(String),
    #[error("no feasible viewpoint found in {num_poses} camera poses after two passes")]
    SamplingExhaustion { num_poses: usize },
    #[error("planning failed: {0}")]
    Planning(String),
    #[error("{0}")]
    Other(String),
}

/// Result for `gaze_planner`
pub type Result<T> = ::std::result::Result<T, Error>;

impl<'a> From<&'a str> for Error {
    fn from(err: &'a str) -> Error {
        Error::Other(err.to_owned())
    }
}

impl From<String> for Error {
    fn from(error: String) -> Error {
        Error::Other(error)
    }
}
