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
//! Line oriented input files
//!
//! Every non empty line holds a fixed number of whitespace separated numbers.
//! Lines starting with `#` are ignored.
//!
//! * region points: `u v` in pixels
//! * view directions: `x y z`, the length is the camera distance
//! * camera transforms: a row major 3x3 rotation followed by the translation
use nalgebra as na;
use std::fs;
use std::path::Path;

use crate::errors::*;

fn read_rows<P>(path: P, width: usize) -> Result<Vec<Vec<f64>>>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let mut rows = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parse_error = |message: String| Error::Parse {
            path: path.to_owned(),
            line: i + 1,
            message,
        };
        let row = line
            .split_whitespace()
            .map(|word| {
                word.parse::<f64>()
                    .map_err(|err| parse_error(format!("{}: {}", word, err)))
            })
            .collect::<Result<Vec<_>>>()?;
        if row.len() != width {
            return Err(parse_error(format!(
                "expected {} values, found {}",
                width,
                row.len()
            )));
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Boundary points of the convex region in pixels
pub fn read_points<P>(path: P) -> Result<Vec<na::Point2<f64>>>
where
    P: AsRef<Path>,
{
    Ok(read_rows(path, 2)?
        .into_iter()
        .map(|row| na::Point2::new(row[0], row[1]))
        .collect())
}

pub fn read_directions<P>(path: P) -> Result<Vec<na::Vector3<f64>>>
where
    P: AsRef<Path>,
{
    Ok(read_rows(path, 3)?
        .into_iter()
        .map(|row| na::Vector3::new(row[0], row[1], row[2]))
        .collect())
}

/// Camera transforms relative to the target
///
/// The rotation part is projected on the closest rotation matrix.
pub fn read_transforms<P>(path: P) -> Result<Vec<na::Isometry3<f64>>>
where
    P: AsRef<Path>,
{
    Ok(read_rows(path, 12)?
        .into_iter()
        .map(|row| {
            let matrix = na::Matrix3::from_row_slice(&row[0..9]);
            let rotation = na::Rotation3::from_matrix(&matrix);
            na::Isometry3::from_parts(
                na::Translation3::new(row[9], row[10], row[11]),
                na::UnitQuaternion::from_rotation_matrix(&rotation),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("gaze_planner_{}_{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_read_points() {
        let path = write_temp("points.txt", "# mask\n10 20\n\n 30.5   40\n");
        let points = read_points(&path).unwrap();
        assert_eq!(points, vec![na::Point2::new(10.0, 20.0), na::Point2::new(30.5, 40.0)]);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_read_errors() {
        let path = write_temp("bad_directions.txt", "0 0 1\n0 1\n");
        match read_directions(&path) {
            Err(Error::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
        fs::remove_file(&path).unwrap();

        let path = write_temp("nan_directions.txt", "0 x 1\n");
        assert!(matches!(read_directions(&path), Err(Error::Parse { line: 1, .. })));
        fs::remove_file(&path).unwrap();

        assert!(matches!(
            read_points("/nonexistent/gaze_planner/points.txt"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_read_transforms() {
        // rotation of 90 degrees around z
        let path = write_temp("transforms.txt", "0 -1 0 1 0 0 0 0 1 0.1 0.2 0.3\n1 0 0 0 1 0 0 0 1 0 0 -1\n");
        let transforms = read_transforms(&path).unwrap();
        assert_eq!(transforms.len(), 2);
        let rotated = transforms[0] * na::Point3::new(1.0, 0.0, 0.0);
        assert!((rotated - na::Point3::new(0.1, 1.2, 0.3)).norm() < 1e-6);
        assert!((transforms[1].translation.vector - na::Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-12);
        fs::remove_file(path).unwrap();
    }
}
