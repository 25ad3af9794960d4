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
//! Move a camera on a gantry until it sees a box behind a wall
//!
//! `RUST_LOG=gaze_planner=debug cargo run --example visibility_goal`
use gaze_planner::*;
use nalgebra as na;
use parry3d_f64::shape::SharedShape;
use std::f64::consts::PI;

/// joints: x, y, z of the carriage, pan and tilt of the camera head
fn gantry_kinematics(q: &[f64]) -> Vec<na::Isometry3<f64>> {
    let carriage = na::Isometry3::translation(q[0], q[1], q[2]);
    let head = carriage
        * na::Isometry3::rotation(na::Vector3::y() * q[3])
        * na::Isometry3::rotation(na::Vector3::x() * q[4]);
    vec![
        carriage * na::Isometry3::translation(0.0, 0.0, -0.1),
        head,
        head * na::Isometry3::translation(0.0, 0.03, 0.0),
    ]
}

/// Closed form inverse kinematics of the head, which can not roll
fn gantry_ik(target: &na::Isometry3<f64>, _seed: &[f64]) -> Option<Vec<f64>> {
    let dir = target.rotation * na::Vector3::z();
    let pan = dir.x.atan2(dir.z);
    let tilt = (-dir.y).clamp(-1.0, 1.0).asin();
    let reached = na::UnitQuaternion::from_scaled_axis(na::Vector3::y() * pan)
        * na::UnitQuaternion::from_scaled_axis(na::Vector3::x() * tilt);
    if reached.angle_to(&target.rotation) > 1e-3 {
        return None;
    }
    let t = target.translation.vector;
    Some(vec![t.x, t.y, t.z, pan, tilt])
}

fn main() -> Result<()> {
    env_logger::init();
    let intrinsics = CameraIntrinsics {
        fx: 525.0,
        fy: 525.0,
        cx: 319.5,
        cy: 239.5,
        width: 640,
        height: 480,
    };

    let mut scene = ShapeScene::new(0.01);
    let target = scene.add_body(
        "target",
        vec![("box".to_owned(), SharedShape::cuboid(0.04, 0.06, 0.04), na::Isometry3::identity())],
        na::Isometry3::translation(0.0, 0.0, 1.0),
    );
    scene.add_body(
        "wall",
        vec![("wall".to_owned(), SharedShape::cuboid(0.3, 0.3, 0.01), na::Isometry3::identity())],
        na::Isometry3::translation(0.0, 0.0, 0.5),
    );
    let gantry = scene.add_body(
        "gantry",
        vec![
            ("carriage".to_owned(), SharedShape::cuboid(0.03, 0.03, 0.03), na::Isometry3::identity()),
            ("camera".to_owned(), SharedShape::cuboid(0.02, 0.015, 0.02), na::Isometry3::identity()),
            ("mount".to_owned(), SharedShape::cuboid(0.01, 0.01, 0.01), na::Isometry3::identity()),
        ],
        na::Isometry3::identity(),
    );
    let start = vec![0.0, 0.0, 0.0, 0.0, 0.0];
    scene.set_forward_kinematics(gantry, start.clone(), Box::new(gantry_kinematics))?;
    scene.set_active_robot(gantry, (0..5).collect())?;

    let robot = RobotHandle {
        body: gantry,
        sensors: vec![CameraSensor {
            name: "head_camera".to_owned(),
            link: 1,
            relative_transform: na::Isometry3::identity(),
            kind: SensorKind::Camera(intrinsics),
        }],
        manipulators: vec![Manipulator {
            name: "head".to_owned(),
            end_effector: 1,
            grasp: na::Isometry3::identity(),
            arm_joints: (0..5).collect(),
        }],
        active_joints: (0..5).collect(),
        camera_child_links: vec![2],
    };
    let constraint = VisibilityConstraintBuilder::new(robot, target)
        .region(RegionSource::Points(vec![
            na::Point2::new(120.0, 60.0),
            na::Point2::new(520.0, 60.0),
            na::Point2::new(560.0, 420.0),
            na::Point2::new(80.0, 420.0),
        ]))
        .finalize(&mut scene)?;
    println!("visible at start: {}", constraint.is_visible(&mut scene)?);

    let params = ViewpointParameters {
        num_distances: 3,
        min_distance: 0.3,
        delta_distance: 0.1,
        sphere_subdivisions: 2,
        seed: Some(0),
        ..Default::default()
    };
    let mut generator = ViewpointGenerator::new(&scene, constraint, gantry_ik, &params)?;
    println!(
        "{} camera poses, {} with the target in the region",
        generator.camera_pose_set().len(),
        generator.visible_camera_poses().len()
    );

    let limits = vec![
        Range::new(-1.0, 1.0),
        Range::new(-1.0, 1.0),
        Range::new(-0.5, 2.0),
        Range::new(-PI, PI),
        Range::new(-PI / 2.0, PI / 2.0),
    ];
    let metric = WeightedDistanceMetric::from_dofs(&[1.0, 1.0, 1.0, 0.5, 0.5], AffineDofs::default())?;
    let mut planner = RrtPlannerBuilder::new(limits, metric)
        .step_length(0.05)
        .max_try(10000)
        .seed(0)
        .finalize()?;
    let path = planner.plan_with_goal_sampler(&start, &mut Unconstrained(&mut scene), |validator| {
        generator.sample(&mut *validator.0)
    })?;
    for (i, config) in path.iter().enumerate() {
        println!("{:3}: {:?}", i, config);
    }

    if let Some(goal) = path.last() {
        scene.set_joint_values(gantry, goal)?;
        println!("visible at goal: {}", generator.constraint().is_visible(&mut scene)?);
    }
    generator.destroy(&mut scene)
}
