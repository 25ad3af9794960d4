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
use gaze_planner::*;
use nalgebra as na;
use na::{Isometry3, Vector3};
use parry3d_f64::shape::SharedShape;
use std::f64::consts::PI;

fn intrinsics() -> CameraIntrinsics {
    CameraIntrinsics {
        fx: 500.0,
        fy: 500.0,
        cx: 320.0,
        cy: 240.0,
        width: 640,
        height: 480,
    }
}

/// joints are the position and the scaled rotation axis of the camera
fn floating_pose(q: &[f64]) -> Isometry3<f64> {
    Isometry3::new(Vector3::new(q[0], q[1], q[2]), Vector3::new(q[3], q[4], q[5]))
}

fn floating_ik(target: &Isometry3<f64>, _seed: &[f64]) -> Option<Vec<f64>> {
    let t = target.translation.vector;
    let r = target.rotation.scaled_axis();
    Some(vec![t.x, t.y, t.z, r.x, r.y, r.z])
}

struct Fixture {
    scene: ShapeScene,
    robot: RobotHandle,
    target: BodyId,
}

const START: [f64; 6] = [0.0, 0.0, -0.5, 0.0, 0.0, 0.0];

/// a flying camera with a finger behind it, looking at a small box
fn fixture() -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut scene = ShapeScene::new(0.005);
    let target = scene.add_body(
        "target",
        vec![("box".to_owned(), SharedShape::cuboid(0.05, 0.05, 0.05), Isometry3::identity())],
        Isometry3::translation(0.0, 0.0, 0.5),
    );
    let body = scene.add_body(
        "camera_robot",
        vec![
            ("camera".to_owned(), SharedShape::cuboid(0.02, 0.02, 0.02), Isometry3::identity()),
            ("finger".to_owned(), SharedShape::cuboid(0.01, 0.01, 0.02), Isometry3::identity()),
        ],
        Isometry3::identity(),
    );
    scene
        .set_forward_kinematics(
            body,
            START.to_vec(),
            Box::new(|q: &[f64]| {
                let camera = floating_pose(q);
                vec![camera, camera * Isometry3::translation(0.0, 0.0, -0.05)]
            }),
        )
        .unwrap();
    scene.set_active_robot(body, (0..6).collect()).unwrap();
    let robot = RobotHandle {
        body,
        sensors: vec![CameraSensor {
            name: "camera".to_owned(),
            link: 0,
            relative_transform: Isometry3::identity(),
            kind: SensorKind::Camera(intrinsics()),
        }],
        manipulators: vec![Manipulator {
            name: "camera_arm".to_owned(),
            end_effector: 0,
            grasp: Isometry3::identity(),
            arm_joints: (0..6).collect(),
        }],
        active_joints: (0..6).collect(),
        camera_child_links: vec![1],
    };
    Fixture { scene, robot, target }
}

fn small_pose_set() -> ViewpointParameters {
    ViewpointParameters {
        num_rolls: 2,
        num_distances: 1,
        min_distance: 0.4,
        sphere_subdivisions: 0,
        seed: Some(3),
        ..Default::default()
    }
}

#[test]
fn test_visibility_of_current_configuration() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    assert!(constraint.is_visible(&mut scene).unwrap());

    // candidate configurations
    let mut looking_away = [0.0, 0.0, -0.5, PI, 0.0, 0.0];
    assert!(!constraint.project(&mut scene, &START, &mut looking_away).unwrap());
    let mut closer = [0.0, 0.0, -0.2, 0.0, 0.0, 0.0];
    assert!(constraint.project(&mut scene, &START, &mut closer).unwrap());
    assert_eq!(closer, [0.0, 0.0, -0.2, 0.0, 0.0, 0.0]);
    assert_eq!(scene.joint_values(robot.body).unwrap(), START.to_vec());

    let blocker = scene.add_body(
        "blocker",
        vec![("plate".to_owned(), SharedShape::cuboid(0.1, 0.1, 0.01), Isometry3::identity())],
        Isometry3::identity(),
    );
    assert!(!constraint.is_visible(&mut scene).unwrap());
    assert!(scene.is_enabled(target).unwrap());
    assert!(!scene.is_enabled(constraint.occlusion().proxy()).unwrap());

    scene.remove_body(blocker).unwrap();
    assert!(constraint.is_visible(&mut scene).unwrap());
    constraint.destroy(&mut scene).unwrap();
}

#[test]
fn test_construction_errors() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let result = VisibilityConstraintBuilder::new(robot.clone(), target)
        .sensor_index(1)
        .finalize(&mut scene);
    assert!(matches!(result, Err(Error::Config(_))));

    let mut not_camera = robot.clone();
    not_camera.sensors[0].kind = SensorKind::Other;
    let result = VisibilityConstraintBuilder::new(not_camera, target).finalize(&mut scene);
    assert!(matches!(result, Err(Error::Config(_))));

    let mut no_manipulator = robot.clone();
    no_manipulator.manipulators[0].end_effector = 1;
    let result = VisibilityConstraintBuilder::new(no_manipulator, target).finalize(&mut scene);
    assert!(matches!(result, Err(Error::Config(_))));

    let result = VisibilityConstraintBuilder::new(robot.clone(), target)
        .region(RegionSource::File("/nonexistent/gaze_planner/mask.txt".into()))
        .finalize(&mut scene);
    assert!(matches!(result, Err(Error::Io(_))));

    // two points can not make a region
    let constraint = VisibilityConstraintBuilder::new(robot, target)
        .region(RegionSource::Points(vec![na::Point2::new(0.0, 0.0), na::Point2::new(10.0, 10.0)]))
        .finalize(&mut scene)
        .unwrap();
    assert_eq!(constraint.region(), &ConvexRegion::fallback(&intrinsics()));
    assert!(constraint.is_visible(&mut scene).unwrap());
}

#[test]
fn test_sample_feasible_poses() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    let mut generator = ViewpointGenerator::new(&scene, constraint, floating_ik, &small_pose_set()).unwrap();
    let num_poses = generator.camera_pose_set().len();
    assert_eq!(num_poses, 24);
    assert_eq!(generator.visible_camera_poses().len(), num_poses);

    let mut samples = Vec::new();
    for _ in 0..num_poses {
        samples.push(generator.sample(&mut scene).unwrap());
    }
    // every pose is feasible, so each sample takes exactly one evaluation
    assert_eq!(generator.num_evaluations(), num_poses);
    assert_eq!(scene.joint_values(robot.body).unwrap(), START.to_vec());

    for sample in &samples {
        assert_eq!(sample.len(), 6);
        scene.set_joint_values(robot.body, sample).unwrap();
        assert!(generator.constraint().is_visible(&mut scene).unwrap());
        let camera = generator.constraint().camera_pose(&scene).unwrap();
        let distance = (camera.translation.vector - Vector3::new(0.0, 0.0, 0.5)).norm();
        assert!((distance - 0.4).abs() < 1e-6);
    }
    generator.destroy(&mut scene).unwrap();
}

#[test]
fn test_sampling_exhaustion() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot, target)
        .finalize(&mut scene)
        .unwrap();
    let unreachable = |_: &Isometry3<f64>, _: &[f64]| -> Option<Vec<f64>> { None };
    let mut generator = ViewpointGenerator::new(&scene, constraint, unreachable, &small_pose_set()).unwrap();
    match generator.sample(&mut scene) {
        Err(Error::SamplingExhaustion { num_poses }) => assert_eq!(num_poses, 24),
        other => panic!("unexpected {:?}", other),
    }
    // two full passes and no more
    assert_eq!(generator.num_evaluations(), 48);
    assert!(generator.sample(&mut scene).is_err());
}

#[test]
fn test_pose_sources() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    let params = ViewpointParameters {
        source: PoseSource::Directions(vec![Vector3::new(0.0, 0.0, 0.5), Vector3::new(0.0, 0.0, 0.01), Vector3::zeros()]),
        num_rolls: 2,
        ..Default::default()
    };
    let generator = ViewpointGenerator::new(&scene, constraint, floating_ik, &params).unwrap();
    // the zero direction is skipped, the camera inside the box can not see it
    assert_eq!(generator.camera_pose_set().len(), 4);
    assert_eq!(generator.visible_camera_poses().len(), 2);
    generator.destroy(&mut scene).unwrap();

    let path = std::env::temp_dir().join(format!("gaze_planner_transforms_{}.txt", std::process::id()));
    std::fs::write(&path, "1 0 0 0 1 0 0 0 1 0 0 -0.5\n1 0 0 0 -1 0 0 0 -1 0 0 0.5\n").unwrap();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    let params = ViewpointParameters {
        source: PoseSource::TransformFile(path.clone()),
        ..Default::default()
    };
    let mut generator = ViewpointGenerator::new(&scene, constraint, floating_ik, &params).unwrap();
    assert_eq!(generator.camera_pose_set().len(), 2);
    let sample = generator.sample(&mut scene).unwrap();
    scene.set_joint_values(robot.body, &sample).unwrap();
    assert!(generator.constraint().is_visible(&mut scene).unwrap());
    generator.destroy(&mut scene).unwrap();
    std::fs::remove_file(path).unwrap();

    let constraint = VisibilityConstraintBuilder::new(robot, target)
        .finalize(&mut scene)
        .unwrap();
    let params = ViewpointParameters {
        source: PoseSource::Directions(vec![Vector3::zeros()]),
        ..Default::default()
    };
    assert!(matches!(
        ViewpointGenerator::new(&scene, constraint, floating_ik, &params),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_extend_keeps_target_visible() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    let mut tree = SpatialTree::new(WeightedDistanceMetric::new(vec![1.0; 6]).unwrap(), 0.1).unwrap();
    tree.reset(&START);
    {
        let mut validator = VisibilityStepValidator::new(&mut scene, &constraint);
        let (result, _) = tree.extend(&[0.0, 0.05, -0.2, 0.0, 0.0, 0.0], false, &mut validator);
        assert_eq!(result, ExtendResult::Connected);
        let (result, _) = tree.extend(&[0.0, 0.0, -0.5, PI * 0.9, 0.0, 0.0], false, &mut validator);
        assert_ne!(result, ExtendResult::Connected);
    }
    for node in tree.nodes() {
        scene.set_joint_values(robot.body, &node.config).unwrap();
        assert!(constraint.is_visible(&mut scene).unwrap());
    }
}

#[test]
fn test_plan_to_visibility_goal() {
    let Fixture {
        mut scene,
        robot,
        target,
    } = fixture();
    let constraint = VisibilityConstraintBuilder::new(robot.clone(), target)
        .finalize(&mut scene)
        .unwrap();
    let mut generator = ViewpointGenerator::new(&scene, constraint, floating_ik, &small_pose_set()).unwrap();
    let mut limits = vec![Range::new(-1.0, 1.0); 3];
    limits.extend(vec![Range::new(-PI, PI); 3]);
    let mut planner = RrtPlannerBuilder::new(limits, WeightedDistanceMetric::new(vec![1.0; 6]).unwrap())
        .step_length(0.1)
        .max_try(3000)
        .num_smoothing(20)
        .seed(5)
        .finalize()
        .unwrap();

    let path = planner
        .plan_with_goal_sampler(&START, &mut Unconstrained(&mut scene), |validator| {
            generator.sample(&mut *validator.0)
        })
        .unwrap();
    assert_eq!(path[0], START.to_vec());
    for pair in path.windows(2) {
        assert!(!scene.is_segment_colliding(&pair[0], &pair[1], IntervalType::Closed));
    }
    scene.set_joint_values(robot.body, path.last().unwrap()).unwrap();
    assert!(generator.constraint().is_visible(&mut scene).unwrap());
}
