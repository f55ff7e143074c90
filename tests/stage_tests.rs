use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use glam::{Quat, UVec2, Vec2, Vec3, Vec4};
use runtime_icons::camera::Projection;
use runtime_icons::fit::Padding;
use runtime_icons::orientation::OrientationThresholds;
use runtime_icons::renderer::Mesh;
use runtime_icons::stage::SCALE_MARGIN;
use runtime_icons::traits::{
    GeometrySource, Light, LightingHost, LocalTransform, NodeId, SceneGraph,
};
use runtime_icons::{
    Frame, MemoryScene, OrientationSelector, Stage, StageError, StageResult, StageSettings,
    StageState,
};

#[cfg(test)]
mod stage_tests {
    use super::*;

    const STAGE_POSITION: Vec3 = Vec3::new(0.0, 100.0, 100.0);

    struct Fixture {
        scene: MemoryScene,
        stage: Stage,
        shelf: NodeId,
        mug: NodeId,
    }

    fn mug_transform() -> LocalTransform {
        LocalTransform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(0.7),
            scale: Vec3::splat(2.0),
        }
    }

    fn setup() -> Fixture {
        let mut scene = MemoryScene::new();
        let stage = Stage::create(
            &mut scene,
            StageSettings {
                position: STAGE_POSITION,
                resolution: UVec2::new(64, 64),
                padding: Padding::Pixels(Vec2::new(8.0, 8.0)),
                ..StageSettings::default()
            },
        );

        let shelf = scene.create_node("Shelf", None);
        scene.set_local_transform(shelf, LocalTransform::from_position(Vec3::new(5.0, 0.0, 0.0)));
        let mug = scene.spawn_mesh(
            "Mug",
            Some(shelf),
            Mesh::cuboid(Vec3::new(0.6, 1.0, 0.6), Vec4::new(0.8, 0.3, 0.2, 1.0)),
        );
        scene.set_local_transform(mug, mug_transform());

        Fixture {
            scene,
            stage,
            shelf,
            mug,
        }
    }

    fn shoot(stage: &mut Stage, scene: &mut MemoryScene, node: NodeId) -> StageResult<Frame> {
        stage.set_object_on_stage(scene, node)?;
        stage.center_object_on_pivot(scene, None)?;
        stage.orient(scene, &OrientationSelector::default(), "Mug")?;
        stage.prepare_camera_for_shot(scene)?;
        stage.take_snapshot(scene, Vec4::ZERO)
    }

    #[test]
    fn test_round_trip_restores_transform_exactly() {
        let Fixture {
            mut scene,
            mut stage,
            shelf,
            mug,
        } = setup();

        shoot(&mut stage, &mut scene, mug).unwrap();
        assert_eq!(scene.parent(mug), Some(stage.pivot()));

        stage.reset_stage(&mut scene);
        assert_eq!(scene.parent(mug), Some(shelf));
        assert_eq!(scene.local_transform(mug), Some(mug_transform()));
    }

    #[test]
    fn test_snapshot_frames_object_inside_padding() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        let frame = shoot(&mut stage, &mut scene, mug).unwrap();
        assert_eq!((frame.width, frame.height), (64, 64));
        assert_eq!(stage.state(), StageState::Rendered);

        let ratio = frame.transparent_ratio();
        assert!(ratio > 0.0 && ratio < 0.9, "transparent ratio {ratio}");

        // 8 px of padding per side; the outer 4 px must stay empty
        for y in 0..64 {
            for x in 0..64 {
                if x < 4 || x >= 60 || y < 4 || y >= 60 {
                    assert_eq!(frame.get(x, y).unwrap().w, 0.0, "pixel {x},{y} covered");
                }
            }
        }
    }

    #[test]
    fn test_second_object_is_rejected_without_side_effects() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();
        let other = scene.spawn_mesh("Other", None, Mesh::cuboid(Vec3::ONE, Vec4::ONE));
        scene.set_local_transform(other, LocalTransform::from_position(Vec3::new(-3.0, 0.0, 0.0)));

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        let result = stage.set_object_on_stage(&mut scene, other);

        assert_eq!(result, Err(StageError::AlreadyStaged(mug)));
        assert_eq!(stage.staged(), Some(mug));
        assert_eq!(scene.parent(other), None);
        assert_eq!(
            scene.local_transform(other).unwrap().position,
            Vec3::new(-3.0, 0.0, 0.0)
        );
    }

    #[test]
    fn test_restaging_same_object_is_noop() {
        let Fixture {
            mut scene,
            mut stage,
            shelf,
            mug,
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.reset_stage(&mut scene);

        // the remembered parent is still the original one
        assert_eq!(scene.parent(mug), Some(shelf));
        assert_eq!(scene.local_transform(mug), Some(mug_transform()));
    }

    #[test]
    fn test_operations_require_staged_object() {
        let Fixture {
            mut scene,
            mut stage,
            ..
        } = setup();
        let selector = OrientationSelector::default();

        assert_eq!(
            stage.center_object_on_pivot(&mut scene, None),
            Err(StageError::NothingStaged)
        );
        assert_eq!(
            stage.orient(&mut scene, &selector, "Mug"),
            Err(StageError::NothingStaged)
        );
        assert_eq!(
            stage.prepare_camera_for_shot(&mut scene),
            Err(StageError::NothingStaged)
        );
        assert_eq!(
            stage.scale_object_to_area(&mut scene, Vec2::splat(32.0), SCALE_MARGIN),
            Err(StageError::NothingStaged)
        );
        assert_eq!(
            stage.take_snapshot(&mut scene, Vec4::ZERO),
            Err(StageError::NothingStaged)
        );
        assert_eq!(stage.state(), StageState::Idle);
    }

    #[test]
    fn test_snapshot_requires_framing() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        assert_eq!(
            stage.take_snapshot(&mut scene, Vec4::ZERO),
            Err(StageError::NotFramed)
        );

        stage.center_object_on_pivot(&mut scene, None).unwrap();
        stage
            .orient(&mut scene, &OrientationSelector::default(), "Mug")
            .unwrap();
        assert_eq!(
            stage.take_snapshot(&mut scene, Vec4::ZERO),
            Err(StageError::NotFramed)
        );
        assert_eq!(scene.live_targets(), 0);
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let Fixture {
            mut scene,
            mut stage,
            ..
        } = setup();

        assert_eq!(
            stage.set_object_on_stage(&mut scene, NodeId(9999)),
            Err(StageError::UnknownNode(NodeId(9999)))
        );
        assert_eq!(stage.staged(), None);
    }

    #[test]
    fn test_snapshot_restores_scene_lighting() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        let sun = scene.create_node("Sun", None);
        scene.attach_light(sun, Light::directional(Vec3::ONE, 1.0));
        let lamp = scene.create_node("Lamp", None);
        let mut off = Light::directional(Vec3::ONE, 1.0);
        off.enabled = false;
        scene.attach_light(lamp, off);
        scene.set_ambient_light(Vec3::splat(0.3));

        shoot(&mut stage, &mut scene, mug).unwrap();

        assert!(scene.light(sun).unwrap().enabled);
        assert!(!scene.light(lamp).unwrap().enabled);
        assert_eq!(scene.ambient_light(), Vec3::splat(0.3));
        assert!(!scene.is_active(stage.light_rig()));
        for &light in stage.lights() {
            assert!(scene.light(light).unwrap().enabled);
        }
        assert_eq!(scene.live_targets(), 0);
    }

    #[test]
    fn test_reset_returns_stage_home() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        shoot(&mut stage, &mut scene, mug).unwrap();
        stage.reset_stage(&mut scene);

        assert_eq!(stage.state(), StageState::Idle);
        assert_eq!(stage.staged(), None);
        assert_eq!(
            scene.local_transform(stage.pivot()),
            Some(LocalTransform::from_position(STAGE_POSITION))
        );
        assert_eq!(
            scene.local_transform(stage.light_rig()),
            Some(LocalTransform::IDENTITY)
        );
        assert_eq!(stage.camera().position, STAGE_POSITION);
        assert_eq!(stage.camera().rotation, Quat::IDENTITY);
        assert_eq!(stage.resolution(), UVec2::new(64, 64));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let Fixture {
            mut scene,
            mut stage,
            ..
        } = setup();

        stage.reset_stage(&mut scene);
        stage.reset_stage(&mut scene);
        assert_eq!(stage.state(), StageState::Idle);
    }

    #[test]
    fn test_reset_tolerates_despawned_object() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        scene.despawn(mug);
        stage.reset_stage(&mut scene);

        assert_eq!(stage.state(), StageState::Idle);
        assert!(!scene.contains(mug));
    }

    #[test]
    fn test_session_resets_on_drop() {
        let Fixture {
            mut scene,
            mut stage,
            shelf,
            mug,
        } = setup();

        {
            let mut session = stage.session(&mut scene);
            session.set_object_on_stage(mug).unwrap();
            session.center_object_on_pivot(None).unwrap();
            assert_eq!(session.stage().state(), StageState::Staged);
            assert_eq!(session.host().parent(mug), Some(session.stage().pivot()));
        }

        assert_eq!(stage.state(), StageState::Idle);
        assert_eq!(scene.parent(mug), Some(shelf));
        assert_eq!(scene.local_transform(mug), Some(mug_transform()));
    }

    #[test]
    fn test_session_resets_after_error() {
        let Fixture {
            mut scene,
            mut stage,
            shelf,
            ..
        } = setup();
        let empty = scene.create_node("Empty", Some(shelf));

        let result = {
            let mut session = stage.session(&mut scene);
            session.set_object_on_stage(empty).unwrap();
            session.center_object_on_pivot(None)
        };

        assert_eq!(result, Err(StageError::NoRenderers));
        assert_eq!(stage.staged(), None);
        assert_eq!(scene.parent(empty), Some(shelf));
    }

    #[test]
    fn test_refit_is_stable() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.center_object_on_pivot(&mut scene, None).unwrap();
        stage
            .orient(&mut scene, &OrientationSelector::default(), "Mug")
            .unwrap();

        let first = stage.prepare_camera_for_shot(&mut scene).unwrap();
        let second = stage.prepare_camera_for_shot(&mut scene).unwrap();

        assert!((first.pivot_position - second.pivot_position).abs().max_element() < 1e-4);
        let (Projection::Perspective { fov: a }, Projection::Perspective { fov: b }) =
            (first.projection, second.projection)
        else {
            panic!("expected perspective framing, got {first:?} and {second:?}");
        };
        assert_abs_diff_eq!(a, b, epsilon = 1e-3);
        assert!(first.camera_rotation.abs_diff_eq(second.camera_rotation, 1e-5));
    }

    #[test]
    fn test_centering_puts_bounds_on_pivot() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.center_object_on_pivot(&mut scene, None).unwrap();

        let bounds = scene
            .bounds(stage.pivot(), stage.culling_mask(), None)
            .unwrap();
        let pivot = scene.world_position(stage.pivot());
        assert!((bounds.center - pivot).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_scale_object_to_area() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();
        stage.set_projection(Projection::Orthographic { size: 1.0 });

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.center_object_on_pivot(&mut scene, None).unwrap();
        stage
            .orient(&mut scene, &OrientationSelector::default(), "Mug")
            .unwrap();
        let scale = stage
            .scale_object_to_area(&mut scene, Vec2::splat(32.0), SCALE_MARGIN)
            .unwrap();

        // half the frame is one world unit, less the margin
        assert!(scale > 0.0 && scale < 0.8, "scale {scale}");
        assert_eq!(stage.state(), StageState::Framed);

        let pivot = scene.local_transform(stage.pivot()).unwrap();
        assert_eq!(pivot.scale, Vec3::splat(scale));
        let rig = scene.local_transform(stage.light_rig()).unwrap();
        assert_abs_diff_eq!(rig.scale.x * scale, 1.0, epsilon = 1e-5);

        let frame = stage.take_snapshot(&mut scene, Vec4::ZERO).unwrap();
        assert!(frame.transparent_ratio() < 1.0);
    }

    /// Rows of `frame` with at least one covered pixel
    fn covered_rows(frame: &Frame) -> Vec<u32> {
        (0..frame.height)
            .filter(|&y| (0..frame.width).any(|x| frame.get(x, y).unwrap().w > 0.0))
            .collect()
    }

    #[test]
    fn test_scale_object_to_area_fills_target_pixels() {
        let mut scene = MemoryScene::new();
        let mut stage = Stage::create(
            &mut scene,
            StageSettings {
                position: STAGE_POSITION,
                resolution: UVec2::new(64, 64),
                padding: Padding::Fraction(0.0),
                projection: Projection::Orthographic { size: 1.0 },
                ..StageSettings::default()
            },
        );
        let cube = scene.spawn_mesh("Cube", None, Mesh::cuboid(Vec3::ONE, Vec4::ONE));
        let mut overrides = HashMap::new();
        overrides.insert("Cube".to_string(), Vec3::ZERO);
        let selector = OrientationSelector::new(overrides, OrientationThresholds::default());

        stage.set_object_on_stage(&mut scene, cube).unwrap();
        stage
            .center_object_on_pivot(&mut scene, Some(Quat::IDENTITY))
            .unwrap();
        stage.orient(&mut scene, &selector, "Cube").unwrap();
        let scale = stage
            .scale_object_to_area(&mut scene, Vec2::splat(32.0), SCALE_MARGIN)
            .unwrap();
        // 32 px per unit: 32 px is one unit, less the margin
        assert_abs_diff_eq!(scale, 0.8, epsilon = 1e-5);

        let frame = stage.take_snapshot(&mut scene, Vec4::ZERO).unwrap();
        let rows = covered_rows(&frame);
        assert!(
            (24..=28).contains(&rows.len()),
            "covered rows {:?}..{:?}",
            rows.first(),
            rows.last()
        );
        // centered on the view axis
        let middle = (rows[0] + rows[rows.len() - 1]) as f32 / 2.0;
        assert!((middle - 31.5).abs() <= 1.5, "middle row {middle}");
    }

    #[test]
    fn test_scale_object_to_area_rejects_perspective() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage.center_object_on_pivot(&mut scene, None).unwrap();
        let pivot = scene.local_transform(stage.pivot());

        assert_eq!(
            stage.scale_object_to_area(&mut scene, Vec2::splat(32.0), SCALE_MARGIN),
            Err(StageError::NotOrthographic)
        );
        assert_eq!(stage.state(), StageState::Staged);
        assert_eq!(scene.local_transform(stage.pivot()), pivot);
    }

    #[test]
    fn test_stage_nodes_cannot_be_staged() {
        let Fixture {
            mut scene,
            mut stage,
            ..
        } = setup();

        let mut owned = vec![stage.pivot(), stage.light_rig()];
        owned.extend_from_slice(stage.lights());
        for node in owned {
            assert_eq!(
                stage.set_object_on_stage(&mut scene, node),
                Err(StageError::StageNode(node))
            );
        }
        assert_eq!(stage.state(), StageState::Idle);
        assert_eq!(stage.staged(), None);
        assert_eq!(scene.parent(stage.light_rig()), Some(stage.pivot()));
    }

    #[test]
    fn test_set_position_moves_idle_stage() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();
        let home = Vec3::new(0.0, -50.0, 20.0);

        stage.set_position(&mut scene, home);
        assert_eq!(
            scene.local_transform(stage.pivot()),
            Some(LocalTransform::from_position(home))
        );
        assert_eq!(stage.camera().position, home);

        shoot(&mut stage, &mut scene, mug).unwrap();
        stage.reset_stage(&mut scene);
        assert_eq!(stage.camera().position, home);
    }

    #[test]
    fn test_rotation_override_on_centering() {
        let Fixture {
            mut scene,
            mut stage,
            mug,
            ..
        } = setup();

        stage.set_object_on_stage(&mut scene, mug).unwrap();
        stage
            .center_object_on_pivot(&mut scene, Some(Quat::IDENTITY))
            .unwrap();

        let rotation = scene.world_rotation(mug);
        assert!(rotation.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }
}
