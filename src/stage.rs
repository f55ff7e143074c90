//! The off-screen photo stage: a pivot the object is hung from, a camera fitted to it
//! and a light rig that only shines during the shot.

use glam::{Mat4, Quat, UVec2, Vec2, Vec3, Vec4};

use crate::camera::{Projection, StageCamera};
use crate::error::{RenderError, StageError, StageResult};
use crate::fit::{self, FitSettings, Framing, Padding};
use crate::frame::Frame;
use crate::lighting::{self, IsolatedLights, LightFixture, TemporaryTarget};
use crate::math::{quat_to_euler, Bounds};
use crate::orientation::{Orientation, OrientationSelector};
use crate::traits::{CullingMask, LocalTransform, NodeId, SceneGraph, SceneHost};

/// World-unit border kept free when scaling an object to a pixel area
pub const SCALE_MARGIN: f32 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StageState {
    Idle,
    Staged,
    Oriented,
    Framed,
    Rendered,
}

/// Where a staged object came from, so it can be put back exactly
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TransformMemory {
    pub parent: Option<NodeId>,
    pub local: LocalTransform,
}

impl TransformMemory {
    pub fn capture<H: SceneGraph + ?Sized>(host: &H, node: NodeId) -> StageResult<Self> {
        let local = host
            .local_transform(node)
            .ok_or(StageError::UnknownNode(node))?;
        Ok(Self {
            parent: host.parent(node),
            local,
        })
    }

    pub fn restore<H: SceneGraph + ?Sized>(&self, host: &mut H, node: NodeId) {
        host.set_parent(node, self.parent);
        host.set_local_transform(node, self.local);
    }
}

#[derive(Copy, Clone, Debug)]
struct StagedObject {
    node: NodeId,
    memory: TransformMemory,
}

/// Construction parameters of a [`Stage`]
#[derive(Clone, Debug)]
pub struct StageSettings {
    /// Camera position and pivot rest position
    pub position: Vec3,
    pub resolution: UVec2,
    pub padding: Padding,
    pub projection: Projection,
    pub culling_mask: CullingMask,
    pub fit: FitSettings,
    pub lights: Vec<LightFixture>,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            resolution: UVec2::new(256, 256),
            padding: Padding::default(),
            projection: Projection::perspective(),
            culling_mask: CullingMask::ALL,
            fit: FitSettings::default(),
            lights: lighting::default_rig().to_vec(),
        }
    }
}

pub struct Stage {
    position: Vec3,
    pivot: NodeId,
    light_rig: NodeId,
    lights: Vec<NodeId>,
    camera: StageCamera,
    resolution: UVec2,
    padding: Padding,
    fit: FitSettings,
    staged: Option<StagedObject>,
    state: StageState,
}

impl Stage {
    /// Builds the pivot and light rig inside `host`
    pub fn create<H: SceneHost + ?Sized>(host: &mut H, settings: StageSettings) -> Self {
        let pivot = host.create_node("Stage Pivot", None);
        host.set_local_transform(pivot, LocalTransform::from_position(settings.position));

        let light_rig = host.create_node("Stage Lights", Some(pivot));
        let lights = lighting::build_rig(host, light_rig, &settings.lights);
        host.set_active(light_rig, false);

        let mut camera = StageCamera::new(settings.position, settings.projection, 1.0);
        camera.culling_mask = settings.culling_mask;

        let mut stage = Self {
            position: settings.position,
            pivot,
            light_rig,
            lights,
            camera,
            resolution: settings.resolution,
            padding: settings.padding,
            fit: settings.fit,
            staged: None,
            state: StageState::Idle,
        };
        stage.set_resolution(settings.resolution);

        log::info!(
            "stage created at {} with {} lights",
            stage.position,
            stage.lights.len()
        );
        stage
    }

    pub fn pivot(&self) -> NodeId {
        self.pivot
    }

    pub fn light_rig(&self) -> NodeId {
        self.light_rig
    }

    pub fn lights(&self) -> &[NodeId] {
        &self.lights
    }

    pub fn camera(&self) -> &StageCamera {
        &self.camera
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn staged(&self) -> Option<NodeId> {
        self.staged.map(|s| s.node)
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    /// Changes the output size; the camera aspect follows
    pub fn set_resolution(&mut self, resolution: UVec2) {
        self.resolution = resolution;
        self.camera.aspect = if resolution.y == 0 {
            1.0
        } else {
            resolution.x as f32 / resolution.y as f32
        };
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn set_padding(&mut self, padding: Padding) {
        self.padding = padding;
    }

    /// Padding as a fraction of the current resolution
    pub fn padding_fraction(&self) -> f32 {
        self.padding.fraction(self.resolution)
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.camera.projection = projection;
    }

    pub fn culling_mask(&self) -> CullingMask {
        self.camera.culling_mask
    }

    pub fn set_culling_mask(&mut self, mask: CullingMask) {
        self.camera.culling_mask = mask;
    }

    pub fn set_fit_settings(&mut self, settings: FitSettings) {
        self.fit = settings;
    }

    /// Moves the stage home. With nothing staged the pivot and camera move at once,
    /// otherwise the new home takes effect on the next reset.
    pub fn set_position<H: SceneHost + ?Sized>(&mut self, host: &mut H, position: Vec3) {
        self.position = position;
        if self.staged.is_none() {
            self.reset_stage(host);
        }
    }

    fn staged_object(&self) -> StageResult<StagedObject> {
        self.staged.ok_or(StageError::NothingStaged)
    }

    /// Whether `node` is the pivot or hangs below it while nothing is staged
    fn owns<H: SceneGraph + ?Sized>(&self, host: &H, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.pivot {
                return true;
            }
            current = host.parent(id);
        }
        false
    }

    /// Hangs `node` from the pivot at local zero, remembering where it came from.
    ///
    /// Staging the node that is already on stage does nothing.
    pub fn set_object_on_stage<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        node: NodeId,
    ) -> StageResult<()> {
        if let Some(staged) = self.staged {
            if staged.node == node {
                return Ok(());
            }
            return Err(StageError::AlreadyStaged(staged.node));
        }
        if !host.contains(node) {
            return Err(StageError::UnknownNode(node));
        }
        if self.owns(&*host, node) {
            return Err(StageError::StageNode(node));
        }

        log::info!("setting stage for {}", host.name(node).unwrap_or("<unnamed>"));

        let memory = TransformMemory::capture(host, node)?;
        host.set_parent(self.pivot, None);
        host.set_local_transform(self.pivot, LocalTransform::IDENTITY);

        host.set_parent(node, Some(self.pivot));
        host.set_local_transform(
            node,
            LocalTransform {
                position: Vec3::ZERO,
                ..memory.local
            },
        );

        self.staged = Some(StagedObject { node, memory });
        self.state = StageState::Staged;
        Ok(())
    }

    /// Moves the staged object so its bounds center sits on the pivot.
    ///
    /// `rotation`, when given, replaces the object's world rotation first.
    pub fn center_object_on_pivot<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        rotation: Option<Quat>,
    ) -> StageResult<Bounds> {
        let staged = self.staged_object()?;
        if let Some(rotation) = rotation {
            host.set_world_rotation(staged.node, rotation);
        }

        let local = host
            .local_transform(staged.node)
            .ok_or(StageError::UnknownNode(staged.node))?;
        let matrix = Mat4::from_scale_rotation_translation(
            local.scale,
            host.world_rotation(staged.node),
            Vec3::ZERO,
        );
        let bounds = host.bounds(staged.node, self.culling_mask(), Some(matrix))?;

        host.set_local_transform(
            staged.node,
            LocalTransform {
                position: -bounds.center,
                ..local
            },
        );

        log::info!(
            "staged object offset {} rotation {}",
            -bounds.center,
            quat_to_euler(local.rotation)
        );
        Ok(bounds)
    }

    /// Resets the pivot rotation and applies the orientation chosen for `name`
    pub fn orient<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        selector: &OrientationSelector,
        name: &str,
    ) -> StageResult<Orientation> {
        self.staged_object()?;

        host.set_local_transform(self.pivot, LocalTransform::IDENTITY);
        let mask = self.culling_mask();
        let pivot = self.pivot;
        let orientation = {
            let shared: &H = &*host;
            selector.select(name, || shared.bounds(pivot, mask, Some(Mat4::IDENTITY)))?
        };

        host.set_world_rotation(self.pivot, orientation.rotation());
        log::info!(
            "stage rotation {}",
            quat_to_euler(host.world_rotation(self.pivot))
        );

        self.state = StageState::Oriented;
        Ok(orientation)
    }

    /// Fits the camera to the staged object and moves the pivot in front of it
    pub fn prepare_camera_for_shot<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> StageResult<Framing> {
        self.staged_object()?;

        self.camera.rotation = Quat::IDENTITY;
        host.set_world_position(self.pivot, Vec3::ZERO);

        let vertices = host.vertices(
            self.pivot,
            self.culling_mask(),
            Some(host.world_matrix(self.pivot)),
        );
        let framing = fit::fit_camera(
            &self.camera,
            &vertices,
            self.padding_fraction(),
            &self.fit,
        )?;

        host.set_world_position(self.pivot, framing.pivot_position);
        self.camera.rotation = framing.camera_rotation;
        self.camera.projection = framing.projection;
        self.align_light_rig(host);

        log::info!(
            "camera framed with {:?}, pivot at {}",
            framing.projection,
            framing.pivot_position
        );
        self.state = StageState::Framed;
        Ok(framing)
    }

    /// Scales the pivot so the object fills `target_pixels` of the output, then
    /// places it on the camera axis. Returns the applied scale.
    ///
    /// Only orthographic cameras are supported.
    pub fn scale_object_to_area<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        target_pixels: Vec2,
        margin: f32,
    ) -> StageResult<f32> {
        self.staged_object()?;
        let Projection::Orthographic { size } = self.camera.projection else {
            return Err(StageError::NotOrthographic);
        };

        let matrix = Mat4::from_quat(host.world_rotation(self.pivot));
        let bounds = host.bounds(self.pivot, self.culling_mask(), Some(matrix))?;
        let (scale, offset) = fit::fit_to_pixel_area(
            &bounds,
            size,
            self.resolution.y,
            target_pixels,
            margin,
            self.camera.near,
        )?;

        if let Some(mut pivot) = host.local_transform(self.pivot) {
            pivot.scale = Vec3::splat(scale);
            host.set_local_transform(self.pivot, pivot);
        }
        host.set_world_position(
            self.pivot,
            self.camera.position + self.camera.rotation * offset,
        );
        self.align_light_rig(host);

        log::info!("stage offset {offset} scale {scale}");
        self.state = StageState::Framed;
        Ok(scale)
    }

    /// Renders the framed stage with only the rig lights, over `background`.
    ///
    /// Returns linear premultiplied pixels at the stage resolution.
    pub fn take_snapshot<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        background: Vec4,
    ) -> StageResult<Frame> {
        self.staged_object()?;
        if !matches!(self.state, StageState::Framed | StageState::Rendered) {
            return Err(StageError::NotFramed);
        }

        let UVec2 { x: width, y: height } = self.resolution;
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidResolution { width, height }.into());
        }

        let mut camera = self.camera.clone();
        camera.background = background;

        let frame = {
            let mut lights = IsolatedLights::new(host, self.pivot, self.light_rig);
            let mut target = TemporaryTarget::acquire(&mut *lights, width, height)?;
            let id = target.id();
            target.render(&camera, id)?;
            target.read_pixels(id)?
        };

        log::info!("snapshot rendered at {width}x{height}");
        self.state = StageState::Rendered;
        Ok(frame)
    }

    /// Puts the staged object back and returns every stage part to its rest pose.
    ///
    /// Safe to call in any state.
    pub fn reset_stage<H: SceneHost + ?Sized>(&mut self, host: &mut H) {
        if let Some(staged) = self.staged.take() {
            if host.contains(staged.node) {
                staged.memory.restore(host, staged.node);
            }
        }

        host.set_parent(self.pivot, None);
        host.set_local_transform(self.pivot, LocalTransform::from_position(self.position));
        host.set_local_transform(self.light_rig, LocalTransform::IDENTITY);
        host.set_active(self.light_rig, false);
        self.camera.position = self.position;
        self.camera.rotation = Quat::IDENTITY;

        self.state = StageState::Idle;
    }

    /// Borrows the stage for one object; the stage is reset when the session drops
    pub fn session<'a, H: SceneHost + ?Sized>(&'a mut self, host: &'a mut H) -> StageSession<'a, H> {
        StageSession { stage: self, host }
    }

    /// Keeps the lights at the pivot but unrotated, so they stay fixed to the camera
    fn align_light_rig<H: SceneHost + ?Sized>(&self, host: &mut H) {
        host.set_local_transform(self.light_rig, LocalTransform::IDENTITY);
        host.set_world_rotation(self.light_rig, Quat::IDENTITY);
        let pivot_scale = host
            .local_transform(self.pivot)
            .map_or(Vec3::ONE, |t| t.scale);
        if let Some(mut rig) = host.local_transform(self.light_rig) {
            rig.scale = pivot_scale.recip();
            host.set_local_transform(self.light_rig, rig);
        }
    }
}

/// One object's trip through the stage; dropping it calls [`Stage::reset_stage`]
pub struct StageSession<'a, H: SceneHost + ?Sized> {
    stage: &'a mut Stage,
    host: &'a mut H,
}

impl<H: SceneHost + ?Sized> StageSession<'_, H> {
    pub fn stage(&self) -> &Stage {
        self.stage
    }

    pub fn host(&self) -> &H {
        self.host
    }

    pub fn set_object_on_stage(&mut self, node: NodeId) -> StageResult<()> {
        self.stage.set_object_on_stage(self.host, node)
    }

    pub fn center_object_on_pivot(&mut self, rotation: Option<Quat>) -> StageResult<Bounds> {
        self.stage.center_object_on_pivot(self.host, rotation)
    }

    pub fn orient(&mut self, selector: &OrientationSelector, name: &str) -> StageResult<Orientation> {
        self.stage.orient(self.host, selector, name)
    }

    pub fn prepare_camera_for_shot(&mut self) -> StageResult<Framing> {
        self.stage.prepare_camera_for_shot(self.host)
    }

    pub fn scale_object_to_area(&mut self, target_pixels: Vec2, margin: f32) -> StageResult<f32> {
        self.stage.scale_object_to_area(self.host, target_pixels, margin)
    }

    pub fn take_snapshot(&mut self, background: Vec4) -> StageResult<Frame> {
        self.stage.take_snapshot(self.host, background)
    }
}

impl<H: SceneHost + ?Sized> Drop for StageSession<'_, H> {
    fn drop(&mut self) {
        self.stage.reset_stage(self.host);
    }
}
