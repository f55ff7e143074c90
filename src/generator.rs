//! Turns staged objects into icons: file overrides first, then a full stage pass,
//! then the transparency check that decides between the render and the fallback.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glam::{Quat, Vec3, Vec4};

use crate::config::{IconConfig, ListBehaviour};
use crate::error::{StageError, StageResult};
use crate::frame::Frame;
use crate::loaders;
use crate::math::euler_to_quat;
use crate::orientation::OrientationSelector;
use crate::stage::Stage;
use crate::traits::{NodeId, SceneHost};

/// Characters that cannot appear in a file name on any common platform
const INVALID_FILE_NAME_CHARS: &[char] = &['"', '<', '>', '|', ':', '*', '?', '\\', '/'];
/// File stem used when nothing of a name survives sanitizing
pub const UNNAMED_FILE_STEM: &str = "unnamed";

/// An object waiting for an icon
#[derive(Clone, Debug, PartialEq)]
pub struct ItemInfo {
    pub name: String,
    pub root: NodeId,
    /// Engine Euler angles the object rests at on the floor
    pub resting_rotation: Vec3,
    pub floor_y_offset: f32,
}

impl ItemInfo {
    pub fn new(name: impl Into<String>, root: NodeId) -> Self {
        Self {
            name: name.into(),
            root,
            resting_rotation: Vec3::ZERO,
            floor_y_offset: 0.0,
        }
    }

    /// Rotation the object is centered with before orientation
    pub fn initial_rotation(&self) -> Quat {
        euler_to_quat(Vec3::new(
            self.resting_rotation.x,
            self.floor_y_offset + 90.0,
            self.resting_rotation.z,
        ))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum IconOutcome {
    /// Straight-alpha render accepted as the icon
    Rendered(Frame),
    /// Image file supplied for this name
    Override(Frame),
    /// Render was too empty; the caller should show its placeholder
    Broken { ratio: f32 },
    Failed(StageError),
    /// Filtered out by the item list
    Skipped,
}

impl IconOutcome {
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            IconOutcome::Rendered(frame) | IconOutcome::Override(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn has_icon(&self) -> bool {
        self.frame().is_some()
    }
}

pub struct IconGenerator {
    stage: Stage,
    config: IconConfig,
    selector: OrientationSelector,
    file_overrides: HashMap<String, PathBuf>,
    items: HashSet<String>,
}

impl IconGenerator {
    pub fn new<H: SceneHost + ?Sized>(host: &mut H, config: IconConfig) -> Self {
        let stage = Stage::create(host, config.stage_settings());
        Self {
            stage,
            selector: config.selector(),
            file_overrides: config.file_override_table(),
            items: config.item_set(),
            config,
        }
    }

    pub fn config(&self) -> &IconConfig {
        &self.config
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn selector(&self) -> &OrientationSelector {
        &self.selector
    }

    /// Applies a new configuration to the existing stage
    pub fn reload<H: SceneHost + ?Sized>(&mut self, host: &mut H, config: IconConfig) {
        self.stage.set_position(host, config.stage_position);
        self.stage.set_resolution(config.resolution);
        self.stage.set_padding(config.padding);
        self.stage.set_projection(config.projection());
        self.stage.set_culling_mask(config.culling_mask);
        self.stage.set_fit_settings(config.fit);

        self.selector = config.selector();
        self.file_overrides = config.file_override_table();
        self.items = config.item_set();
        self.config = config;
        log::info!("icon generator configuration reloaded");
    }

    /// Whether the item list allows an icon for `name`
    pub fn should_render(&self, name: &str) -> bool {
        let listed = self.items.contains(name);
        match self.config.list_behaviour {
            ListBehaviour::None => true,
            ListBehaviour::BlackList => !listed,
            ListBehaviour::WhiteList => listed,
        }
    }

    /// Produces the icon for `item`. The stage is always reset before returning.
    pub fn compute_icon<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        item: &ItemInfo,
    ) -> IconOutcome {
        if !self.should_render(&item.name) {
            log::debug!("{} filtered by the item list", item.name);
            return IconOutcome::Skipped;
        }

        log::warn!("computing {} icon", item.name);

        if let Some(frame) = self.load_file_override(&item.name) {
            log::info!("{} now has a new icon from file", item.name);
            return IconOutcome::Override(frame);
        }

        let mut frame = match self.render_item(host, item) {
            Ok(frame) => frame,
            Err(err) => {
                log::error!("failed to render {}: {err}", item.name);
                return IconOutcome::Failed(err);
            }
        };
        frame.unpremultiply();

        if self.config.dump_to_cache {
            self.dump(&item.name, &frame);
        }

        let ratio = frame.transparent_ratio();
        if ratio <= self.config.transparency_ratio {
            log::info!("{} now has a new icon", item.name);
            IconOutcome::Rendered(frame)
        } else {
            log::error!("{} generated {:.1}% empty sprite", item.name, ratio * 100.0);
            IconOutcome::Broken { ratio }
        }
    }

    fn render_item<H: SceneHost + ?Sized>(
        &mut self,
        host: &mut H,
        item: &ItemInfo,
    ) -> StageResult<Frame> {
        let background = premultiply(self.config.background);

        let mut session = self.stage.session(host);
        session.set_object_on_stage(item.root)?;
        session.center_object_on_pivot(Some(item.initial_rotation()))?;
        session.orient(&self.selector, &item.name)?;
        session.prepare_camera_for_shot()?;
        session.take_snapshot(background)
    }

    /// Reads the override image for `name`; `None` means render it instead
    pub fn load_file_override(&self, name: &str) -> Option<Frame> {
        let path = self.file_overrides.get(name)?;
        log::warn!("assigning {:?} to {}", path, name);

        let frame = check_override(path);
        if frame.is_none() {
            log::warn!("fallback to staged image for {}", name);
        }
        frame
    }

    fn dump(&self, name: &str, frame: &Frame) {
        let path = self
            .config
            .cache_dir
            .join(format!("{}.png", sanitize_file_name(name)));
        match frame.save_png(&path) {
            Ok(()) => log::debug!("dumped {} to {:?}", name, path),
            Err(err) => log::error!("failed to dump {}: {err:#}", name),
        }
    }
}

fn check_override(path: &Path) -> Option<Frame> {
    if !path.exists() {
        log::error!("icon file {:?} does not exist", path);
        return None;
    }

    let frame = match loaders::load_png(path) {
        Ok(frame) => frame,
        Err(err) => {
            log::error!("failed to read {:?}: {err:#}", path);
            return None;
        }
    };

    if !frame.is_square() {
        log::error!("expected icon {:?} was not square", path);
        return None;
    }
    if frame.is_transparent() {
        log::error!("icon {:?} is fully transparent", path);
        return None;
    }
    Some(frame)
}

/// Replaces runs of characters invalid in file names with `_` and trims trailing dots.
///
/// Names with nothing usable left become [`UNNAMED_FILE_STEM`].
pub fn sanitize_file_name(name: &str) -> String {
    let parts: Vec<&str> = name
        .split(|c: char| c.is_control() || INVALID_FILE_NAME_CHARS.contains(&c))
        .filter(|part| !part.is_empty())
        .collect();
    let joined = parts.join("_");
    let stem = joined.trim_end_matches('.').trim();
    if stem.is_empty() {
        UNNAMED_FILE_STEM.to_string()
    } else {
        stem.to_string()
    }
}

/// Straight-alpha background as the snapshot expects it
pub fn premultiply(color: Vec4) -> Vec4 {
    (color.truncate() * color.w).extend(color.w)
}
