//! Generator settings, stored as JSON.
//!
//! The override tables and the item list keep the compact one-line syntax users
//! already write by hand (`Name:x,y,z|Name:x,y,z`), and are parsed on demand.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glam::{UVec2, Vec2, Vec3, Vec4};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::camera::Projection;
use crate::error::ConfigError;
use crate::fit::{FitSettings, Padding};
use crate::lighting;
use crate::orientation::{OrientationSelector, OrientationThresholds};
use crate::stage::StageSettings;
use crate::traits::CullingMask;

pub const DEFAULT_ROTATION_OVERRIDES: &str = "Rubber Ducky:25,-135,0|Airhorn:-45,90,-80|Whoopie cushion:-75,0,0|Toy robot:-15,180,0|Sticky note:0,105,-90";
pub const DEFAULT_ITEM_LIST: &str = "Body,";

/// How the item list filters which objects get an icon
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListBehaviour {
    /// Every object is rendered
    None,
    /// Listed objects are skipped
    #[default]
    BlackList,
    /// Only listed objects are rendered
    WhiteList,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub resolution: UVec2,
    pub padding: Padding,
    pub orthographic: bool,
    pub culling_mask: CullingMask,
    /// Renders with more than this fraction of fully transparent pixels are rejected
    pub transparency_ratio: f32,
    /// Straight-alpha clear color
    pub background: Vec4,
    pub stage_position: Vec3,
    pub rotation_overrides: String,
    pub file_overrides: String,
    pub item_list: String,
    pub list_behaviour: ListBehaviour,
    pub dump_to_cache: bool,
    pub cache_dir: PathBuf,
    pub fit: FitSettings,
    pub thresholds: OrientationThresholds,
    pub verbose_mesh_logs: LevelFilter,
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            resolution: UVec2::new(256, 256),
            padding: Padding::Pixels(Vec2::new(32.0, 32.0)),
            orthographic: false,
            culling_mask: CullingMask::ALL,
            transparency_ratio: 0.95,
            background: Vec4::ZERO,
            stage_position: Vec3::new(0.0, 1000.0, 1000.0),
            rotation_overrides: DEFAULT_ROTATION_OVERRIDES.to_string(),
            file_overrides: String::new(),
            item_list: DEFAULT_ITEM_LIST.to_string(),
            list_behaviour: ListBehaviour::BlackList,
            dump_to_cache: false,
            cache_dir: PathBuf::from("cache"),
            fit: FitSettings::default(),
            thresholds: OrientationThresholds::default(),
            verbose_mesh_logs: LevelFilter::Off,
        }
    }
}

impl IconConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, text).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn projection(&self) -> Projection {
        if self.orthographic {
            Projection::orthographic()
        } else {
            Projection::perspective()
        }
    }

    pub fn rotation_override_table(&self) -> HashMap<String, Vec3> {
        parse_rotation_overrides(&self.rotation_overrides)
    }

    pub fn file_override_table(&self) -> HashMap<String, PathBuf> {
        parse_file_overrides(&self.file_overrides)
    }

    pub fn item_set(&self) -> HashSet<String> {
        parse_item_list(&self.item_list)
    }

    pub fn selector(&self) -> OrientationSelector {
        OrientationSelector::new(self.rotation_override_table(), self.thresholds.clone())
    }

    pub fn stage_settings(&self) -> StageSettings {
        StageSettings {
            position: self.stage_position,
            resolution: self.resolution,
            padding: self.padding,
            projection: self.projection(),
            culling_mask: self.culling_mask,
            fit: self.fit,
            lights: lighting::default_rig().to_vec(),
        }
    }
}

/// Parses `"x,y,z"`; anything malformed yields a zero rotation
pub fn parse_euler(text: &str) -> Vec3 {
    let parts: Vec<&str> = text.trim().split(',').collect();
    if parts.len() < 3 {
        return Vec3::ZERO;
    }

    let mut values = [0.0f32; 3];
    for (value, part) in values.iter_mut().zip(&parts) {
        match part.trim().parse::<f32>() {
            Ok(v) => *value = v,
            Err(_) => return Vec3::ZERO,
        }
    }
    Vec3::from_array(values)
}

/// Parses `"Name:x,y,z|Name:x,y,z"`; entries without a `:` are dropped
pub fn parse_rotation_overrides(text: &str) -> HashMap<String, Vec3> {
    text.split('|')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let mut parts = entry.split(':');
            let name = parts.next()?.trim();
            let euler = parts.next()?;
            Some((name.to_string(), parse_euler(euler)))
        })
        .collect()
}

/// Parses `"Name:path,Name:path"`
pub fn parse_file_overrides(text: &str) -> HashMap<String, PathBuf> {
    text.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let mut parts = entry.split(':');
            let name = parts.next()?.trim();
            let path = parts.next()?.trim();
            Some((name.to_string(), PathBuf::from(path)))
        })
        .collect()
}

/// Parses a comma separated list, ignoring blanks
pub fn parse_item_list(text: &str) -> HashSet<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
