// cli.rs - Command-line interface configuration
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::math::Axis;

#[derive(Parser, Debug, Clone)]
#[command(name = "runtime-icons")]
#[command(about = "Render inventory icons for 3D models", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, default_value = "false")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render an icon for each glTF model
    Render {
        /// Model files (.gltf or .glb)
        #[arg(required = true)]
        models: Vec<PathBuf>,

        /// Directory the icons are written to
        #[arg(long, short, default_value = "icons")]
        out: PathBuf,
    },
    /// Rotate an Euler triple about a world axis
    Rotate {
        /// Current angles as "x,y,z"
        #[arg(long, default_value = "0,0,0", allow_hyphen_values = true)]
        euler: String,

        #[arg(long, value_enum)]
        axis: AxisArg,

        /// Degrees, -360 to 360
        #[arg(long, allow_hyphen_values = true)]
        angle: f32,
    },
    /// Write the default configuration
    InitConfig {
        path: PathBuf,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisArg {
    X,
    Y,
    Z,
}

impl From<AxisArg> for Axis {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::X => Axis::Right,
            AxisArg::Y => Axis::Up,
            AxisArg::Z => Axis::Forward,
        }
    }
}
