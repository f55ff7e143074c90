pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod fit;
pub mod frame;
pub mod generator;
pub mod lighting;
pub mod loaders;
pub mod math;
pub mod orientation;
pub mod renderer;
pub mod scene;
pub mod scheduler;
pub mod stage;
pub mod traits;

pub use camera::{Projection, StageCamera};
pub use config::IconConfig;
pub use error::{ConfigError, RenderError, StageError, StageResult};
pub use frame::Frame;
pub use generator::{IconGenerator, IconOutcome, ItemInfo};
pub use math::Bounds;
pub use orientation::{Orientation, OrientationSelector};
pub use scene::MemoryScene;
pub use stage::{Stage, StageSession, StageSettings, StageState};
