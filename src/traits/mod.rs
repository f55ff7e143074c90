pub mod geometry;
pub mod lighting;
pub mod renderer;
pub mod scene;

pub use geometry::*;
pub use lighting::*;
pub use renderer::*;
pub use scene::*;

/// Everything the stage needs from the host engine
pub trait SceneHost: SceneGraph + GeometrySource + LightingHost + RenderBackend {}

impl<T> SceneHost for T where T: SceneGraph + GeometrySource + LightingHost + RenderBackend {}
