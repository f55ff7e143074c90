use crate::camera::StageCamera;
use crate::error::RenderError;
use crate::frame::Frame;

/// Handle to an offscreen render target
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RenderTargetId(pub u32);

/// Offscreen rendering provided by the host engine
pub trait RenderBackend {
    /// Allocate a temporary target; every call must be paired with
    /// [`release_target`](Self::release_target)
    fn acquire_target(&mut self, width: u32, height: u32) -> Result<RenderTargetId, RenderError>;

    /// Render everything visible to `camera` into `target`, cleared to the camera background
    fn render(&mut self, camera: &StageCamera, target: RenderTargetId) -> Result<(), RenderError>;

    /// Linear, premultiplied RGBA contents of `target`
    fn read_pixels(&self, target: RenderTargetId) -> Result<Frame, RenderError>;

    fn release_target(&mut self, target: RenderTargetId);
}
