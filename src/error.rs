use crate::traits::NodeId;

/// Errors raised when a stage operation's preconditions are not met.
///
/// Every variant aborts the pipeline for the current object only; the stage is
/// expected to be reset afterwards so the next object starts clean.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum StageError {
    /// A framing step ran with nothing on the stage.
    #[error("no object on stage")]
    NothingStaged,
    /// Another object already occupies the stage.
    #[error("an object is already on stage: {0:?}")]
    AlreadyStaged(NodeId),
    /// The node passed in does not exist in the scene.
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    /// The node is part of the stage itself (pivot, light rig or a rig light).
    #[error("node {0:?} belongs to the stage")]
    StageNode(NodeId),
    /// Pixel-area scaling needs a camera whose visible height does not depend on distance.
    #[error("scaling to a pixel area requires an orthographic camera")]
    NotOrthographic,
    /// Geometry sampling returned no vertices.
    #[error("this object has no renderers")]
    NoRenderers,
    /// Geometry sampling returned a zero-size box.
    #[error("this object has no bounds")]
    NoBounds,
    /// A snapshot was requested before the camera was fitted.
    #[error("camera has not been prepared for a shot")]
    NotFramed,
    /// A vertex lies on or behind the camera plane during angular fitting.
    #[error("geometry touches the camera plane")]
    GeometryBehindCamera,
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failures reported by a [`RenderBackend`](crate::traits::RenderBackend).
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("render target {0} is not allocated")]
    UnknownTarget(u32),
    #[error("invalid render resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },
}

/// Errors from reading or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub type StageResult<T> = std::result::Result<T, StageError>;
