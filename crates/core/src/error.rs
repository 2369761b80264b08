//! Error types for the looping RTSP server.

use std::fmt;
use std::time::Duration;

use crate::lifecycle::PipelineState;

/// Errors that can occur while building or running the server.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Startup**: [`Init`](Self::Init), [`Attach`](Self::Attach); fatal,
///   the process exits.
/// - **Configuration**: [`Pipeline`](Self::Pipeline),
///   [`InvalidMountPath`](Self::InvalidMountPath).
/// - **Restart**: [`StateChange`](Self::StateChange), [`Seek`](Self::Seek);
///   raised while looping a pipeline back to its start.
/// - **Runtime**: [`LoopPanicked`](Self::LoopPanicked), [`Io`](Self::Io).
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// The media framework could not be initialized.
    #[error("media framework initialization failed: {0}")]
    Init(String),

    /// The server could not bind its port or attach to its event loop.
    #[error("failed to attach server on {addr}: {reason}")]
    Attach { addr: String, reason: String },

    /// A pipeline refused a state transition.
    #[error("pipeline state change to {state} failed")]
    StateChange { state: PipelineState },

    /// A pipeline rejected a seek request.
    #[error("seek to {position:?} failed")]
    Seek { position: Duration },

    /// A pipeline descriptor violates its stage-chain invariant.
    #[error("invalid pipeline: {kind}")]
    Pipeline { kind: PipelineErrorKind },

    /// A mount path is empty or does not start with `/`.
    #[error("invalid mount path: {0:?}")]
    InvalidMountPath(String),

    /// The background event-loop thread panicked.
    #[error("server loop thread panicked")]
    LoopPanicked,

    /// Underlying I/O error (thread spawn, sockets).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Specific kind of pipeline descriptor failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineErrorKind {
    /// The stage chain has no stages.
    EmptyChain,
    /// The last stage is not an RTP payloader.
    MissingPayloader,
    /// The terminal payloader is not named `pay0`.
    UnnamedPayloader,
    /// The source path is empty.
    EmptySourcePath,
}

impl fmt::Display for PipelineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyChain => write!(f, "empty stage chain"),
            Self::MissingPayloader => write!(f, "stage chain must end in an RTP payloader"),
            Self::UnnamedPayloader => write!(f, "terminal payloader must be named pay0"),
            Self::EmptySourcePath => write!(f, "empty source path"),
        }
    }
}

/// Convenience alias for `Result<T, LoopError>`.
pub type Result<T> = std::result::Result<T, LoopError>;
