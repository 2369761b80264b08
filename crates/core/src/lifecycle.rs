//! Pipeline lifecycle: the end-of-stream restart policy.
//!
//! The framework owns every pipeline instance. This module only sees them
//! through [`PipelineControl`] and reacts to end-of-stream through a
//! [`PipelineLifecycleObserver`].
//!
//! ## Loop playback
//!
//! ```text
//! PLAYING --(end-of-stream)--> NULL -> READY -> seek(0, FLUSH|KEY_UNIT) -> PLAYING
//! ```
//!
//! The explicit reset is used instead of segment seeks because the decode
//! chain in front of the payloader does not support segment-looped playback.

use std::fmt;
use std::ops::BitOr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::Result;

/// Element states, mirroring the framework's own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Null,
    Ready,
    Playing,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Ready => write!(f, "READY"),
            Self::Playing => write!(f, "PLAYING"),
        }
    }
}

/// Flags attached to a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeekFlags(u8);

impl SeekFlags {
    pub const NONE: Self = Self(0);
    /// Discard data queued in the pipeline before seeking.
    pub const FLUSH: Self = Self(1);
    /// Snap to the nearest keyframe.
    pub const KEY_UNIT: Self = Self(1 << 1);

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for SeekFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Commands this crate may issue to a framework-owned pipeline.
pub trait PipelineControl {
    fn set_state(&self, state: PipelineState) -> Result<()>;

    /// Reposition playback to `position` from the start of the media.
    fn seek(&self, position: Duration, flags: SeekFlags) -> Result<()>;
}

/// Receives lifecycle events for pipelines created by a media factory.
///
/// Called on a framework thread, never the thread that registered it.
/// Implementations must not block.
pub trait PipelineLifecycleObserver: Send + Sync {
    fn on_end_of_stream(&self, pipeline: &dyn PipelineControl) -> Result<()>;
}

/// Restarts a pipeline from the beginning every time it runs out of data.
#[derive(Debug)]
pub struct LoopPlayback {
    restarts: AtomicU64,
    span: tracing::Span,
}

impl LoopPlayback {
    /// `span` carries the context (mount, source) restart events are logged in.
    pub fn new(span: tracing::Span) -> Self {
        Self {
            restarts: AtomicU64::new(0),
            span,
        }
    }

    /// Number of end-of-stream restarts handled so far.
    pub fn restarts(&self) -> u64 {
        self.restarts.load(Ordering::Relaxed)
    }
}

impl PipelineLifecycleObserver for LoopPlayback {
    fn on_end_of_stream(&self, pipeline: &dyn PipelineControl) -> Result<()> {
        let _entered = self.span.enter();
        let restart = self.restarts.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(restart, "end of stream, restarting playback");

        pipeline.set_state(PipelineState::Null)?;
        pipeline.set_state(PipelineState::Ready)?;

        // READY already rewinds the source, so a rejected seek is not fatal.
        if let Err(error) = pipeline.seek(Duration::ZERO, SeekFlags::FLUSH | SeekFlags::KEY_UNIT) {
            tracing::warn!(restart, %error, "seek to start rejected");
        }

        pipeline.set_state(PipelineState::Playing)?;
        tracing::debug!(restart, "playback restarted");
        Ok(())
    }
}
