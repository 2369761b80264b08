//! GStreamer backend for the looping RTSP server.
//!
//! Implements the `rtsp_loop` capability traits on top of
//! `gstreamer-rtsp-server`:
//!
//! | Trait | Type | Wraps |
//! |-------|------|-------|
//! | `MediaFactory` | [`LoopFactory`] | `RTSPMediaFactory` (shared, launch string) |
//! | `MediaServer` | [`GstServer`] | `RTSPServer` + `RTSPMountPoints` |
//! | `ServerLoop` | [`GstServerLoop`] | `glib::MainLoop` on a private `MainContext` |
//! | `ShutdownSignal` | [`InterruptSignal`] | `glib::MainLoop` with SIGINT/SIGTERM sources |
//! | `PipelineControl` | [`GstPipeline`] | the media's top-level `gst::Element` |
//!
//! ## Equivalent gst-launch pipeline
//!
//! ```text
//! filesrc location=/tmp/sample_videos/test.mp4 name=source ! decodebin
//!     ! videoconvert ! x264enc ! rtph264pay name=pay0 pt=96
//! ```
//!
//! Element-level diagnostics go to the `rtsploop` debug category
//! (`GST_DEBUG=rtsploop:5`).

mod factory;
mod pipeline;
mod server;
mod signal;

use std::sync::LazyLock;

use rtsp_loop::{LoopError, Result};

pub use factory::LoopFactory;
pub use pipeline::GstPipeline;
pub use server::{GstServer, GstServerLoop};
pub use signal::InterruptSignal;

pub(crate) static CAT: LazyLock<gst::DebugCategory> = LazyLock::new(|| {
    gst::DebugCategory::new(
        "rtsploop",
        gst::DebugColorFlags::empty(),
        Some("Looping RTSP file server"),
    )
});

/// Initialize GStreamer. Safe to call more than once.
pub fn init() -> Result<()> {
    gst::init().map_err(|e| LoopError::Init(e.to_string()))?;
    tracing::debug!(version = %gst::version_string(), "GStreamer initialized");
    Ok(())
}
