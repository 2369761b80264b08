//! Core of an RTSP server that plays one video file on an endless loop.
//!
//! The media work (RTSP negotiation, decoding, encoding, RTP) belongs to the
//! media framework. This crate holds everything around it:
//!
//! - [`pipeline`]: the declarative stage chain served at the mount.
//! - [`mount`]: URL path → factory bookkeeping.
//! - [`lifecycle`]: the end-of-stream restart policy ([`LoopPlayback`]).
//! - [`server`]: capability traits a framework backend implements.
//! - [`runtime`]: background server loop + foreground shutdown wait.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mount;
pub mod pipeline;
pub mod runtime;
pub mod server;

pub use config::ServerConfig;
pub use error::{LoopError, PipelineErrorKind, Result};
pub use lifecycle::{
    LoopPlayback, PipelineControl, PipelineLifecycleObserver, PipelineState, SeekFlags,
};
pub use mount::MountTable;
pub use pipeline::{PipelineDescriptor, Stage};
pub use runtime::{BackgroundServer, QuitHandle, ServerLoop, ShutdownSignal, run_service};
pub use server::{MediaFactory, MediaServer, configure_server};
