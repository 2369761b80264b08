//! Capability traits for the media framework's RTSP server.
//!
//! The server is composed, not subclassed: a backend implements
//! [`MediaServer`] and [`MediaFactory`] by holding the framework objects,
//! and [`configure_server`] wires the looping stream into it.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::lifecycle::PipelineLifecycleObserver;
use crate::pipeline::PipelineDescriptor;

/// Binds a [`PipelineDescriptor`] to the framework's media factory.
pub trait MediaFactory: Sized {
    /// Create a shared factory that builds pipelines from `descriptor`.
    ///
    /// Shared means every client session reuses one running pipeline.
    fn configure(descriptor: &PipelineDescriptor) -> Result<Self>;

    /// Register `observer` for every pipeline this factory instantiates.
    ///
    /// The observer is invoked later on a framework thread.
    fn on_media_configure(&self, observer: Arc<dyn PipelineLifecycleObserver>);
}

/// URL-path → factory mapping exposed by the RTSP server.
pub trait MediaServer {
    type Factory: MediaFactory;

    /// Register `factory` at `path`. The last registration for a path wins.
    fn add_mount(&mut self, path: &str, factory: Self::Factory) -> Result<()>;

    /// Registered mount paths, sorted.
    fn mount_paths(&self) -> Vec<String>;
}

/// Register the single looping stream described by `config` on `server`.
///
/// Builds the file-loop descriptor for `config.video_path`, creates a shared
/// factory for it, hooks `observer` into every pipeline the factory creates,
/// and mounts the factory at `config.mount_path`.
pub fn configure_server<S: MediaServer>(
    mut server: S,
    config: &ServerConfig,
    observer: Arc<dyn PipelineLifecycleObserver>,
) -> Result<S> {
    let descriptor = PipelineDescriptor::file_loop(&config.video_path);
    tracing::debug!(launch = %descriptor.launch(), "pipeline descriptor");

    let factory = <S::Factory as MediaFactory>::configure(&descriptor)?;
    factory.on_media_configure(observer);
    server.add_mount(&config.mount_path, factory)?;

    tracing::info!(
        mount = %config.mount_path,
        video = %config.video_path.display(),
        "looping stream configured"
    );
    Ok(server)
}
