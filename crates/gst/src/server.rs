use std::sync::Arc;

use gst::glib;
use gst_rtsp_server::prelude::*;

use rtsp_loop::mount::normalize_mount_path;
use rtsp_loop::{
    LoopError, MediaServer, MountTable, QuitHandle, Result, ServerConfig, ServerLoop,
};

use crate::factory::LoopFactory;

/// `RTSPServer` plus the mounts registered on it.
///
/// Built on the main thread, then turned into a [`GstServerLoop`] and
/// handed to the background thread.
pub struct GstServer {
    server: gst_rtsp_server::RTSPServer,
    mount_points: gst_rtsp_server::RTSPMountPoints,
    mounts: MountTable<LoopFactory>,
    bind_addr: String,
}

impl GstServer {
    /// Create a server for `config.address:config.port`. Nothing is bound
    /// until the loop attaches.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let server = gst_rtsp_server::RTSPServer::new();
        server.set_address(&config.address);
        server.set_service(&config.service());

        let mount_points = server
            .mount_points()
            .ok_or_else(|| LoopError::Init("RTSP server has no mount points".to_string()))?;

        Ok(Self {
            server,
            mount_points,
            mounts: MountTable::new(),
            bind_addr: config.bind_addr(),
        })
    }

    pub fn factory(&self, path: &str) -> Option<&LoopFactory> {
        self.mounts.get(path)
    }

    /// Move the server onto its own `MainContext`, ready for the background thread.
    pub fn into_loop(self) -> GstServerLoop {
        let context = glib::MainContext::new();
        let main_loop = glib::MainLoop::new(Some(&context), false);
        GstServerLoop {
            server: self.server,
            context,
            main_loop,
            source: None,
            bind_addr: self.bind_addr,
            mount_paths: self.mounts.paths(),
        }
    }
}

impl MediaServer for GstServer {
    type Factory = LoopFactory;

    fn add_mount(&mut self, path: &str, factory: LoopFactory) -> Result<()> {
        let path = normalize_mount_path(path)?;
        // RTSPMountPoints replaces an existing factory at the same path too.
        self.mount_points.add_factory(&path, factory.inner().clone());
        self.mounts.insert(&path, factory)?;
        Ok(())
    }

    fn mount_paths(&self) -> Vec<String> {
        self.mounts.paths()
    }
}

/// The server's `glib::MainLoop`, run on the background thread.
pub struct GstServerLoop {
    server: gst_rtsp_server::RTSPServer,
    context: glib::MainContext,
    main_loop: glib::MainLoop,
    source: Option<glib::SourceId>,
    bind_addr: String,
    mount_paths: Vec<String>,
}

impl GstServerLoop {
    /// Port actually bound, once attached.
    pub fn bound_port(&self) -> Option<u16> {
        self.source.as_ref()?;
        u16::try_from(self.server.bound_port()).ok()
    }
}

impl ServerLoop for GstServerLoop {
    fn attach(&mut self) -> Result<()> {
        let source = self
            .server
            .attach(Some(&self.context))
            .map_err(|err| LoopError::Attach {
                addr: self.bind_addr.clone(),
                reason: err.to_string(),
            })?;
        self.source = Some(source);

        tracing::info!(
            addr = %self.bind_addr,
            port = self.server.bound_port(),
            mounts = ?self.mount_paths,
            "RTSP server listening"
        );
        Ok(())
    }

    fn run(&mut self) {
        let main_loop = &self.main_loop;
        if let Err(err) = self.context.with_thread_default(|| main_loop.run()) {
            tracing::error!(error = %err, "server context is owned by another thread");
        }

        if let Some(id) = self.source.take()
            && let Some(source) = self.context.find_source_by_id(&id)
        {
            source.destroy();
        }
    }

    fn quit_handle(&self) -> QuitHandle {
        let context = self.context.clone();
        let main_loop = self.main_loop.clone();
        // Queued on the loop's own context, so a quit issued before `run`
        // is dispatched as soon as the loop starts.
        Arc::new(move || {
            let main_loop = main_loop.clone();
            context.invoke(move || main_loop.quit());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtsp_loop::{LoopPlayback, MediaFactory, PipelineDescriptor, configure_server};

    #[test]
    fn configured_server_mounts_test_path() {
        crate::init().unwrap();
        let config = ServerConfig::default();
        let observer = Arc::new(LoopPlayback::new(tracing::Span::none()));

        let server =
            configure_server(GstServer::new(&config).unwrap(), &config, observer).unwrap();

        assert_eq!(server.mount_paths(), vec!["/test"]);
        let factory = server.factory("/test").unwrap();
        assert!(factory.inner().is_shared());
    }

    #[test]
    fn remounting_a_path_replaces_factory() {
        crate::init().unwrap();
        let config = ServerConfig::default();
        let mut server = GstServer::new(&config).unwrap();

        let first = PipelineDescriptor::file_loop("/videos/first.mp4");
        let second = PipelineDescriptor::file_loop("/videos/second.mp4");
        server
            .add_mount("/test", LoopFactory::configure(&first).unwrap())
            .unwrap();
        server
            .add_mount("/test/", LoopFactory::configure(&second).unwrap())
            .unwrap();

        assert_eq!(server.mount_paths(), vec!["/test"]);
        assert_eq!(server.factory("/test").unwrap().launch(), second.launch());
    }

    #[test]
    fn attach_fails_when_port_is_taken() {
        crate::init().unwrap();
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let config = ServerConfig {
            address: "127.0.0.1".to_string(),
            port,
            ..ServerConfig::default()
        };

        let mut server_loop = GstServer::new(&config).unwrap().into_loop();
        let err = server_loop.attach().unwrap_err();

        assert!(matches!(err, LoopError::Attach { .. }));
        assert!(server_loop.bound_port().is_none());
    }
}
