use std::sync::Arc;

use gst::glib;

use rtsp_loop::{LoopError, QuitHandle, Result, ShutdownSignal};

#[cfg(unix)]
const SIGINT: i32 = 2;
#[cfg(unix)]
const SIGTERM: i32 = 15;

/// Foreground `glib::MainLoop` on the default context that returns on
/// SIGINT or SIGTERM.
pub struct InterruptSignal {
    main_loop: glib::MainLoop,
}

impl InterruptSignal {
    pub fn new() -> Self {
        Self {
            main_loop: glib::MainLoop::new(None, false),
        }
    }

    /// Stop the wait from another thread, as a signal would.
    pub fn quit_handle(&self) -> QuitHandle {
        let main_loop = self.main_loop.clone();
        Arc::new(move || {
            let main_loop = main_loop.clone();
            glib::MainContext::default().invoke(move || main_loop.quit());
        })
    }

    #[cfg(unix)]
    fn install_handlers(&self) -> Vec<glib::SourceId> {
        [(SIGINT, "SIGINT"), (SIGTERM, "SIGTERM")]
            .into_iter()
            .map(|(signum, name)| {
                let main_loop = self.main_loop.clone();
                glib::unix_signal_add_local(signum, move || {
                    tracing::info!(signal = name, "interrupt received");
                    main_loop.quit();
                    glib::ControlFlow::Continue
                })
            })
            .collect()
    }

    #[cfg(not(unix))]
    fn install_handlers(&self) -> Vec<glib::SourceId> {
        Vec::new()
    }
}

impl Default for InterruptSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal for InterruptSignal {
    fn wait(&mut self) -> Result<()> {
        let context = glib::MainContext::default();
        let _guard = context
            .acquire()
            .map_err(|e| LoopError::Init(format!("default main context unavailable: {}", e)))?;

        let handlers = self.install_handlers();
        tracing::info!("waiting for interrupt");
        self.main_loop.run();

        for id in handlers {
            if let Some(source) = context.find_source_by_id(&id) {
                source.destroy();
            }
        }
        Ok(())
    }
}
