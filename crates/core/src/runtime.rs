//! Two-thread process model.
//!
//! ```text
//! main thread                       rtsp-server-loop thread
//! -----------                       -----------------------
//! BackgroundServer::spawn  ───────► ServerLoop::attach
//!        ◄──── attach result ─────  ServerLoop::run (blocks)
//! ShutdownSignal::wait (blocks)
//! quit handle  ───────────────────► run returns
//! join  ◄─────────────────────────  thread exits
//! ```
//!
//! The server is fully built before it moves to the background thread, so
//! nothing is shared across the two threads except the attach-result channel
//! and the quit handle.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::error::{LoopError, Result};

/// Name of the thread running the server's event loop.
pub const LOOP_THREAD_NAME: &str = "rtsp-server-loop";

/// Thread-safe request for an event loop to stop.
pub type QuitHandle = Arc<dyn Fn() + Send + Sync>;

/// The server's own event loop, driven from a dedicated thread.
pub trait ServerLoop: Send + 'static {
    /// Bind the listener and attach the server to this loop.
    /// Runs on the background thread, before [`run`](Self::run).
    fn attach(&mut self) -> Result<()>;

    /// Dispatch events until the quit handle fires.
    fn run(&mut self);

    /// Handle that stops [`run`](Self::run). Must take effect even when
    /// fired before `run` has started.
    fn quit_handle(&self) -> QuitHandle;
}

/// Foreground wait for a process-level shutdown request (e.g. SIGINT).
pub trait ShutdownSignal {
    /// Block until shutdown is requested. An error means the foreground
    /// loop itself failed; callers still proceed to shut down.
    fn wait(&mut self) -> Result<()>;
}

/// A [`ServerLoop`] running on its own thread.
pub struct BackgroundServer {
    thread: Option<JoinHandle<()>>,
    quit: QuitHandle,
}

impl BackgroundServer {
    /// Move `server_loop` to a new thread, attach it and start running it.
    ///
    /// Returns once the attach outcome is known. An attach failure (e.g. the
    /// port is already bound) is returned to the caller; nothing is retried.
    pub fn spawn<L: ServerLoop>(mut server_loop: L) -> Result<Self> {
        let quit = server_loop.quit_handle();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<()>>(1);

        let thread = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || match server_loop.attach() {
                Ok(()) => {
                    let _ = ready_tx.send(Ok(()));
                    server_loop.run();
                    tracing::debug!("server loop exited");
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                tracing::debug!(thread = LOOP_THREAD_NAME, "server loop started");
                Ok(Self {
                    thread: Some(thread),
                    quit,
                })
            }
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(LoopError::LoopPanicked)
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the loop to quit, then join its thread.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        (self.quit)();
        thread.join().map_err(|_| LoopError::LoopPanicked)
    }
}

impl Drop for BackgroundServer {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!(error = %e, "server loop did not stop cleanly");
        }
    }
}

/// Run the server until a shutdown is requested.
///
/// Starts `server_loop` in the background, blocks on `signal`, then stops
/// and joins the background loop. Attach failures are fatal and returned
/// without ever entering the foreground wait.
pub fn run_service<L, S>(server_loop: L, mut signal: S) -> Result<()>
where
    L: ServerLoop,
    S: ShutdownSignal,
{
    let background = BackgroundServer::spawn(server_loop)?;

    match signal.wait() {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(error) => tracing::error!(%error, "foreground loop failed, shutting down"),
    }

    background.shutdown()?;
    tracing::info!("server stopped");
    Ok(())
}
