use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use gstrtsploop::{GstServer, InterruptSignal};
use rtsp_loop::config::{DEFAULT_ADDRESS, DEFAULT_MOUNT_PATH, DEFAULT_PORT, DEFAULT_VIDEO_PATH};
use rtsp_loop::{LoopPlayback, ServerConfig, configure_server, run_service};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rtsp-loop-server",
    about = "RTSP server that plays a video file on an endless loop"
)]
struct Args {
    /// Bind address
    #[arg(long, default_value = DEFAULT_ADDRESS)]
    address: String,

    /// RTSP port
    #[arg(long, short, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Mount path of the stream
    #[arg(long, short, default_value = DEFAULT_MOUNT_PATH)]
    mount: String,

    /// Video file to loop
    #[arg(long, short, default_value = DEFAULT_VIDEO_PATH)]
    video: PathBuf,

    /// Host advertised in the stream URL
    #[arg(long)]
    public_host: Option<String>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        ServerConfig {
            address: args.address,
            port: args.port,
            mount_path: args.mount,
            video_path: args.video,
            public_host: args.public_host,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = ServerConfig::from(Args::parse());

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with an error");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ServerConfig) -> rtsp_loop::Result<()> {
    gstrtsploop::init()?;

    let span = tracing::info_span!("loop", mount = %config.mount_path);
    let observer = Arc::new(LoopPlayback::new(span));
    let server = configure_server(GstServer::new(config)?, config, observer)?;

    tracing::info!("{}", config.usage_banner());

    run_service(server.into_loop(), InterruptSignal::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_keep_fixed_values() {
        let config = ServerConfig::from(Args::parse_from(["rtsp-loop-server"]));
        let fixed = ServerConfig::default();

        assert_eq!(config.address, fixed.address);
        assert_eq!(config.port, 8554);
        assert_eq!(config.mount_path, "/test");
        assert_eq!(config.video_path, fixed.video_path);
        assert!(config.public_host.is_none());
    }

    #[test]
    fn flags_override_defaults() {
        let config = ServerConfig::from(Args::parse_from([
            "rtsp-loop-server",
            "--port",
            "9554",
            "--mount",
            "/cam",
            "--video",
            "/srv/clip.mp4",
        ]));

        assert_eq!(config.port, 9554);
        assert_eq!(config.mount_path, "/cam");
        assert_eq!(config.stream_url(), "rtsp://127.0.0.1:9554/cam");
    }
}
