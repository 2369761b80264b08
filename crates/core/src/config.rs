use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8554;
pub const DEFAULT_MOUNT_PATH: &str = "/test";
pub const DEFAULT_VIDEO_PATH: &str = "/tmp/sample_videos/test.mp4";

/// Server-level configuration.
///
/// The defaults are the fixed values the server has always used; the CLI
/// only overrides them when asked to.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the RTSP listener binds to.
    pub address: String,
    /// TCP port of the RTSP listener.
    pub port: u16,
    /// URL path the looping stream is mounted at.
    pub mount_path: String,
    /// Video file played on a loop.
    pub video_path: PathBuf,
    /// Host advertised in the startup banner.
    /// When `None`, the bind address is used (loopback for `0.0.0.0` and `::`).
    pub public_host: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            mount_path: DEFAULT_MOUNT_PATH.to_string(),
            video_path: PathBuf::from(DEFAULT_VIDEO_PATH),
            public_host: None,
        }
    }
}

impl ServerConfig {
    /// Port rendered as a service string, the form GStreamer expects.
    pub fn service(&self) -> String {
        self.port.to_string()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", url_host(&self.address), self.port)
    }

    /// Host clients should connect to, bracketed when it is an IPv6 literal.
    pub fn advertised_host(&self) -> String {
        let host = match &self.public_host {
            Some(host) => host.clone(),
            None => match self.address.parse::<IpAddr>() {
                Ok(IpAddr::V4(ip)) if ip.is_unspecified() => Ipv4Addr::LOCALHOST.to_string(),
                Ok(IpAddr::V6(ip)) if ip.is_unspecified() => Ipv6Addr::LOCALHOST.to_string(),
                _ => self.address.clone(),
            },
        };
        url_host(&host)
    }

    /// Full stream URL, e.g. `rtsp://127.0.0.1:8554/test`.
    pub fn stream_url(&self) -> String {
        format!(
            "rtsp://{}:{}{}",
            self.advertised_host(),
            self.port,
            self.mount_path
        )
    }

    /// Operator instructions logged once at startup.
    pub fn usage_banner(&self) -> String {
        format!(
            "\n***\n\
             -- INSTRUCTIONS --\n\
             1. Changing the video that is played:\n   \
                mount a video file at {}\n\
             2. Viewing the RTSP stream:\n   \
                ffplay {}\n\
             ***",
            self.video_path.display(),
            self.stream_url()
        )
    }
}

/// `host` as it appears in an authority: IPv6 literals get brackets.
fn url_host(host: &str) -> String {
    match host.parse::<Ipv6Addr>() {
        Ok(_) => format!("[{}]", host),
        Err(_) => host.to_string(),
    }
}
