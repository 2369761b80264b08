//! Declarative description of the media pipeline served at a mount.
//!
//! A [`PipelineDescriptor`] names the source file and the ordered chain of
//! processing stages behind it. It renders to the gst-launch syntax that
//! the media factory hands to the framework:
//!
//! ```text
//! ( filesrc location=/tmp/sample_videos/test.mp4 name=source
//!   ! decodebin ! videoconvert ! x264enc ! rtph264pay name=pay0 pt=96 )
//! ```
//!
//! The RTSP server looks up payloaders by name (`pay0`, `pay1`, ...), so
//! every chain must end in an RTP payloader called [`PAYLOADER_NAME`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{LoopError, PipelineErrorKind, Result};

/// Element name the RTSP server expects on the first payloader.
pub const PAYLOADER_NAME: &str = "pay0";

/// Element name given to the file source.
pub const SOURCE_NAME: &str = "source";

/// Dynamic RTP payload type used for H.264 (RFC 3551).
pub const DEFAULT_PAYLOAD_TYPE: u8 = 96;

/// One element in a stage chain: a factory name plus `key=value` properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    factory: String,
    properties: Vec<(String, String)>,
}

impl Stage {
    pub fn new(factory: &str) -> Self {
        Self {
            factory: factory.to_string(),
            properties: Vec::new(),
        }
    }

    /// Set a property, replacing an earlier value for the same key.
    pub fn property(mut self, key: &str, value: impl ToString) -> Self {
        let value = value.to_string();
        match self.properties.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key.to_string(), value)),
        }
        self
    }

    pub fn named(self, name: &str) -> Self {
        self.property("name", name)
    }

    pub fn factory(&self) -> &str {
        &self.factory
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this stage is an RTP payloader (`rtp*pay`).
    pub fn is_payloader(&self) -> bool {
        self.factory.starts_with("rtp") && self.factory.ends_with("pay")
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.factory)?;
        for (key, value) in &self.properties {
            write!(f, " {}={}", key, quote_value(value))?;
        }
        Ok(())
    }
}

/// Quote a property value for the launch syntax when it contains
/// whitespace or characters the parser treats specially.
fn quote_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '!' | '(' | ')' | '\\'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

/// Source file plus the stage chain that turns it into RTP.
///
/// Immutable after construction. The chain always terminates in an RTP
/// payloader named [`PAYLOADER_NAME`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineDescriptor {
    source_path: PathBuf,
    stages: Vec<Stage>,
}

impl PipelineDescriptor {
    /// Build a descriptor from a custom chain, checking the payloader invariant.
    pub fn new(source_path: impl Into<PathBuf>, stages: Vec<Stage>) -> Result<Self> {
        let source_path = source_path.into();
        if source_path.as_os_str().is_empty() {
            return Err(pipeline_error(PipelineErrorKind::EmptySourcePath));
        }
        let last = stages
            .last()
            .ok_or_else(|| pipeline_error(PipelineErrorKind::EmptyChain))?;
        if !last.is_payloader() {
            return Err(pipeline_error(PipelineErrorKind::MissingPayloader));
        }
        if last.get("name") != Some(PAYLOADER_NAME) {
            return Err(pipeline_error(PipelineErrorKind::UnnamedPayloader));
        }
        Ok(Self {
            source_path,
            stages,
        })
    }

    /// The default chain: demux/decode, color conversion, H.264 encode,
    /// RTP payload.
    pub fn file_loop(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            stages: vec![
                Stage::new("decodebin"),
                Stage::new("videoconvert"),
                Stage::new("x264enc"),
                Stage::new("rtph264pay")
                    .named(PAYLOADER_NAME)
                    .property("pt", DEFAULT_PAYLOAD_TYPE),
            ],
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The terminal payloader stage.
    pub fn payloader(&self) -> &Stage {
        // Non-empty by construction.
        &self.stages[self.stages.len() - 1]
    }

    /// Render the launch string handed to the media factory.
    pub fn launch(&self) -> String {
        let source = Stage::new("filesrc")
            .property("location", self.source_path.display())
            .named(SOURCE_NAME);

        let mut launch = format!("( {}", source);
        for stage in &self.stages {
            launch.push_str(" ! ");
            launch.push_str(&stage.to_string());
        }
        launch.push_str(" )");
        launch
    }
}

fn pipeline_error(kind: PipelineErrorKind) -> LoopError {
    LoopError::Pipeline { kind }
}
