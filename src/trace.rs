//! Spin trace files
//!
//! A trace is a recorded list of `(time, delta)` input frames, stored as CSV
//! (`time,delta` header) or as YAML/JSON documents:
//!
//! ```yaml
//! name: sample
//! frames:
//!   - { time: 16.0, delta: 12.5 }
//!   - { time: 32.0, delta: -3.0 }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::replay::{validate_frames, Frame, ReplayError, SpinReplay};

/// Errors raised while reading or writing traces
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to access trace file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid CSV trace: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid YAML trace: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON trace: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot infer trace format from '{0}' (expected .csv, .yaml, .yml or .json)")]
    UnknownFormat(String),

    #[error(transparent)]
    Invalid(#[from] ReplayError),
}

/// On-disk trace encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceFormat {
    Csv,
    Yaml,
    Json,
}

impl TraceFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, TraceError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TraceFormat::Csv),
            Some("yaml") | Some("yml") => Ok(TraceFormat::Yaml),
            Some("json") => Ok(TraceFormat::Json),
            _ => Err(TraceError::UnknownFormat(path.display().to_string())),
        }
    }
}

/// A recorded spin input trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpinTrace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub frames: Vec<Frame>,
}

impl SpinTrace {
    /// Load and validate a trace file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let format = TraceFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path)?;

        let mut trace = Self::parse(&contents, format)?;
        if trace.name.is_none() {
            trace.name = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }

        info!(
            "Loaded trace {} ({} frames)",
            path.display(),
            trace.frames.len()
        );
        Ok(trace)
    }

    /// Parse and validate trace contents
    pub fn parse(contents: &str, format: TraceFormat) -> Result<Self, TraceError> {
        let trace = match format {
            TraceFormat::Csv => Self::parse_csv(contents)?,
            TraceFormat::Yaml => serde_yaml::from_str(contents)?,
            TraceFormat::Json => serde_json::from_str(contents)?,
        };

        validate_frames(&trace.frames)?;
        debug!(format = ?format, frames = trace.frames.len(), "Parsed trace");
        Ok(trace)
    }

    fn parse_csv(contents: &str) -> Result<Self, TraceError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(contents.as_bytes());

        let frames = reader
            .deserialize::<Frame>()
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { name: None, frames })
    }

    /// Serialize the trace in the given format
    pub fn encode(&self, format: TraceFormat) -> Result<String, TraceError> {
        match format {
            TraceFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                for frame in &self.frames {
                    writer.serialize(frame)?;
                }
                let bytes = writer
                    .into_inner()
                    .map_err(|err| TraceError::Io(err.into_error()))?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            TraceFormat::Yaml => Ok(serde_yaml::to_string(self)?),
            TraceFormat::Json => Ok(serde_json::to_string_pretty(self)?),
        }
    }

    /// Write the trace, choosing the format from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TraceError> {
        let path = path.as_ref();
        let contents = self.encode(TraceFormat::from_path(path)?)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Build a replay positioned before the first frame
    pub fn into_replay(self) -> Result<SpinReplay, TraceError> {
        Ok(SpinReplay::new(self.frames)?)
    }
}
