//! HTML to PDF conversion through an external renderer.

pub mod locate;
pub mod wkhtmltopdf;

use std::{fmt, path::PathBuf, sync::Arc, time::Duration};

use async_trait::async_trait;
use derive_more::Display;
use serde::Serialize;

#[cfg(test)]
use mockall::automock;

/// Where the renderer reads its HTML from.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderSource {
    /// Piped to the renderer's stdin.
    Html(String),
    /// A file on disk, for engines that need a filesystem path.
    File(PathBuf),
}

#[derive(Debug, Display, Clone, PartialEq)]
pub enum RenderError {
    #[display("wkhtmltopdf is not installed or could not be found")]
    NotInstalled,

    #[display("Failed to start wkhtmltopdf: {_0}")]
    Spawn(String),

    #[display("I/O error while talking to wkhtmltopdf: {_0}")]
    Io(String),

    #[display("wkhtmltopdf exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[display("wkhtmltopdf did not finish within {_0:?}")]
    Timeout(Duration),

    #[display("wkhtmltopdf produced only {_0} bytes; refusing to serve it as a PDF")]
    OutputTooSmall(usize),
}

impl std::error::Error for RenderError {}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PdfEngine: Send + Sync {
    /// Converts HTML to PDF bytes; one-shot, no retries.
    async fn convert(&self, source: &RenderSource) -> Result<Vec<u8>, RenderError>;

    /// Reports where the renderer was looked for and what version it claims.
    /// Never converts a document.
    async fn diagnose(&self) -> RendererDiagnostics;
}

#[async_trait]
impl<T: PdfEngine + ?Sized> PdfEngine for Arc<T> {
    async fn convert(&self, source: &RenderSource) -> Result<Vec<u8>, RenderError> {
        (**self).convert(source).await
    }

    async fn diagnose(&self) -> RendererDiagnostics {
        (**self).diagnose().await
    }
}

// ───── Diagnostics ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathCheck {
    pub path: String,
    pub exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VersionProbe {
    Reported(String),
    Failed(String),
    TimedOut(Duration),
    NotRun,
}

impl fmt::Display for VersionProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionProbe::Reported(version) => write!(f, "{}", version),
            VersionProbe::Failed(reason) => write!(f, "version check failed: {}", reason),
            VersionProbe::TimedOut(after) => write!(
                f,
                "version check timed out after {}",
                humantime::format_duration(*after)
            ),
            VersionProbe::NotRun => write!(f, "not run (no binary resolved)"),
        }
    }
}

impl VersionProbe {
    pub fn status(&self) -> &'static str {
        match self {
            VersionProbe::Reported(_) => "ok",
            VersionProbe::Failed(_) => "failed",
            VersionProbe::TimedOut(_) => "timeout",
            VersionProbe::NotRun => "not_run",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RendererDiagnostics {
    pub configured_path: Option<PathCheck>,
    pub well_known_paths: Vec<PathCheck>,
    pub search_path_hit: Option<String>,
    pub resolved: Option<String>,
    pub version: VersionProbe,
}

impl RendererDiagnostics {
    pub fn is_available(&self) -> bool {
        self.resolved.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct DiagnosticsView {
    pub available: bool,
    pub configured_path: Option<PathCheck>,
    pub well_known_paths: Vec<PathCheck>,
    pub search_path_hit: Option<String>,
    pub resolved: Option<String>,
    pub version_status: &'static str,
    pub version: String,
}

impl From<&RendererDiagnostics> for DiagnosticsView {
    fn from(diagnostics: &RendererDiagnostics) -> Self {
        DiagnosticsView {
            available: diagnostics.is_available(),
            configured_path: diagnostics.configured_path.clone(),
            well_known_paths: diagnostics.well_known_paths.clone(),
            search_path_hit: diagnostics.search_path_hit.clone(),
            resolved: diagnostics.resolved.clone(),
            version_status: diagnostics.version.status(),
            version: diagnostics.version.to_string(),
        }
    }
}
