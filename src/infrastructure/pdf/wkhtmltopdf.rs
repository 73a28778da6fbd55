use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command, time::timeout};

use super::{
    locate::{check_path, probe_version, resolve_binary, search_path, well_known_checks, BINARY_NAME},
    PdfEngine, RenderError, RenderSource, RendererDiagnostics,
};
use crate::settings::AppConfig;

/// Fixed conversion settings shared by every render strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub page_size: &'static str,
    pub margin: &'static str,
    pub encoding: &'static str,
    pub javascript_delay_ms: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            page_size: "A4",
            margin: "0.75in",
            encoding: "UTF-8",
            javascript_delay_ms: 1000,
        }
    }
}

impl RenderOptions {
    pub fn args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["--quiet".into(), "--page-size".into(), self.page_size.into()];

        for side in ["--margin-top", "--margin-right", "--margin-bottom", "--margin-left"] {
            args.push(side.into());
            args.push(self.margin.into());
        }

        args.extend(
            [
                "--encoding",
                self.encoding,
                "--enable-local-file-access",
                "--enable-javascript",
                "--javascript-delay",
            ]
            .map(String::from),
        );
        args.push(self.javascript_delay_ms.to_string());
        args.extend(
            [
                "--no-outline",
                "--disable-smart-shrinking",
                "--load-error-handling",
                "ignore",
                "--load-media-error-handling",
                "ignore",
            ]
            .map(String::from),
        );

        args
    }
}

pub struct WkhtmltopdfEngine {
    configured: Option<PathBuf>,
    binary: Option<PathBuf>,
    options: RenderOptions,
    timeout: Duration,
    version_timeout: Duration,
}

impl WkhtmltopdfEngine {
    pub fn new(
        configured: Option<PathBuf>,
        options: RenderOptions,
        timeout: Duration,
        version_timeout: Duration,
    ) -> Self {
        let binary = resolve_binary(configured.as_deref());
        match &binary {
            Some(path) => tracing::info!("Using PDF renderer at {}", path.display()),
            None => tracing::warn!("{} not found; PDF downloads will fail until it is installed", BINARY_NAME),
        }

        WkhtmltopdfEngine {
            configured,
            binary,
            options,
            timeout,
            version_timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let options = RenderOptions {
            javascript_delay_ms: config.javascript_delay_ms,
            ..RenderOptions::default()
        };

        Self::new(
            config.renderer_override(),
            options,
            config.renderer_timeout(),
            config.renderer_version_timeout(),
        )
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// Full argument list: options, then input (`-` for stdin), then `-` for stdout.
    pub fn command_args(&self, source: &RenderSource) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.options.args().into_iter().map(OsString::from).collect();
        match source {
            RenderSource::Html(_) => args.push("-".into()),
            RenderSource::File(path) => args.push(path.as_os_str().to_owned()),
        }
        args.push("-".into());
        args
    }

    async fn run(&self, binary: &Path, source: &RenderSource) -> Result<Vec<u8>, RenderError> {
        let stdin = match source {
            RenderSource::Html(_) => Stdio::piped(),
            RenderSource::File(_) => Stdio::null(),
        };

        let mut child = Command::new(binary)
            .args(self.command_args(source))
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => RenderError::NotInstalled,
                _ => RenderError::Spawn(e.to_string()),
            })?;

        let pipe = child.stdin.take();
        let html = match source {
            RenderSource::Html(html) => Some(html.as_bytes()),
            RenderSource::File(_) => None,
        };

        // Feed stdin while collecting output so a large document cannot fill both pipes.
        let feed = async move {
            if let (Some(mut pipe), Some(bytes)) = (pipe, html) {
                pipe.write_all(bytes).await?;
                pipe.shutdown().await?;
            }
            Ok::<(), std::io::Error>(())
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| RenderError::Io(e.to_string()))?;

        if !output.status.success() {
            return Err(RenderError::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed.map_err(|e| RenderError::Io(e.to_string()))?;

        Ok(output.stdout)
    }
}

#[async_trait]
impl PdfEngine for WkhtmltopdfEngine {
    async fn convert(&self, source: &RenderSource) -> Result<Vec<u8>, RenderError> {
        let binary = self.binary.as_deref().ok_or(RenderError::NotInstalled)?;
        let started = Instant::now();

        let bytes = timeout(self.timeout, self.run(binary, source))
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        tracing::debug!(
            bytes = bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "wkhtmltopdf conversion finished"
        );

        Ok(bytes)
    }

    async fn diagnose(&self) -> RendererDiagnostics {
        RendererDiagnostics {
            configured_path: self.configured.as_deref().map(check_path),
            well_known_paths: well_known_checks(),
            search_path_hit: search_path(BINARY_NAME).map(|p| p.display().to_string()),
            resolved: self.binary.as_ref().map(|p| p.display().to_string()),
            version: probe_version(self.binary.as_deref(), self.version_timeout).await,
        }
    }
}
