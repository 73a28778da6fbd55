use std::sync::Arc;

use serde::Serialize;
use tempfile::NamedTempFile;
use tera::{Context, Tera};

use crate::{
    entities::{education::Education, profile::Profile},
    errors::AppError,
    pdf::{PdfEngine, RenderError, RenderSource, RendererDiagnostics},
    repositories::profile::ProfileRepository,
    templates::PDF_TEMPLATE,
    use_cases::profile::load_profile,
    utils::filename::cv_filename,
};

/// Anything shorter cannot be a real document.
pub const MIN_PDF_BYTES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStrategy {
    /// HTML is piped to the renderer's stdin
    InMemory,
    /// HTML is written to a temporary `.html` file that is removed afterwards
    TempFile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PdfDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct DebugReport {
    pub profile: Profile,
    pub html_length: usize,
    pub diagnostics: RendererDiagnostics,
}

#[derive(Serialize)]
struct CvContext<'a> {
    profile: &'a Profile,
    educations: &'a [Education],
}

pub struct RenderHandler<R, E>
where
    R: ProfileRepository,
    E: PdfEngine,
{
    pub profile_repo: R,
    pub engine: E,
    pub templates: Arc<Tera>,
}

impl<R, E> RenderHandler<R, E>
where
    R: ProfileRepository,
    E: PdfEngine,
{
    pub fn new(profile_repo: R, engine: E, templates: Arc<Tera>) -> Self {
        RenderHandler {
            profile_repo,
            engine,
            templates,
        }
    }

    /// Renders the print template for a profile and its ordered educations.
    pub fn render_html(&self, profile: &Profile, educations: &[Education]) -> Result<String, AppError> {
        let context = Context::from_serialize(CvContext { profile, educations })?;
        Ok(self.templates.render(PDF_TEMPLATE, &context)?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn render(&self, id: i64, strategy: RenderStrategy) -> Result<PdfDocument, AppError> {
        let (profile, educations) = load_profile(&self.profile_repo, id).await?;
        let html = self.render_html(&profile, &educations)?;

        let bytes = match strategy {
            RenderStrategy::InMemory => self.engine.convert(&RenderSource::Html(html)).await?,
            RenderStrategy::TempFile => self.convert_via_file(&html).await?,
        };

        if bytes.len() < MIN_PDF_BYTES {
            return Err(RenderError::OutputTooSmall(bytes.len()).into());
        }
        if !infer::archive::is_pdf(&bytes) {
            tracing::warn!(profile_id = id, "Renderer output lacks a PDF signature");
        }

        tracing::info!(profile_id = id, bytes = bytes.len(), ?strategy, "CV rendered");

        Ok(PdfDocument {
            filename: cv_filename(&profile.name),
            bytes,
        })
    }

    async fn convert_via_file(&self, html: &str) -> Result<Vec<u8>, AppError> {
        let file = tempfile::Builder::new()
            .prefix("cv-")
            .suffix(".html")
            .tempfile()?;
        tokio::fs::write(file.path(), html).await?;

        let result = self
            .engine
            .convert(&RenderSource::File(file.path().to_path_buf()))
            .await;

        remove_temp_file(file);
        Ok(result?)
    }

    /// Renders the HTML without converting it and collects renderer diagnostics.
    pub async fn debug_report(&self, id: i64) -> Result<DebugReport, AppError> {
        let (profile, educations) = load_profile(&self.profile_repo, id).await?;
        let html = self.render_html(&profile, &educations)?;
        let diagnostics = self.engine.diagnose().await;

        Ok(DebugReport {
            profile,
            html_length: html.len(),
            diagnostics,
        })
    }
}

fn remove_temp_file(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        tracing::warn!("Failed to remove temporary file {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        pdf::{MockPdfEngine, VersionProbe},
        repositories::profile::MockProfileRepository,
        templates::load_templates,
    };
    use chrono::Utc;
    use std::{
        path::PathBuf,
        sync::Mutex,
    };

    fn stored_profile(id: i64, name: &str) -> Profile {
        Profile {
            id,
            name: name.into(),
            email: "jane@example.com".into(),
            phone: "555".into(),
            summary: "Summary".into(),
            previous_work: "Work".into(),
            skills: "Skills".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn repo_with(name: &'static str) -> MockProfileRepository {
        let mut repo = MockProfileRepository::new();
        repo.expect_get_profile()
            .returning(move |id| Ok(Some(stored_profile(id, name))));
        repo.expect_list_educations().returning(|_| Ok(vec![]));
        repo
    }

    fn echo(source: &RenderSource) -> Result<Vec<u8>, RenderError> {
        let html = match source {
            RenderSource::Html(html) => html.clone(),
            RenderSource::File(path) => std::fs::read_to_string(path).map_err(|e| RenderError::Io(e.to_string()))?,
        };
        Ok(format!("%PDF-1.4\n{}", html).into_bytes())
    }

    fn handler(repo: MockProfileRepository, engine: MockPdfEngine) -> RenderHandler<MockProfileRepository, MockPdfEngine> {
        RenderHandler::new(repo, engine, Arc::new(load_templates().unwrap()))
    }

    #[actix_rt::test]
    async fn both_strategies_produce_identical_documents() {
        let mut engine = MockPdfEngine::new();
        engine.expect_convert().times(2).returning(echo);
        let handler = handler(repo_with("Jane O'Brien! 2024"), engine);

        let inline = handler.render(1, RenderStrategy::InMemory).await.unwrap();
        let file = handler.render(1, RenderStrategy::TempFile).await.unwrap();

        assert_eq!(inline, file);
        assert_eq!(inline.filename, "Jane_OBrien_2024_CV.pdf");
        assert!(inline.bytes.starts_with(b"%PDF"));
    }

    #[actix_rt::test]
    async fn temporary_file_is_removed_after_conversion() {
        let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let recorder = seen.clone();

        let mut engine = MockPdfEngine::new();
        engine.expect_convert().returning(move |source| {
            let RenderSource::File(path) = source else {
                panic!("expected a file source");
            };
            assert!(path.exists());
            assert_eq!(path.extension().and_then(|e| e.to_str()), Some("html"));
            *recorder.lock().unwrap() = Some(path.clone());
            echo(source)
        });

        handler(repo_with("Jane"), engine)
            .render(1, RenderStrategy::TempFile)
            .await
            .unwrap();

        let path = seen.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
    }

    #[actix_rt::test]
    async fn temporary_file_is_removed_when_conversion_fails() {
        let seen: Arc<Mutex<Option<PathBuf>>> = Arc::new(Mutex::new(None));
        let recorder = seen.clone();

        let mut engine = MockPdfEngine::new();
        engine.expect_convert().returning(move |source| {
            if let RenderSource::File(path) = source {
                *recorder.lock().unwrap() = Some(path.clone());
            }
            Err(RenderError::Exited {
                status: "exit status: 1".into(),
                stderr: "Exit with code 1 due to network error".into(),
            })
        });

        let err = handler(repo_with("Jane"), engine)
            .render(1, RenderStrategy::TempFile)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RendererFailure(_)));
        let path = seen.lock().unwrap().clone().unwrap();
        assert!(!path.exists());
    }

    #[actix_rt::test]
    async fn missing_profile_never_reaches_the_renderer() {
        let mut repo = MockProfileRepository::new();
        repo.expect_get_profile().returning(|_| Ok(None));
        repo.expect_list_educations().returning(|_| Ok(vec![]));
        let mut engine = MockPdfEngine::new();
        engine.expect_convert().times(0);

        let err = handler(repo, engine)
            .render(42, RenderStrategy::InMemory)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_rt::test]
    async fn tiny_output_is_rejected() {
        let mut engine = MockPdfEngine::new();
        engine.expect_convert().returning(|_| Ok(b"%PDF-1.4".to_vec()));

        let err = handler(repo_with("Jane"), engine)
            .render(1, RenderStrategy::InMemory)
            .await
            .unwrap_err();

        match err {
            AppError::RendererFailure(message) => assert!(message.contains("8 bytes")),
            other => panic!("expected RendererFailure, got {:?}", other),
        }
    }

    #[actix_rt::test]
    async fn missing_binary_maps_to_unavailable() {
        let mut engine = MockPdfEngine::new();
        engine.expect_convert().returning(|_| Err(RenderError::NotInstalled));

        let err = handler(repo_with("Jane"), engine)
            .render(1, RenderStrategy::InMemory)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RendererUnavailable(_)));
    }

    #[actix_rt::test]
    async fn debug_report_measures_html_without_converting() {
        let mut engine = MockPdfEngine::new();
        engine.expect_convert().times(0);
        engine.expect_diagnose().returning(|| RendererDiagnostics {
            configured_path: None,
            well_known_paths: vec![],
            search_path_hit: None,
            resolved: None,
            version: VersionProbe::NotRun,
        });

        let handler = handler(repo_with("Jane"), engine);
        let report = handler.debug_report(1).await.unwrap();

        let expected = handler.render_html(&report.profile, &[]).unwrap().len();
        assert_eq!(report.html_length, expected);
        assert!(!report.diagnostics.is_available());
    }
}
