use std::sync::Arc;

use tera::Tera;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;

pub use domain::{entities, use_cases};
pub use interfaces::{handlers, repositories, routes};
pub use infrastructure::{db, pdf, templates, utils};

use pdf::{wkhtmltopdf::WkhtmltopdfEngine, PdfEngine};
use repositories::{profile::ProfileRepository, sqlx_repo::SqlxProfileRepo};
use use_cases::{profile::ProfileHandler, render::RenderHandler};

pub type SharedProfileRepo = Arc<dyn ProfileRepository>;
pub type SharedPdfEngine = Arc<dyn PdfEngine>;

pub type AppProfileHandler = ProfileHandler<SharedProfileRepo>;
pub type AppRenderHandler = RenderHandler<SharedProfileRepo, SharedPdfEngine>;

pub struct AppState {
    pub profile_handler: AppProfileHandler,
    pub render_handler: AppRenderHandler,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub fn new(config: &settings::AppConfig, pool: sqlx::PgPool) -> Result<Self, tera::Error> {
        let profile_repo: SharedProfileRepo = Arc::new(SqlxProfileRepo::new(pool));
        let engine: SharedPdfEngine = Arc::new(WkhtmltopdfEngine::from_config(config));

        Self::with_parts(config, profile_repo, engine)
    }

    /// Wires the handlers around any repository and renderer.
    pub fn with_parts(
        config: &settings::AppConfig,
        profile_repo: SharedProfileRepo,
        engine: SharedPdfEngine,
    ) -> Result<Self, tera::Error> {
        let templates = Arc::new(templates::load_templates()?);

        let profile_handler = ProfileHandler::new(profile_repo.clone(), config.blank_education_slots);
        let render_handler = RenderHandler::new(profile_repo, engine, templates.clone());

        Ok(AppState {
            profile_handler,
            render_handler,
            templates,
        })
    }
}
