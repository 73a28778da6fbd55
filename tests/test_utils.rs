#![allow(dead_code)]

use actix_web::{
    middleware::{NormalizePath, TrailingSlash},
    web,
    App, HttpServer
};
use async_trait::async_trait;
use chrono::Utc;
use cv_builder::{
    entities::{
        education::{sort_for_display, Education, EducationUpsert},
        profile::{Profile, ProfileInsert},
        submission::ValidatedSubmission,
    },
    errors::AppError,
    pdf::{PdfEngine, RenderError, RenderSource, RendererDiagnostics, VersionProbe},
    repositories::profile::ProfileRepository,
    routes::configure_routes,
    settings::{AppConfig, AppEnvironment},
    AppState, SharedPdfEngine, SharedProfileRepo,
};
use reqwest::{redirect::Policy, Client};
use std::{
    collections::BTreeMap,
    net::TcpListener,
    path::PathBuf,
    sync::{atomic::{AtomicBool, Ordering}, Arc, Mutex},
    time::Duration,
};

// ───── In-memory storage ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct Store {
    next_profile_id: i64,
    next_education_id: i64,
    profiles: BTreeMap<i64, Profile>,
    educations: BTreeMap<i64, Education>,
}

impl Store {
    fn insert_profile(&mut self, profile: &ProfileInsert) -> i64 {
        self.next_profile_id += 1;
        let id = self.next_profile_id;
        let now = Utc::now();
        self.profiles.insert(id, Profile {
            id,
            name: profile.name.clone(),
            email: profile.email.clone(),
            phone: profile.phone.clone(),
            summary: profile.summary.clone(),
            previous_work: profile.previous_work.clone(),
            skills: profile.skills.clone(),
            created_at: now,
            updated_at: now,
        });
        id
    }

    fn update_profile(&mut self, id: i64, profile: &ProfileInsert) -> Result<(), AppError> {
        let stored = self
            .profiles
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Profile {}", id)))?;
        stored.name = profile.name.clone();
        stored.email = profile.email.clone();
        stored.phone = profile.phone.clone();
        stored.summary = profile.summary.clone();
        stored.previous_work = profile.previous_work.clone();
        stored.skills = profile.skills.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    fn apply_educations(
        &mut self,
        profile_id: i64,
        entries: &[EducationUpsert],
        to_delete: &[i64],
    ) -> Result<(), AppError> {
        self.educations
            .retain(|id, e| !(e.profile_id == profile_id && to_delete.contains(id)));

        for entry in entries {
            match entry.id {
                None => {
                    self.next_education_id += 1;
                    let id = self.next_education_id;
                    self.educations.insert(id, Education {
                        id,
                        profile_id,
                        degree: entry.degree.clone(),
                        university: entry.university.clone(),
                        graduation_year: entry.graduation_year.clone(),
                        gpa: entry.gpa.clone(),
                        description: entry.description.clone(),
                        order: entry.order,
                    });
                }
                Some(id) => {
                    let stored = self
                        .educations
                        .get_mut(&id)
                        .filter(|e| e.profile_id == profile_id)
                        .ok_or_else(|| AppError::NotFound(format!(
                            "Education entry {} of profile {}", id, profile_id
                        )))?;
                    stored.degree = entry.degree.clone();
                    stored.university = entry.university.clone();
                    stored.graduation_year = entry.graduation_year.clone();
                    stored.gpa = entry.gpa.clone();
                    stored.description = entry.description.clone();
                    stored.order = entry.order;
                }
            }
        }

        Ok(())
    }
}

/// Applies each write to a copy of the store and swaps it in only on success,
/// which gives the same all-or-nothing behaviour as a database transaction.
#[derive(Clone, Default)]
pub struct InMemoryProfileRepo {
    store: Arc<Mutex<Store>>,
    fail_after_profile_write: Arc<AtomicBool>,
}

impl InMemoryProfileRepo {
    /// Makes the next submission fail after the profile row has been written.
    pub fn fail_next_submission(&self) {
        self.fail_after_profile_write.store(true, Ordering::SeqCst);
    }

    pub fn profile_count(&self) -> usize {
        self.store.lock().unwrap().profiles.len()
    }

    pub fn education_count(&self) -> usize {
        self.store.lock().unwrap().educations.len()
    }

    pub fn profile(&self, id: i64) -> Option<Profile> {
        self.store.lock().unwrap().profiles.get(&id).cloned()
    }

    pub fn educations_of(&self, profile_id: i64) -> Vec<Education> {
        let mut educations: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .educations
            .values()
            .filter(|e| e.profile_id == profile_id)
            .cloned()
            .collect();
        sort_for_display(&mut educations);
        educations
    }

    fn transaction<T>(&self, f: impl FnOnce(&mut Store) -> Result<T, AppError>) -> Result<T, AppError> {
        let mut guard = self.store.lock().unwrap();
        let mut working = guard.clone();
        let value = f(&mut working)?;
        *guard = working;
        Ok(value)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryProfileRepo {
    async fn check_connection(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn create_profile(&self, profile: &ProfileInsert) -> Result<i64, AppError> {
        self.transaction(|store| Ok(store.insert_profile(profile)))
    }

    async fn get_profile(&self, id: i64) -> Result<Option<Profile>, AppError> {
        Ok(self.profile(id))
    }

    async fn list_educations(&self, profile_id: i64) -> Result<Vec<Education>, AppError> {
        Ok(self.educations_of(profile_id))
    }

    async fn save_education_set(
        &self,
        profile_id: i64,
        entries: &[EducationUpsert],
        to_delete: &[i64],
    ) -> Result<(), AppError> {
        self.transaction(|store| store.apply_educations(profile_id, entries, to_delete))
    }

    async fn save_submission(&self, submission: &ValidatedSubmission) -> Result<i64, AppError> {
        let fail = self.fail_after_profile_write.swap(false, Ordering::SeqCst);

        self.transaction(|store| {
            let id = match submission.profile_id {
                Some(id) => {
                    store.update_profile(id, &submission.profile)?;
                    id
                }
                None => store.insert_profile(&submission.profile),
            };

            if fail {
                return Err(AppError::TransactionFailure("connection reset by peer".into()));
            }

            store.apply_educations(id, &submission.changes.upserts, &submission.changes.deletes)?;
            Ok(id)
        })
    }

    async fn delete_profile(&self, id: i64) -> Result<(), AppError> {
        self.transaction(|store| {
            store
                .profiles
                .remove(&id)
                .ok_or_else(|| AppError::NotFound(format!("Profile {}", id)))?;
            store.educations.retain(|_, e| e.profile_id != id);
            Ok(())
        })
    }
}

// ───── Fake renderer ──────────────────────────────────────────────────

pub const PDF_HEADER: &str = "%PDF-1.4\n";

/// Emits the PDF magic followed by the exact HTML it was given, so tests can
/// inspect what reached the renderer.
#[derive(Clone, Default)]
pub struct EchoEngine {
    pub seen_files: Arc<Mutex<Vec<PathBuf>>>,
    pub unavailable: bool,
}

#[async_trait]
impl PdfEngine for EchoEngine {
    async fn convert(&self, source: &RenderSource) -> Result<Vec<u8>, RenderError> {
        if self.unavailable {
            return Err(RenderError::NotInstalled);
        }

        let html = match source {
            RenderSource::Html(html) => html.clone(),
            RenderSource::File(path) => {
                self.seen_files.lock().unwrap().push(path.clone());
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|e| RenderError::Io(e.to_string()))?
            }
        };

        Ok(format!("{}{}", PDF_HEADER, html).into_bytes())
    }

    async fn diagnose(&self) -> RendererDiagnostics {
        RendererDiagnostics {
            configured_path: None,
            well_known_paths: vec![],
            search_path_hit: None,
            resolved: (!self.unavailable).then(|| "/usr/bin/wkhtmltopdf".to_string()),
            version: if self.unavailable {
                VersionProbe::NotRun
            } else {
                VersionProbe::Reported("wkhtmltopdf 0.12.6".into())
            },
        }
    }
}

// ───── Test server ────────────────────────────────────────────────────

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub repo: InMemoryProfileRepo,
    pub engine: EchoEngine,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(EchoEngine::default()).await
    }

    pub async fn spawn_with(engine: EchoEngine) -> Self {
        let config = test_config();
        let repo = InMemoryProfileRepo::default();

        let shared_repo: SharedProfileRepo = Arc::new(repo.clone());
        let shared_engine: SharedPdfEngine = Arc::new(engine.clone());
        let state = web::Data::new(
            AppState::with_parts(&config, shared_repo, shared_engine).expect("Failed to build app state")
        );

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .wrap(NormalizePath::new(TrailingSlash::Always))
                .configure(configure_routes)
        })
        .listen(listener)
        .expect("Failed to bind server")
        .workers(config.worker_count)
        .run();

        actix_rt::spawn(server);

        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("Failed to build client");

        while client.get(format!("{}/health/", address)).send().await.is_err() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            address,
            client,
            repo,
            engine,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_form(&self, path: &str, pairs: &[(String, String)]) -> reqwest::Response {
        let body = pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        self.client
            .post(self.url(path))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to post form")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Id from a `/profile/{id}/` redirect.
pub fn redirected_id(response: &reqwest::Response) -> i64 {
    location(response)
        .trim_matches('/')
        .rsplit('/')
        .next()
        .and_then(|id| id.parse().ok())
        .expect("redirect should point at a profile")
}

fn test_config() -> AppConfig {
    AppConfig {
        env: AppEnvironment::Testing,
        name: "CV Builder Test".to_string(),
        port: 0,
        host: "127.0.0.1".to_string(),
        worker_count: 1,
        database_url: "postgres://unused".into(),
        renderer_path: None,
        renderer_timeout_secs: 5,
        renderer_version_timeout_secs: 1,
        javascript_delay_ms: 0,
        blank_education_slots: 1,
    }
}
