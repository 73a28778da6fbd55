use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;
use tera::Context;
use tracing::instrument;

use crate::{
    entities::submission::{FormState, ProfileSubmission},
    errors::AppError,
    templates::{DETAIL_TEMPLATE, FORM_TEMPLATE},
    use_cases::profile::SubmissionOutcome,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct FormQuery {
    /// Number of blank education slots to append
    pub extra: Option<usize>,
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

fn render_form(
    state: &AppState,
    form: &FormState,
    heading: &str,
    action: &str,
) -> Result<HttpResponse, AppError> {
    let mut context = Context::new();
    context.insert("heading", heading);
    context.insert("action", action);
    context.insert("form", &form.view());

    let body = state.templates.render(FORM_TEMPLATE, &context)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

fn submission_response(
    state: &AppState,
    outcome: SubmissionOutcome,
    heading: &str,
    action: &str,
) -> Result<HttpResponse, AppError> {
    match outcome {
        SubmissionOutcome::Saved(id) => Ok(see_other(&format!("/profile/{}/", id))),
        SubmissionOutcome::Invalid(form) => render_form(state, &form, heading, action),
    }
}

#[instrument(skip(state))]
pub async fn new_profile(
    state: web::Data<AppState>,
    query: web::Query<FormQuery>,
) -> Result<HttpResponse, AppError> {
    let form = state.profile_handler.blank_form(query.extra);
    render_form(&state, &form, "Create profile", "/profile/create/")
}

#[instrument(skip(state, form))]
pub async fn create_profile(
    state: web::Data<AppState>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let submission = ProfileSubmission::from_pairs(form.into_inner());
    let outcome = state.profile_handler.submit(None, submission).await?;

    submission_response(&state, outcome, "Create profile", "/profile/create/")
}

#[instrument(skip(state))]
pub async fn profile_detail(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let (profile, educations) = state.profile_handler.get_profile(id.into_inner()).await?;

    let mut context = Context::new();
    context.insert("profile", &profile);
    context.insert("educations", &educations);

    let body = state.templates.render(DETAIL_TEMPLATE, &context)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

#[instrument(skip(state))]
pub async fn edit_profile_form(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    query: web::Query<FormQuery>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let form = state.profile_handler.edit_form(id, query.extra).await?;

    render_form(
        &state,
        &form,
        "Edit profile",
        &format!("/profile/{}/edit/", id),
    )
}

#[instrument(skip(state, form))]
pub async fn update_profile(
    state: web::Data<AppState>,
    id: web::Path<i64>,
    form: web::Form<Vec<(String, String)>>,
) -> Result<HttpResponse, AppError> {
    let id = id.into_inner();
    let submission = ProfileSubmission::from_pairs(form.into_inner());
    let outcome = state.profile_handler.submit(Some(id), submission).await?;

    submission_response(&state, outcome, "Edit profile", &format!("/profile/{}/edit/", id))
}

#[instrument(skip(state))]
pub async fn delete_profile(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.profile_handler.delete_profile(id.into_inner()).await?;
    Ok(see_other("/profile/create/"))
}
