use actix_web::{
    http::header::{
        self, Charset, ContentDisposition, DispositionParam, DispositionType, ExtendedValue,
    },
    web, HttpResponse,
};
use serde::Serialize;
use sysinfo::System;
use tera::Context;
use tracing::instrument;

use crate::{
    errors::AppError,
    pdf::DiagnosticsView,
    templates::DEBUG_TEMPLATE,
    use_cases::render::{PdfDocument, RenderStrategy},
    utils::filename::ascii_fallback,
    AppState,
};

#[derive(Serialize)]
struct HostInfo {
    os: String,
    kernel: String,
}

/// Plain `filename` for every client, plus a UTF-8 `filename*` when the name is not ASCII.
fn content_disposition(filename: &str) -> ContentDisposition {
    let mut parameters = vec![DispositionParam::Filename(ascii_fallback(filename))];
    if !filename.is_ascii() {
        parameters.push(DispositionParam::FilenameExt(ExtendedValue {
            charset: Charset::Ext("UTF-8".to_string()),
            language_tag: None,
            value: filename.as_bytes().to_vec(),
        }));
    }

    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters,
    }
}

fn attachment(document: PdfDocument) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header(content_disposition(&document.filename))
        .insert_header((header::CONTENT_LENGTH, document.bytes.len().to_string()))
        .insert_header((header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"))
        .insert_header((header::PRAGMA, "no-cache"))
        .insert_header((header::EXPIRES, "0"))
        .body(document.bytes)
}

/// Pipes the rendered HTML straight into the renderer.
#[instrument(skip(state))]
pub async fn generate_pdf(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let document = state
        .render_handler
        .render(id.into_inner(), RenderStrategy::InMemory)
        .await?;
    Ok(attachment(document))
}

/// Same document, rendered from a temporary HTML file.
#[instrument(skip(state))]
pub async fn generate_pdf_alt(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let document = state
        .render_handler
        .render(id.into_inner(), RenderStrategy::TempFile)
        .await?;
    Ok(attachment(document))
}

#[instrument(skip(state))]
pub async fn debug_pdf(
    state: web::Data<AppState>,
    id: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let report = state.render_handler.debug_report(id.into_inner()).await?;

    let host = HostInfo {
        os: System::name().unwrap_or_else(|| "Unknown".to_string()),
        kernel: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
    };

    let mut context = Context::new();
    context.insert("profile", &report.profile);
    context.insert("html_length", &report.html_length);
    context.insert("diagnostics", &DiagnosticsView::from(&report.diagnostics));
    context.insert("host", &host);

    let body = state.templates.render(DEBUG_TEMPLATE, &context)?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}
