use actix_web::{
    web,
    http::StatusCode,
    ResponseError,
    HttpResponse,
    error::{QueryPayloadError, UrlencodedError},
};

/// Large enough for the longest profile plus a full set of education slots.
const FORM_LIMIT: usize = 256 * 1024;

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().limit(FORM_LIMIT).error_handler(|err, _req| {
        FormError::from(err).into()
    }));
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        FormError::from(err).into()
    }));
}

/// Malformed form bodies and query strings, reported as plain text.
#[derive(Debug)]
pub struct FormError {
    message: String,
    status: StatusCode
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ResponseError for FormError {
    fn status_code(&self) -> StatusCode {
        self.status
    }

    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status)
            .content_type("text/plain; charset=utf-8")
            .body(self.message.clone())
    }
}

impl From<UrlencodedError> for FormError {
    fn from(err: UrlencodedError) -> Self {
        let status = match err {
            UrlencodedError::Overflow { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UrlencodedError::ContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::BAD_REQUEST,
        };
        FormError {
            message: format!("Form payload error: {}", err),
            status,
        }
    }
}

impl From<QueryPayloadError> for FormError {
    fn from(err: QueryPayloadError) -> Self {
        FormError {
            message: format!("Query string error: {}", err),
            status: StatusCode::BAD_REQUEST,
        }
    }
}
