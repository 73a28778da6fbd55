use actix_web::{get, Responder};

use crate::handlers::profile::see_other;

/// The builder form is the landing page.
#[get("/")]
pub async fn home() -> impl Responder {
    see_other("/profile/create/")
}
