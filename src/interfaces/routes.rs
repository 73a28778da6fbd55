use actix_web::web;

use crate::handlers::{home::home, system::health_check};

mod profile;
mod form_error;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(home);
    cfg.service(health_check);

    cfg.configure(profile::config_routes);
    cfg.configure(form_error::config_routes);
}
