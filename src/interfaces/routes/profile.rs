use actix_web::web;

use crate::handlers::{pdf, profile};

pub fn config_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/profile")
            .service(
                web::resource("/create/")
                    .route(web::get().to(profile::new_profile))
                    .route(web::post().to(profile::create_profile))
            )
            .service(
                web::resource("/{id}/")
                    .route(web::get().to(profile::profile_detail))
            )
            .service(
                web::resource("/{id}/edit/")
                    .route(web::get().to(profile::edit_profile_form))
                    .route(web::post().to(profile::update_profile))
            )
            .service(
                web::resource("/{id}/delete/")
                    .route(web::post().to(profile::delete_profile))
            )
            .service(
                web::resource("/{id}/generate-pdf/")
                    .route(web::get().to(pdf::generate_pdf))
            )
            .service(
                web::resource("/{id}/generate-pdf-alt/")
                    .route(web::get().to(pdf::generate_pdf_alt))
            )
            .service(
                web::resource("/{id}/debug-pdf/")
                    .route(web::get().to(pdf::debug_pdf))
            )
    );
}
