pub mod api_v1;
pub mod sign_handlers;

use actix_web::web;

/// All routes this service exposes: the JSON API under `/api/v1` and the public
/// signing pages under `/sign`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1").configure(api_v1::configure));
    cfg.service(
        web::scope("/sign")
            .route("/{token}", web::get().to(sign_handlers::page))
            .route("/{token}", web::post().to(sign_handlers::submit)),
    );
}
