pub mod documents;
pub mod sign;
pub mod signing_tokens;

use actix_web::{
    web, Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::{Next, from_fn},
};

use crate::auth::middleware::require_auth;
use crate::templates_structs::ApiErrorResponse;

/// CSRF protection for REST API mutation endpoints.
///
/// Rejects POST/PUT/DELETE requests that don't have Content-Type: application/json.
/// Browsers cannot send cross-origin JSON with cookies via a simple form POST,
/// so the Content-Type check guards the cookie-authenticated API without tokens.
/// GET requests are exempt.
pub async fn require_json_content_type(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let method = req.method().clone();

    if method == actix_web::http::Method::POST
        || method == actix_web::http::Method::PUT
        || method == actix_web::http::Method::DELETE
    {
        let content_type = req
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !content_type.starts_with("application/json") {
            let response = HttpResponse::BadRequest().json(ApiErrorResponse {
                error: "Content-Type must be application/json for mutation requests".to_string(),
                details: None,
            });
            return Ok(req.into_response(response).map_into_right_body());
        }
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Configure API v1 routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/documents")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("", web::get().to(documents::list))
            .route("", web::post().to(documents::create))
            .route("/{id}", web::get().to(documents::read))
            .route("/{id}", web::delete().to(documents::delete))
            .route("/{id}/content", web::put().to(documents::update_content))
            .route("/{id}/resolve", web::post().to(documents::resolve))
            .route("/{id}/finalize", web::post().to(documents::finalize))
            .route("/{id}/revert", web::post().to(documents::revert))
            .route("/{id}/placeholders", web::post().to(documents::add_placeholder))
            .route("/{id}/sign", web::post().to(documents::sign))
            .route("/{id}/signing-tokens", web::get().to(signing_tokens::list_for_document))
            .route("/{id}/signing-tokens", web::post().to(signing_tokens::create)),
    );
    cfg.service(
        web::scope("/signing-tokens")
            .wrap(from_fn(require_json_content_type))
            .wrap(from_fn(require_auth))
            .route("/{id}", web::put().to(signing_tokens::update))
            .route("/{id}/resend", web::post().to(signing_tokens::resend)),
    );
    cfg.service(web::scope("/sign").route("/{token}", web::get().to(sign::verify)));
}
