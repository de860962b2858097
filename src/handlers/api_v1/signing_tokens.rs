use actix_session::Session;
use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::auth::session::require_user;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::lease_document::queries as documents;
use crate::models::signing_token::{self, NewSigningToken, SignerUpdate};
use crate::notify::SignerNotifier;
use crate::templates_structs::ApiSigningTokenResponse;

fn response(config: &AppConfig, token: signing_token::SigningToken) -> ApiSigningTokenResponse {
    let url = config.signing_url(&token.token);
    ApiSigningTokenResponse::new(token, url)
}

/// GET /api/v1/documents/{id}/signing-tokens
pub async fn list_for_document(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_user(&session)?;

    let document_id = path.into_inner();
    documents::find_by_id(pool.get_ref(), document_id)
        .await?
        .ok_or(AppError::NotFound)?;

    let tokens: Vec<ApiSigningTokenResponse> = signing_token::find_for_document(&pool, document_id)
        .await?
        .into_iter()
        .map(|t| response(&config, t))
        .collect();

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/v1/documents/{id}/signing-tokens - Issue and send a signing link
pub async fn create(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    notifier: web::Data<dyn SignerNotifier>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<NewSigningToken>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let token = signing_token::generate(&pool, path.into_inner(), &body, Some(user_id)).await?;
    let url = config.signing_url(&token.token);
    if let Err(e) = notifier.notify_signer(&token, &url) {
        log::error!("Sending signing link {} failed: {}", token.id, e);
    }

    Ok(HttpResponse::Created().json(ApiSigningTokenResponse::new(token, url)))
}

/// PUT /api/v1/signing-tokens/{id} - Change signer contact details
pub async fn update(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<SignerUpdate>,
) -> Result<HttpResponse, AppError> {
    require_user(&session)?;

    let token = signing_token::update(&pool, path.into_inner(), &body).await?;

    Ok(HttpResponse::Ok().json(response(&config, token)))
}

/// POST /api/v1/signing-tokens/{id}/resend
pub async fn resend(
    pool: web::Data<PgPool>,
    config: web::Data<AppConfig>,
    notifier: web::Data<dyn SignerNotifier>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_user(&session)?;

    let token = signing_token::resend(
        &pool,
        path.into_inner(),
        config.resend_cooldown,
        notifier.get_ref(),
        |value| config.signing_url(value),
    )
    .await?;

    Ok(HttpResponse::Ok().json(response(&config, token)))
}
