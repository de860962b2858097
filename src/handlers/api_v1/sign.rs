use actix_web::{web, HttpResponse};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::signing_token;
use crate::templates_structs::ApiTokenVerification;

/// GET /api/v1/sign/{token} - Public check of a signing link
pub async fn verify(pool: web::Data<PgPool>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let verification = signing_token::verify(&pool, &path.into_inner()).await?;
    let signed = verification.signed_through_link();

    match verification.document {
        Some(doc) if !verification.expired => Ok(HttpResponse::Ok().json(ApiTokenVerification::live(
            &doc,
            verification.role,
            verification.signer_name,
        )?)),
        Some(doc) if signed => Ok(HttpResponse::Ok().json(ApiTokenVerification::signed(
            &doc,
            verification.role,
            verification.signer_name,
        )?)),
        _ => Ok(HttpResponse::Gone().json(ApiTokenVerification::expired())),
    }
}
