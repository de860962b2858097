use actix_session::Session;
use actix_web::{web, HttpResponse};
use chrono::Utc;
use sqlx::PgPool;

use crate::auth::session::require_user;
use crate::errors::AppError;
use crate::models::lease_document::{self, queries, workflow};
use crate::models::signature::SignatureStamp;
use crate::signing;
use crate::templates_structs::{
    ApiDocumentResponse, ApiSignRequest, DocumentListQuery, PaginatedResponse,
};

/// GET /api/v1/documents - List documents
/// Query params: status, page (default 1), per_page (default 25)
pub async fn list(
    pool: web::Data<PgPool>,
    session: Session,
    query: web::Query<DocumentListQuery>,
) -> Result<HttpResponse, AppError> {
    require_user(&session)?;

    let page = queries::find_all(
        &pool,
        query.status,
        query.page.unwrap_or(1),
        query.per_page.unwrap_or(25),
    )
    .await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse::from(page)))
}

/// GET /api/v1/documents/{id}
pub async fn read(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_user(&session)?;

    let doc = queries::find_by_id(pool.get_ref(), path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// POST /api/v1/documents - Create a draft
pub async fn create(
    pool: web::Data<PgPool>,
    session: Session,
    body: web::Json<lease_document::NewLeaseDocument>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let doc = workflow::create(&pool, &body, Some(user_id)).await?;

    Ok(HttpResponse::Created().json(ApiDocumentResponse::from_document(doc)?))
}

/// PUT /api/v1/documents/{id}/content - Replace draft content
pub async fn update_content(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<lease_document::ContentUpdate>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let doc = workflow::update_content(&pool, path.into_inner(), &body, Some(user_id)).await?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// POST /api/v1/documents/{id}/resolve - Fill template fields from the tenancy record
pub async fn resolve(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: Option<web::Json<lease_document::ResolveRequest>>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;
    let request = body.map(|b| b.into_inner()).unwrap_or_default();

    let outcome = workflow::resolve_fields(&pool, path.into_inner(), &request, Some(user_id)).await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// POST /api/v1/documents/{id}/finalize
pub async fn finalize(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let doc = workflow::finalize(&pool, path.into_inner(), Some(user_id)).await?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// POST /api/v1/documents/{id}/revert - Back to draft
pub async fn revert(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let doc = workflow::revert_to_draft(&pool, path.into_inner(), Some(user_id)).await?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// POST /api/v1/documents/{id}/placeholders - Add a signature block
pub async fn add_placeholder(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<lease_document::PlaceholderRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let doc = workflow::insert_placeholder(&pool, path.into_inner(), &body, Some(user_id)).await?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// POST /api/v1/documents/{id}/sign - Sign in person for a role
pub async fn sign(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<ApiSignRequest>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    let stamp = SignatureStamp {
        signature_image_ref: body.signature_image_ref.clone(),
        signed_by_name: body.signed_by_name.clone(),
        signed_at: Utc::now(),
    };
    let doc = signing::sign_directly(&pool, path.into_inner(), body.role, &stamp, user_id).await?;

    Ok(HttpResponse::Ok().json(ApiDocumentResponse::from_document(doc)?))
}

/// DELETE /api/v1/documents/{id} - Drafts only
pub async fn delete(
    pool: web::Data<PgPool>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let user_id = require_user(&session)?;

    workflow::delete(&pool, path.into_inner(), Some(user_id)).await?;

    Ok(HttpResponse::NoContent().finish())
}
