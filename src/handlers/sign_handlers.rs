use actix_web::{http::StatusCode, web, HttpResponse};
use chrono::Utc;
use sqlx::PgPool;

use crate::errors::{self, AppError};
use crate::models::lease_document::{DocumentStatus, LeaseDocument, render};
use crate::models::signature::{SignatureRole, SignatureStamp};
use crate::models::signing_token::{self, TokenVerification};
use crate::signing;
use crate::templates_structs::{
    SignCompleteTemplate, SignPageTemplate, SignSubmission, SignUnavailableTemplate, SignedViewTemplate,
};

fn unavailable() -> Result<HttpResponse, AppError> {
    errors::render_with_status(StatusCode::GONE, SignUnavailableTemplate)
}

enum PublicLink {
    Live(TokenVerification, LeaseDocument),
    /// Used by its holder; the signed document can still be viewed.
    Signed(TokenVerification, LeaseDocument),
    /// Unknown or dead for any other reason. The pages never say which.
    Unavailable,
}

async fn public_link(pool: &PgPool, token: &str) -> Result<PublicLink, AppError> {
    let mut v = match signing_token::verify(pool, token).await {
        Ok(v) => v,
        Err(AppError::NotFound) => return Ok(PublicLink::Unavailable),
        Err(e) => return Err(e),
    };
    let signed = v.expired && v.signed_through_link();
    Ok(match v.document.take() {
        Some(doc) if !v.expired => PublicLink::Live(v, doc),
        Some(doc) if signed => PublicLink::Signed(v, doc),
        _ => PublicLink::Unavailable,
    })
}

fn signed_view(status: StatusCode, doc: &LeaseDocument, role: SignatureRole) -> Result<HttpResponse, AppError> {
    let tmpl = SignedViewTemplate {
        title: doc.title.clone(),
        role_label: role.label().to_string(),
        body_html: render::to_html(&doc.tree()?),
    };
    errors::render_with_status(status, tmpl)
}

fn signing_page(
    token: String,
    doc: &LeaseDocument,
    role: SignatureRole,
    signer_name: String,
    errors: Vec<String>,
) -> Result<SignPageTemplate, AppError> {
    Ok(SignPageTemplate {
        token,
        title: doc.title.clone(),
        role_label: role.label().to_string(),
        signer_name,
        body_html: render::to_html(&doc.tree()?),
        errors,
    })
}

/// GET /sign/{token}
pub async fn page(pool: web::Data<PgPool>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let (link, doc) = match public_link(&pool, &token).await? {
        PublicLink::Live(link, doc) => (link, doc),
        PublicLink::Signed(link, doc) => return signed_view(StatusCode::OK, &doc, link.role),
        PublicLink::Unavailable => return unavailable(),
    };

    let signer_name = link.signer_name.unwrap_or_default();
    errors::render(signing_page(token, &doc, link.role, signer_name, Vec::new())?)
}

/// POST /sign/{token}
pub async fn submit(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    form: web::Form<SignSubmission>,
) -> Result<HttpResponse, AppError> {
    let token = path.into_inner();
    let (link, doc) = match public_link(&pool, &token).await? {
        PublicLink::Live(link, doc) => (link, doc),
        PublicLink::Signed(link, doc) => return signed_view(StatusCode::CONFLICT, &doc, link.role),
        PublicLink::Unavailable => return unavailable(),
    };

    let stamp = SignatureStamp {
        signature_image_ref: form.signature_image_ref.clone(),
        signed_by_name: form.signed_by_name.clone(),
        signed_at: Utc::now(),
    };

    match signing::sign_with_token(&pool, &token, &stamp).await {
        Ok(signed) => errors::render(SignCompleteTemplate {
            title: signed.title,
            role_label: link.role.label().to_string(),
            fully_signed: signed.status == DocumentStatus::Signed,
        }),
        Err(AppError::Validation(msg)) => {
            let tmpl = signing_page(token, &doc, link.role, form.signed_by_name.clone(), vec![msg])?;
            errors::render_with_status(StatusCode::UNPROCESSABLE_ENTITY, tmpl)
        }
        Err(AppError::NotFound | AppError::Expired | AppError::Conflict(_)) => unavailable(),
        Err(e) => Err(e),
    }
}
