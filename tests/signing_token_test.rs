/// Integration tests for signing link management: resend cooldown, resend and
/// signer updates after the link has been used.

use sqlx::PgPool;
use std::error::Error;
use std::time::Duration;

use leasesign::errors::AppError;
use leasesign::models::signature::SignatureRole;
use leasesign::models::signing_token::{self, NewSigningToken, SignerUpdate};
use leasesign::signing;

mod common;
use common::*;

fn tenant_link() -> NewSigningToken {
    NewSigningToken {
        role: SignatureRole::Tenant,
        signer_name: Some("Ama Mensah".into()),
        signer_email: Some("ama@example.com".into()),
        signer_phone: None,
        tenant_application_id: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_generation_counts_as_first_send(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;
    assert!(token.last_sent_at.is_some());

    let notifier = RecordingNotifier::default();
    let result = signing_token::resend(&pool, token.id, Duration::from_secs(60), &notifier, signing_url).await;
    match result {
        Err(AppError::CooldownActive(secs)) => assert!((1..=60).contains(&secs)),
        other => panic!("expected cooldown, got {other:?}"),
    }
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_resend_after_cooldown_notifies(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;

    let notifier = RecordingNotifier::default();
    let resent = signing_token::resend(&pool, token.id, Duration::ZERO, &notifier, signing_url).await?;
    assert!(resent.last_sent_at >= token.last_sent_at);
    assert_eq!(notifier.sent(), vec![signing_url(&token.token)]);

    // Resending never touches signature state
    let check = signing_token::verify(&pool, &token.token).await?;
    assert!(!check.expired);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_resends_send_once(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;
    sqlx::query("UPDATE signing_tokens SET last_sent_at = NOW() - INTERVAL '1 hour' WHERE id = $1")
        .bind(token.id)
        .execute(&pool)
        .await?;

    let notifier = RecordingNotifier::default();
    let cooldown = Duration::from_secs(60);
    let (a, b) = tokio::join!(
        signing_token::resend(&pool, token.id, cooldown, &notifier, signing_url),
        signing_token::resend(&pool, token.id, cooldown, &notifier, signing_url),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let throttled = if a.is_ok() { b } else { a };
    assert!(matches!(throttled, Err(AppError::CooldownActive(_))));
    assert_eq!(notifier.sent().len(), 1);
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_used_link_cannot_be_resent_or_updated(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;
    signing::sign_with_token(&pool, &token.token, &stamp_for("Ama Mensah")).await?;

    let notifier = RecordingNotifier::default();
    let result = signing_token::resend(&pool, token.id, Duration::ZERO, &notifier, signing_url).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    let update = SignerUpdate { signer_email: Some("new@example.com".into()), ..SignerUpdate::default() };
    let result = signing_token::update(&pool, token.id, &update).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_resend_for_completed_role_is_expired(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;
    signing::sign_directly(&pool, doc.id, SignatureRole::Tenant, &stamp_for("Ama Mensah"), MANAGER_ID).await?;

    let notifier = RecordingNotifier::default();
    let result = signing_token::resend(&pool, token.id, Duration::ZERO, &notifier, signing_url).await;
    assert!(matches!(result, Err(AppError::Expired)));
    assert!(notifier.sent().is_empty());
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_signer_before_use(pool: PgPool) -> Result<(), Box<dyn Error>> {
    let doc = insert_finalized(&pool).await;
    let token = signing_token::generate(&pool, doc.id, &tenant_link(), Some(MANAGER_ID)).await?;

    let update = SignerUpdate {
        signer_name: Some("Ama K. Mensah".into()),
        signer_phone: Some("+233 20 000 0000".into()),
        ..SignerUpdate::default()
    };
    let updated = signing_token::update(&pool, token.id, &update).await?;
    assert_eq!(updated.signer_name.as_deref(), Some("Ama K. Mensah"));
    assert_eq!(updated.signer_email.as_deref(), Some("ama@example.com"));
    assert_eq!(updated.signer_phone.as_deref(), Some("+233 20 000 0000"));

    let result = signing_token::update(&pool, token.id, &SignerUpdate::default()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    let result = signing_token::update(&pool, 9999, &update).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    let listed = signing_token::find_for_document(&pool, doc.id).await?;
    assert_eq!(listed.len(), 1);
    Ok(())
}
