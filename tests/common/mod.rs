//! Shared test infrastructure for the lease signing tests.
//!
//! Database tests run under `#[sqlx::test]`, which hands each test a fresh
//! migrated Postgres database (`DATABASE_URL` must point at a server). The
//! helpers here build the standard lease template and drive documents into the
//! states the tests start from.

#![allow(dead_code)]

use chrono::{NaiveDate, Utc};
use serde_json::{Value, json};
use sqlx::PgPool;
use std::sync::Mutex;

use leasesign::models::lease_document::{LeaseDocument, NewLeaseDocument, workflow};
use leasesign::models::signature::SignatureStamp;
use leasesign::models::signing_token::SigningToken;
use leasesign::models::template::{PaymentFrequency, TenancyRecord};
use leasesign::models::tenancy;
use leasesign::notify::{NotifyError, SignerNotifier};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

pub const MANAGER_ID: i64 = 1;

// ============================================================================
// FIXTURES
// ============================================================================

/// Lease template with a few field tokens and both primary signature blocks.
pub fn lease_template() -> Value {
    json!({
        "version": 1,
        "root": {
            "type": "root",
            "children": [
                {"type": "heading", "tag": "h1", "children": [{"type": "text", "text": "Tenancy Agreement"}]},
                {"type": "paragraph", "children": [
                    {"type": "text", "text": "This agreement is made with "},
                    {"type": "token", "text": "#TenantName", "format": 1},
                    {"type": "text", "text": " for "},
                    {"type": "token", "text": "#UnitName"},
                    {"type": "text", "text": " at a monthly rent of "},
                    {"type": "token", "text": "#RentAmount"},
                    {"type": "text", "text": " ("},
                    {"type": "token", "text": "#RentAmountInWords"},
                    {"type": "text", "text": "). Guarantor: "},
                    {"type": "token", "text": "#GuarantorName"}
                ]},
                {"type": "paragraph", "children": [
                    {"type": "signature", "role": "PROPERTY_MANAGER", "label": "Property Manager"}
                ]},
                {"type": "paragraph", "children": [
                    {"type": "signature", "role": "TENANT", "label": "Tenant"}
                ]}
            ]
        }
    })
}

/// Tenancy record without a guarantor, so `#GuarantorName` stays unresolved.
pub fn sample_record() -> TenancyRecord {
    TenancyRecord {
        tenant_first_name: Some("Ama".into()),
        tenant_last_name: Some("Mensah".into()),
        tenant_email: Some("ama@example.com".into()),
        unit_name: Some("Flat 4B".into()),
        property_manager_name: Some("Kofi Boateng".into()),
        rent_amount: Some(2500.5),
        payment_frequency: Some(PaymentFrequency::Monthly),
        lease_duration: Some(12),
        lease_start_date: NaiveDate::from_ymd_opt(2025, 1, 1),
        ..TenancyRecord::default()
    }
}

pub fn stamp_for(name: &str) -> SignatureStamp {
    SignatureStamp {
        signature_image_ref: format!("https://files.example.com/signatures/{}.png", name.to_lowercase().replace(' ', "-")),
        signed_by_name: name.to_string(),
        signed_at: Utc::now(),
    }
}

// ============================================================================
// DATABASE HELPERS
// ============================================================================

pub async fn insert_record(pool: &PgPool, record: &TenancyRecord) -> i64 {
    tenancy::insert(pool, record).await.expect("insert tenancy record")
}

pub async fn insert_draft(pool: &PgPool, content: Value, tenancy_record_id: Option<i64>) -> LeaseDocument {
    let new = NewLeaseDocument {
        title: "Lease for Flat 4B".to_string(),
        content: Some(content),
        tenancy_record_id,
    };
    workflow::create(pool, &new, Some(MANAGER_ID)).await.expect("create draft")
}

/// Draft from the standard template, finalized.
pub async fn insert_finalized(pool: &PgPool) -> LeaseDocument {
    let draft = insert_draft(pool, lease_template(), None).await;
    workflow::finalize(pool, draft.id, Some(MANAGER_ID)).await.expect("finalize")
}

// ============================================================================
// NOTIFIER
// ============================================================================

/// Notifier that remembers every link it was asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("notifier lock").clone()
    }
}

impl SignerNotifier for RecordingNotifier {
    fn notify_signer(&self, _token: &SigningToken, signing_url: &str) -> Result<(), NotifyError> {
        self.sent.lock().expect("notifier lock").push(signing_url.to_string());
        Ok(())
    }
}

pub fn signing_url(token: &str) -> String {
    format!("https://leases.example.com/sign/{token}")
}
