use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Party a signature block belongs to. Every role is a singleton per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignatureRole {
    PropertyManager,
    Tenant,
    PmWitness,
    TenantWitness,
}

impl SignatureRole {
    pub const ALL: [SignatureRole; 4] = [
        SignatureRole::PropertyManager,
        SignatureRole::Tenant,
        SignatureRole::PmWitness,
        SignatureRole::TenantWitness,
    ];

    /// Roles that must be present before a document can be finalized.
    pub const PRIMARY: [SignatureRole; 2] = [SignatureRole::PropertyManager, SignatureRole::Tenant];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureRole::PropertyManager => "PROPERTY_MANAGER",
            SignatureRole::Tenant => "TENANT",
            SignatureRole::PmWitness => "PM_WITNESS",
            SignatureRole::TenantWitness => "TENANT_WITNESS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SignatureRole::PropertyManager => "Property Manager",
            SignatureRole::Tenant => "Tenant",
            SignatureRole::PmWitness => "Property Manager's Witness",
            SignatureRole::TenantWitness => "Tenant's Witness",
        }
    }
}

impl fmt::Display for SignatureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SignatureRole::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Unknown signature role '{s}'"))
    }
}

/// A signature block embedded in the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignaturePlaceholder {
    pub role: SignatureRole,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub signature_image_ref: Option<String>,
    #[serde(default)]
    pub signed_by_name: Option<String>,
    #[serde(default)]
    pub signed_at: Option<DateTime<Utc>>,
}

impl SignaturePlaceholder {
    pub fn unsigned(role: SignatureRole, label: &str) -> Self {
        SignaturePlaceholder {
            role,
            label: label.to_string(),
            signature_image_ref: None,
            signed_by_name: None,
            signed_at: None,
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signature_image_ref.is_some()
    }
}

/// What gets written into a placeholder when a party signs.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureStamp {
    pub signature_image_ref: String,
    pub signed_by_name: String,
    pub signed_at: DateTime<Utc>,
}

/// Per-role signing state as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleStatus {
    pub signed: bool,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    RoleNotFound(SignatureRole),
    AlreadySigned(SignatureRole),
    DuplicateRole(SignatureRole),
    InvalidStamp(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::RoleNotFound(role) => write!(f, "No signature placeholder for role {role}"),
            RegistryError::AlreadySigned(role) => write!(f, "Role {role} has already signed"),
            RegistryError::DuplicateRole(role) => {
                write!(f, "Document already has a signature placeholder for role {role}")
            }
            RegistryError::InvalidStamp(msg) => write!(f, "Invalid signature: {msg}"),
        }
    }
}

impl From<RegistryError> for crate::errors::AppError {
    fn from(e: RegistryError) -> Self {
        use crate::errors::AppError;
        match e {
            RegistryError::RoleNotFound(_) => AppError::NotFound,
            RegistryError::AlreadySigned(_) => AppError::Conflict(e.to_string()),
            RegistryError::DuplicateRole(_) | RegistryError::InvalidStamp(_) => {
                AppError::Validation(e.to_string())
            }
        }
    }
}
