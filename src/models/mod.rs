pub mod lease_document;
pub mod signature;
pub mod signing_token;
pub mod template;
pub mod tenancy;
