use askama::Template;

/// Public signing page for a live link.
#[derive(Template)]
#[template(path = "sign/page.html")]
pub struct SignPageTemplate {
    pub token: String,
    pub title: String,
    pub role_label: String,
    pub signer_name: String,
    /// Pre-escaped document body.
    pub body_html: String,
    pub errors: Vec<String>,
}

/// Shown for unknown, used or otherwise dead links. Says nothing about which.
#[derive(Template)]
#[template(path = "sign/unavailable.html")]
pub struct SignUnavailableTemplate;

#[derive(Template)]
#[template(path = "sign/complete.html")]
pub struct SignCompleteTemplate {
    pub title: String,
    pub role_label: String,
    pub fully_signed: bool,
}

/// Read-only view for the holder of a used link.
#[derive(Template)]
#[template(path = "sign/signed.html")]
pub struct SignedViewTemplate {
    pub title: String,
    pub role_label: String,
    pub body_html: String,
}
