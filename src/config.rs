use std::time::Duration;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_RESEND_COOLDOWN_SECS: u64 = 60;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const MIN_SESSION_KEY_LEN: usize = 64;

/// Runtime configuration, read from the environment (and `.env` when present).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Prefix for signing links handed to tenants and witnesses.
    pub public_base_url: String,
    pub session_key: Option<String>,
    pub resend_cooldown: Duration,
    pub db_max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup, so tests don't touch process env.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set".to_string())?;

        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let session_key = match lookup("SESSION_KEY") {
            Some(val) if val.len() >= MIN_SESSION_KEY_LEN => Some(val),
            Some(val) => {
                log::warn!(
                    "SESSION_KEY too short ({} bytes, need {}+); generating a random key",
                    val.len(),
                    MIN_SESSION_KEY_LEN
                );
                None
            }
            None => None,
        };

        let resend_cooldown_secs = parse_or(&lookup, "RESEND_COOLDOWN_SECS", DEFAULT_RESEND_COOLDOWN_SECS)?;
        let db_max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;

        Ok(AppConfig {
            database_url,
            bind_addr,
            public_base_url,
            session_key,
            resend_cooldown: Duration::from_secs(resend_cooldown_secs),
            db_max_connections,
        })
    }

    /// Capability link for a signing token.
    pub fn signing_url(&self, token: &str) -> String {
        format!("{}/sign/{}", self.public_base_url, token)
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, String> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{key} must be a number, got '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/lease")])).unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8080");
        assert_eq!(cfg.resend_cooldown, Duration::from_secs(60));
        assert_eq!(cfg.db_max_connections, 8);
        assert!(cfg.session_key.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.contains("DATABASE_URL"));
    }

    #[test]
    fn short_session_key_is_discarded() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/lease"),
            ("SESSION_KEY", "short"),
        ]))
        .unwrap();
        assert!(cfg.session_key.is_none());
    }

    #[test]
    fn bad_cooldown_is_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/lease"),
            ("RESEND_COOLDOWN_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.contains("RESEND_COOLDOWN_SECS"));
    }

    #[test]
    fn signing_url_strips_trailing_slash() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/lease"),
            ("PUBLIC_BASE_URL", "https://leases.example.com/"),
        ]))
        .unwrap();
        assert_eq!(cfg.signing_url("abc123"), "https://leases.example.com/sign/abc123");
    }
}
