use std::collections::HashMap;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    /// Bearer token → owner. Parsed from `AUTH_TOKENS="alice=tok1,bob=tok2"`.
    pub auth_tokens: HashMap<String, String>,
    /// Leading segment of every key written to the key-value store.
    pub kv_namespace: String,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<usize>()
            .context("MAX_UPLOAD_MB must be a whole number of megabytes")?;

        Ok(Config {
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            auth_tokens: parse_auth_tokens(&require_env("AUTH_TOKENS")?)?,
            kv_namespace: std::env::var("KV_NAMESPACE").unwrap_or_else(|_| "atsly".to_string()),
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Parses `owner=token` pairs separated by commas into a token → owner map.
fn parse_auth_tokens(raw: &str) -> Result<HashMap<String, String>> {
    let mut tokens = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let Some((owner, token)) = pair.split_once('=') else {
            bail!("AUTH_TOKENS entry '{pair}' must look like owner=token");
        };
        let (owner, token) = (owner.trim(), token.trim());
        if owner.is_empty() || token.is_empty() {
            bail!("AUTH_TOKENS entry '{pair}' has an empty owner or token");
        }
        if owner.contains(':') {
            bail!("AUTH_TOKENS owner '{owner}' must not contain ':'");
        }
        tokens.insert(token.to_string(), owner.to_string());
    }
    if tokens.is_empty() {
        bail!("AUTH_TOKENS must define at least one owner=token pair");
    }
    Ok(tokens)
}
