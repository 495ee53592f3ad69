use std::env;

use crate::secret::SecretString;

/// Settings for the serving collaborators (HTTPS listener, TLS material,
/// session auth), read from the environment. The polling core itself only
/// consumes device descriptors.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
    pub cert_file: String,
    pub key_file: String,
    pub jwt_secret: SecretString,
    pub cookie_secure: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            db_path: env_or("DB_PATH", "./switches.db"),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            cert_file: env_or("CERT_FILE", "server.crt"),
            key_file: env_or("KEY_FILE", "server.key"),
            jwt_secret: SecretString::new(env::var("JWT_SECRET").unwrap_or_default()),
            cookie_secure: env::var("COOKIE_SECURE")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}
