//! Secrets loaded from environment variables (normally via `.env`).
//!
//! Secrets never live in `config.toml`; they are read once at startup and
//! passed into the HTTP state.

use crate::errors::{Error, Result};

/// Secrets required to issue tokens and gate admin enrollment.
#[derive(Clone)]
pub struct Secrets {
    /// HMAC key for session tokens (`JWT_SECRET`)
    pub jwt_secret: String,
    /// Shared code admins must present (`ADMIN_SECRET_CODE`)
    pub admin_code: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("jwt_secret", &"<redacted>")
            .field("admin_code", &self.admin_code.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Secrets {
    /// Reads `JWT_SECRET` (required) and `ADMIN_SECRET_CODE` (optional) from the environment.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET").map_err(|e| Error::Config {
            message: format!("JWT_SECRET not available: {e}"),
        })?;
        if jwt_secret.trim().is_empty() {
            return Err(Error::Config {
                message: "JWT_SECRET must not be empty".to_string(),
            });
        }

        let admin_code = std::env::var("ADMIN_SECRET_CODE")
            .ok()
            .filter(|code| !code.is_empty());

        Ok(Self {
            jwt_secret,
            admin_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let secrets = Secrets {
            jwt_secret: "super-secret".to_string(),
            admin_code: Some("letmein".to_string()),
        };
        let rendered = format!("{secrets:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("letmein"));
    }
}
