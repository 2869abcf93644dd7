// src/session.rs
use axum::http::{header, HeaderMap, HeaderValue};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64_URL, Engine as _};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::monitors::MonitorProfile;

pub const SESSION_COOKIE: &str = "buscativa_session";
pub const FLASH_COOKIE: &str = "buscativa_flash";
/// Longest session lifetime honoured; larger settings are clamped.
pub const MAX_SESSION_TTL_HOURS: u64 = 24 * 366;

/// Who is logged in. Lives only in the signed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionIdentity {
    pub username: String,
    pub full_name: String,
    pub shift: String,
}

impl From<MonitorProfile> for SessionIdentity {
    fn from(profile: MonitorProfile) -> Self {
        Self {
            username: profile.username,
            full_name: profile.full_name,
            shift: profile.shift,
        }
    }
}

// JWT claims
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,   // Monitor username
    name: String,  // Display name
    shift: String, // Turno
    exp: i64,      // Expiration time
}

/// Signs and verifies session tokens with the configured secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: u64,
}

impl std::fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKeys")
            .field("ttl_hours", &self.ttl_hours)
            .finish_non_exhaustive()
    }
}

impl SessionKeys {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        let ttl_hours = if ttl_hours > MAX_SESSION_TTL_HOURS {
            warn!(
                "SESSION_TTL_HOURS={} is too large, using {}",
                ttl_hours, MAX_SESSION_TTL_HOURS
            );
            MAX_SESSION_TTL_HOURS
        } else {
            ttl_hours
        };
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, identity: &SessionIdentity) -> Result<String, AppError> {
        let exp = chrono::Utc::now()
            .checked_add_signed(
                chrono::TimeDelta::try_hours(self.ttl_hours as i64).unwrap_or_default(),
            )
            .unwrap_or_else(chrono::Utc::now)
            .timestamp();
        let claims = Claims {
            sub: identity.username.clone(),
            name: identity.full_name.clone(),
            shift: identity.shift.clone(),
            exp,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// `None` for missing, tampered or expired tokens.
    pub fn verify(&self, token: &str) -> Option<SessionIdentity> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => Some(SessionIdentity {
                username: data.claims.sub,
                full_name: data.claims.name,
                shift: data.claims.shift,
            }),
            Err(e) => {
                debug!("Rejecting session token: {}", e);
                None
            }
        }
    }

    pub fn identity_from_headers(&self, headers: &HeaderMap) -> Option<SessionIdentity> {
        read_cookie(headers, SESSION_COOKIE).and_then(|token| self.verify(&token))
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_hours * 60 * 60
    }
}

// --- Flash messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Danger,
    Warning,
    Info,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Danger => "danger",
            FlashLevel::Warning => "warning",
            FlashLevel::Info => "info",
        }
    }
}

/// One-shot status message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn encode(&self) -> String {
        // Serializing a struct of plain strings cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        BASE64_URL.encode(json)
    }

    pub fn decode(value: &str) -> Option<Self> {
        let bytes = BASE64_URL.decode(value).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        read_cookie(headers, FLASH_COOKIE).and_then(|value| Flash::decode(&value))
    }
}

// --- Cookies ---

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

pub fn set_cookie(name: &str, value: &str, max_age_secs: u64) -> HeaderValue {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age_secs
    );
    // Names are constants and values are JWT or base64url text.
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}

pub fn clear_cookie(name: &str) -> HeaderValue {
    set_cookie(name, "", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> SessionIdentity {
        SessionIdentity {
            username: "jsilva".to_string(),
            full_name: "João Silva".to_string(),
            shift: "Manhã".to_string(),
        }
    }

    #[test]
    fn test_session_token_round_trip() {
        let keys = SessionKeys::new("segredo", 12);
        let token = keys.issue(&identity()).unwrap();
        assert_eq!(keys.verify(&token), Some(identity()));
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let token = SessionKeys::new("segredo", 12).issue(&identity()).unwrap();
        assert_eq!(SessionKeys::new("outro", 12).verify(&token), None);
    }

    #[test]
    fn test_oversized_ttl_is_clamped() {
        let keys = SessionKeys::new("segredo", 10_000_000_000_000);
        assert_eq!(keys.ttl_secs(), MAX_SESSION_TTL_HOURS * 60 * 60);
        let token = keys.issue(&identity()).unwrap();
        assert_eq!(keys.verify(&token), Some(identity()));
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert_eq!(SessionKeys::new("segredo", 12).verify("not-a-token"), None);
    }

    #[test]
    fn test_identity_read_from_cookie_header() {
        let keys = SessionKeys::new("segredo", 12);
        let token = keys.issue(&identity()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {}={}", SESSION_COOKIE, token)).unwrap(),
        );
        assert_eq!(keys.identity_from_headers(&headers), Some(identity()));
    }

    #[test]
    fn test_flash_cookie_round_trip_keeps_accents() {
        let flash = Flash::new(FlashLevel::Danger, "Usuário ou senha inválidos");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("{}={}", FLASH_COOKIE, flash.encode())).unwrap(),
        );
        assert_eq!(Flash::from_headers(&headers), Some(flash));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let value = clear_cookie(SESSION_COOKIE);
        assert_eq!(
            value.to_str().unwrap(),
            "buscativa_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0"
        );
    }
}
