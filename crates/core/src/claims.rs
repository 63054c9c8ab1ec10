//! Credential decoding and expiry inspection
//!
//! Only the structure of a credential is validated here. Signatures are the
//! server's business: the browser never holds the signing key.

use crate::clock::Clock;
use crate::role::Role;
use crate::store::CredentialStore;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Reasons a credential cannot be turned into [`Claims`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Malformed credential: expected 3 segments, found {0}")]
    Malformed(usize),

    #[error("Credential payload is not valid base64url: {0}")]
    Base64(String),

    #[error("Credential payload is not a JSON claims object: {0}")]
    Json(String),

    #[error("Credential carries no usable expiry")]
    MissingExpiry,

    #[error("Credential timestamp {0} is out of range")]
    OutOfRange(i64),
}

/// Role claim as issued: usually a single name, occasionally a list
#[derive(Deserialize)]
#[serde(untagged)]
enum RoleClaim {
    One(String),
    Many(Vec<String>),
}

impl RoleClaim {
    fn into_role_name(self) -> Option<String> {
        match self {
            Self::One(name) => Some(name),
            Self::Many(names) => names
                .iter()
                .find(|name| Role::parse(name).is_some())
                .or_else(|| names.first())
                .cloned(),
        }
    }
}

/// Wire shape of the payload; anything not listed is dropped here
#[derive(Deserialize)]
struct RawClaims {
    sub: Option<String>,
    nombre: Option<String>,
    username: Option<String>,
    email: Option<String>,
    roles: Option<RoleClaim>,
    exp: Option<Number>,
    iat: Option<Number>,
}

/// Decoded view of a credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub subject: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    /// Role name exactly as issued; see [`Claims::role`]
    pub role_name: Option<String>,
    pub issued_at: Option<i64>,
    pub expires_at: i64,
}

fn unix_seconds(value: &Number) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v.floor() as i64))
}

/// Timestamps must be representable as dates
fn checked_timestamp(seconds: i64) -> Result<i64, DecodeError> {
    DateTime::from_timestamp(seconds, 0)
        .map(|_| seconds)
        .ok_or(DecodeError::OutOfRange(seconds))
}

/// Decode a credential into its claims without verifying the signature
pub fn decode(credential: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = credential.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(DecodeError::Malformed(segments.len()));
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1].trim_end_matches('='))
        .map_err(|e| DecodeError::Base64(e.to_string()))?;

    let raw: RawClaims =
        serde_json::from_slice(&payload).map_err(|e| DecodeError::Json(e.to_string()))?;

    let expires_at = raw
        .exp
        .as_ref()
        .and_then(unix_seconds)
        .ok_or(DecodeError::MissingExpiry)
        .and_then(checked_timestamp)?;
    let issued_at = raw
        .iat
        .as_ref()
        .and_then(unix_seconds)
        .map(checked_timestamp)
        .transpose()?;

    Ok(Claims {
        subject: raw.sub,
        display_name: raw.nombre,
        username: raw.username,
        email: raw.email,
        role_name: raw.roles.and_then(RoleClaim::into_role_name),
        issued_at,
        expires_at,
    })
}

impl Claims {
    /// Normalised role, `None` when absent or unrecognised
    pub fn role(&self) -> Option<Role> {
        self.role_name.as_deref().and_then(Role::parse)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }

    /// Minutes left before expiry; negative once expired
    pub fn minutes_until_expiry(&self, now: DateTime<Utc>) -> f64 {
        self.expires_at.saturating_sub(now.timestamp()) as f64 / 60.0
    }

    /// Seconds left before expiry, never below zero
    pub fn seconds_remaining(&self, now: DateTime<Utc>) -> i64 {
        self.expires_at.saturating_sub(now.timestamp()).max(0)
    }

    pub fn expiration_date(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at, 0)
    }

    pub fn issued_date(&self) -> Option<DateTime<Utc>> {
        self.issued_at.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }
}

/// Renewal predicate: true when there are no claims to inspect, or when the
/// credential expires within `threshold_minutes`.
///
/// Callers evaluate authentication separately; a missing credential reads as
/// "needs renewal" here and "not authenticated" there.
pub fn expiring_soon(claims: Option<&Claims>, now: DateTime<Utc>, threshold_minutes: i64) -> bool {
    match claims {
        Some(claims) => claims.minutes_until_expiry(now) <= threshold_minutes as f64,
        None => true,
    }
}

/// Flattened copy of the claims kept next to the credential for cheap reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimSnapshot {
    pub id: Option<String>,
    pub nombre: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
}

impl From<&Claims> for ClaimSnapshot {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.subject.clone(),
            nombre: claims.display_name.clone(),
            username: claims.username.clone(),
            email: claims.email.clone(),
            role: claims.role_name.clone(),
            exp: Some(claims.expires_at),
            iat: claims.issued_at,
        }
    }
}

/// Read-only claim queries over the current credential
pub struct ClaimInspector<'a> {
    store: &'a CredentialStore,
    clock: &'a dyn Clock,
}

impl<'a> ClaimInspector<'a> {
    pub fn new(store: &'a CredentialStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Decode the stored credential; absent when missing or undecodable
    pub fn current_claims(&self) -> Option<Claims> {
        self.try_current_claims().ok().flatten()
    }

    /// Like [`Self::current_claims`] but keeps decode failures visible
    pub fn try_current_claims(&self) -> Result<Option<Claims>, DecodeError> {
        self.store.get().as_deref().map(decode).transpose()
    }

    pub fn is_expired(&self, claims: &Claims) -> bool {
        claims.is_expired(self.now())
    }

    pub fn minutes_until_expiry(&self, claims: &Claims) -> f64 {
        claims.minutes_until_expiry(self.now())
    }

    pub fn expiring_soon(&self, threshold_minutes: i64) -> bool {
        expiring_soon(self.current_claims().as_ref(), self.now(), threshold_minutes)
    }

    /// Seconds until the current credential expires, zero when there is none
    pub fn seconds_remaining(&self) -> i64 {
        self.current_claims()
            .map(|claims| claims.seconds_remaining(self.now()))
            .unwrap_or(0)
    }

    /// Whether the credential expires within `minutes`, counting a missing
    /// credential as already expired
    pub fn will_expire_within(&self, minutes: i64) -> bool {
        self.seconds_remaining() <= minutes * 60
    }
}
