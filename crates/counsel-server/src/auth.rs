//! Bearer tokens: HS256 JWT issuance, verification and the [`AuthUser`]
//! extractor.
//!
//! Verification always checks the signature, the issuer and the expiry.
//! Only `token_use = access` tokens authorise API calls; ID tokens are for
//! the client's own use.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use counsel_core::account::Account;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AppState, Store, error::ApiError};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
  /// HMAC secret shared by issuer and verifier.
  pub secret:   String,
  #[serde(default = "default_issuer")]
  pub issuer:   String,
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: i64,
}

fn default_issuer() -> String { "counsel".into() }

fn default_ttl_secs() -> i64 { 3600 }

// ─── Claims ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenUse {
  Access,
  Id,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Account id; used as the `user_id` of chat messages.
  pub sub:       String,
  pub email:     String,
  pub name:      String,
  pub token_use: TokenUse,
  pub iss:       String,
  pub iat:       i64,
  pub exp:       i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
  #[error("failed to sign token: {0}")]
  Sign(#[source] jsonwebtoken::errors::Error),

  #[error("invalid token: {0}")]
  Invalid(#[source] jsonwebtoken::errors::Error),
}

/// The pair returned by a successful sign-in.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
  pub access_token: String,
  pub id_token:     String,
}

// ─── Keys ────────────────────────────────────────────────────────────────────

pub struct TokenKeys {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  issuer:     String,
  ttl:        Duration,
}

impl TokenKeys {
  pub fn new(config: &TokenConfig) -> Self {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_required_spec_claims(&["exp", "iat", "iss", "sub"]);
    validation.set_issuer(std::slice::from_ref(&config.issuer));
    validation.validate_exp = true;
    validation.validate_aud = false;

    Self {
      encoding: EncodingKey::from_secret(config.secret.as_bytes()),
      decoding: DecodingKey::from_secret(config.secret.as_bytes()),
      validation,
      issuer: config.issuer.clone(),
      ttl: Duration::seconds(config.ttl_secs),
    }
  }

  pub fn issue(
    &self,
    account: &Account,
    token_use: TokenUse,
    now: DateTime<Utc>,
  ) -> Result<String, TokenError> {
    let claims = Claims {
      sub: account.user_id.to_string(),
      email: account.email.clone(),
      name: account.name.clone(),
      token_use,
      iss: self.issuer.clone(),
      iat: now.timestamp(),
      exp: (now + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(TokenError::Sign)
  }

  pub fn issue_pair(&self, account: &Account) -> Result<TokenPair, TokenError> {
    let now = Utc::now();
    Ok(TokenPair {
      access_token: self.issue(account, TokenUse::Access, now)?,
      id_token:     self.issue(account, TokenUse::Id, now)?,
    })
  }

  /// Check signature, issuer and expiry, and return the claims.
  pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map(|data| data.claims)
      .map_err(TokenError::Invalid)
  }
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller, taken from a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
  pub fn user_id(&self) -> &str { &self.0.sub }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

/// Verify the bearer token in `headers` as an access token.
pub fn authenticate(headers: &HeaderMap, keys: &TokenKeys) -> Result<AuthUser, ApiError> {
  let token = bearer(headers).ok_or(ApiError::Unauthorized)?;
  let claims = keys.verify(token).map_err(|e| {
    tracing::debug!(error = %e, "rejected bearer token");
    ApiError::Unauthorized
  })?;

  if claims.token_use != TokenUse::Access {
    tracing::debug!(sub = %claims.sub, "rejected non-access token");
    return Err(ApiError::Unauthorized);
  }
  Ok(AuthUser(claims))
}

impl<S: Store> FromRequestParts<AppState<S>> for AuthUser {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    authenticate(&parts.headers, &state.tokens)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;
  use uuid::Uuid;

  use super::*;

  fn config(secret: &str) -> TokenConfig {
    TokenConfig { secret: secret.into(), issuer: "counsel".into(), ttl_secs: 3600 }
  }

  fn account() -> Account {
    Account {
      user_id:       Uuid::new_v4(),
      email:         "ada@example.com".into(),
      name:          "Ada".into(),
      password_hash: String::new(),
      verified:      true,
      created_at:    Utc::now(),
    }
  }

  fn headers(token: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}")).unwrap());
    h
  }

  #[test]
  fn issued_access_token_verifies() {
    let keys = TokenKeys::new(&config("s3cret"));
    let acct = account();
    let pair = keys.issue_pair(&acct).unwrap();

    let user = authenticate(&headers(&pair.access_token), &keys).unwrap();
    assert_eq!(user.user_id(), acct.user_id.to_string());
    assert_eq!(user.0.email, "ada@example.com");
  }

  #[test]
  fn id_token_does_not_authorise() {
    let keys = TokenKeys::new(&config("s3cret"));
    let pair = keys.issue_pair(&account()).unwrap();

    assert!(keys.verify(&pair.id_token).is_ok());
    assert!(matches!(
      authenticate(&headers(&pair.id_token), &keys),
      Err(ApiError::Unauthorized)
    ));
  }

  #[test]
  fn foreign_signature_is_rejected() {
    let forger = TokenKeys::new(&config("attacker"));
    let keys = TokenKeys::new(&config("s3cret"));
    let forged = forger.issue(&account(), TokenUse::Access, Utc::now()).unwrap();

    assert!(keys.verify(&forged).is_err());
  }

  #[test]
  fn expired_token_is_rejected() {
    let keys = TokenKeys::new(&config("s3cret"));
    let old = keys
      .issue(&account(), TokenUse::Access, Utc::now() - Duration::hours(3))
      .unwrap();
    assert!(keys.verify(&old).is_err());
  }

  #[test]
  fn wrong_issuer_is_rejected() {
    let other = TokenKeys::new(&TokenConfig {
      secret:   "s3cret".into(),
      issuer:   "someone-else".into(),
      ttl_secs: 3600,
    });
    let keys = TokenKeys::new(&config("s3cret"));
    let token = other.issue(&account(), TokenUse::Access, Utc::now()).unwrap();
    assert!(keys.verify(&token).is_err());
  }

  #[test]
  fn missing_or_malformed_header() {
    let keys = TokenKeys::new(&config("s3cret"));
    assert!(authenticate(&HeaderMap::new(), &keys).is_err());

    let mut basic = HeaderMap::new();
    basic.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert!(authenticate(&basic, &keys).is_err());
    assert!(authenticate(&headers("not.a.jwt"), &keys).is_err());
  }
}
