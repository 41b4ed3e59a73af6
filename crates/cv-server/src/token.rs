//! Stateless signed credential tokens.
//!
//! A token is `base64url(claims-json) . base64url(hmac-sha256(payload))`.
//! Claims carry the user id, email, issue time, and a fixed expiry set at
//! issuance. Nothing is persisted server-side; verification is pure
//! signature + expiry checking, so any number of consumers can validate
//! tokens without coordination.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use cv_core::{Error, Result, UserId};

type HmacSha256 = Hmac<Sha256>;

/// Claim set embedded in a credential token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the authenticated user.
    pub sub: UserId,
    /// Email at time of issuance.
    pub email: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds. Fixed at issuance.
    pub exp: i64,
}

/// Signs and verifies credential tokens with a shared HMAC secret.
pub struct TokenIssuer {
    secret: Vec<u8>,
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Create an issuer from the signing secret and token lifetime.
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            secret: secret.as_bytes().to_vec(),
            ttl_secs: (ttl_hours * 3600) as i64,
        }
    }

    /// Issue a token for `user_id` expiring `ttl` from now.
    pub fn issue(&self, user_id: UserId, email: &str) -> Result<String> {
        self.issue_at(user_id, email, Utc::now().timestamp())
    }

    /// Issue a token with an explicit issue time (unix seconds).
    pub fn issue_at(&self, user_id: UserId, email: &str, iat: i64) -> Result<String> {
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat,
            exp: iat + self.ttl_secs,
        };

        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| Error::Internal(format!("claims serialization failed: {e}")))?,
        );

        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Internal(format!("invalid HMAC key: {e}")))?;
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{payload}.{signature}"))
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify against an explicit current time (unix seconds).
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| Error::Unauthorized("invalid token".into()))?;

        let sig_bytes = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Error::Unauthorized("invalid token".into()))?;

        // Constant-time signature comparison.
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| Error::Internal(format!("invalid HMAC key: {e}")))?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig_bytes)
            .map_err(|_| Error::Unauthorized("invalid token".into()))?;

        let claims_json = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Error::Unauthorized("invalid token".into()))?;
        let claims: Claims = serde_json::from_slice(&claims_json)
            .map_err(|_| Error::Unauthorized("invalid token".into()))?;

        if now >= claims.exp {
            return Err(Error::Unauthorized("token expired".into()));
        }

        Ok(claims)
    }
}
