//! Session issuing and verification.
//!
//! A session is a self-contained HS256 token carrying the user id, issue time,
//! expiry, a unique token id (`jti`) and a session id (`sid`). Tokens cannot
//! be forged without the server secret.
//!
//! `sid` is fixed at login and copied into every token a rolling refresh
//! mints, so all tokens of one login share it. Logout records the `sid` in
//! `revoked_sessions`, which ends every token of that session at once. The
//! entry is kept until the newest token the session could have been issued
//! has expired.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub secret: String,
    /// Idle window: an unused session expires this long after it was issued.
    pub ttl: Duration,
    /// A verified session is re-issued once less than this much lifetime remains.
    pub refresh_window: Duration,
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
    /// Session id, shared by every token minted from one login.
    pub sid: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::UNIX_EPOCH)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    refresh_window: Duration,
    cookie_secure: bool,
    db: SqlitePool,
}

impl SessionManager {
    pub fn new(settings: &SessionSettings, db: SqlitePool) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl: settings.ttl,
            refresh_window: settings.refresh_window,
            cookie_secure: settings.cookie_secure,
            db,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    #[tracing::instrument(skip(self))]
    pub fn issue(&self, user_id: &str) -> Result<IssuedSession, AppError> {
        self.issue_at(user_id, Utc::now())
    }

    fn issue_at(&self, user_id: &str, now: DateTime<Utc>) -> Result<IssuedSession, AppError> {
        self.mint(user_id, Uuid::new_v4().to_string(), now)
    }

    fn mint(&self, user_id: &str, sid: String, now: DateTime<Utc>) -> Result<IssuedSession, AppError> {
        let claims = Claims {
            sub: user_id.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
            sid,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        tracing::debug!(sid = %claims.sid, jti = %claims.jti, "session token minted");
        Ok(IssuedSession { token, claims })
    }

    /// Resolves a token to its claims. Missing, malformed, tampered, expired
    /// and revoked tokens all fail with `Unauthenticated`.
    #[tracing::instrument(skip_all)]
    pub async fn verify(&self, token: &str) -> Result<Claims, AppError> {
        if token.is_empty() {
            return Err(AppError::Unauthenticated);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "session token rejected");
            AppError::Unauthenticated
        })?;

        if self.is_revoked(&data.claims.sid).await? {
            tracing::debug!(sid = %data.claims.sid, "revoked session presented");
            return Err(AppError::Unauthenticated);
        }

        Ok(data.claims)
    }

    /// Mints a replacement token for the same session when it is inside its
    /// refresh window.
    pub fn refresh(&self, claims: &Claims) -> Result<Option<IssuedSession>, AppError> {
        self.refresh_at(claims, Utc::now())
    }

    fn refresh_at(
        &self,
        claims: &Claims,
        now: DateTime<Utc>,
    ) -> Result<Option<IssuedSession>, AppError> {
        if claims.expires_at() - now >= self.refresh_window {
            return Ok(None);
        }
        self.mint(&claims.sub, claims.sid.clone(), now).map(Some)
    }

    /// Ends the whole session `claims` belongs to, including tokens minted
    /// for it by earlier refreshes.
    pub async fn revoke(&self, claims: &Claims) -> Result<(), AppError> {
        self.revoke_at(claims, Utc::now()).await
    }

    #[tracing::instrument(skip_all, fields(sid = %claims.sid))]
    async fn revoke_at(&self, claims: &Claims, now: DateTime<Utc>) -> Result<(), AppError> {
        // No token of this session can outlive the later of these two.
        let expires_at = claims.exp.max((now + self.ttl).timestamp());

        sqlx::query(
            "INSERT INTO revoked_sessions (sid, expires_at) VALUES (?, ?) \
             ON CONFLICT (sid) DO UPDATE SET expires_at = MAX(expires_at, excluded.expires_at)",
        )
        .bind(&claims.sid)
        .bind(expires_at)
        .execute(&self.db)
        .await?;
        tracing::info!(user_id = %claims.sub, "session revoked");
        Ok(())
    }

    async fn is_revoked(&self, sid: &str) -> Result<bool, AppError> {
        let hit: Option<i64> = sqlx::query_scalar("SELECT 1 FROM revoked_sessions WHERE sid = ?")
            .bind(sid)
            .fetch_optional(&self.db)
            .await?;
        Ok(hit.is_some())
    }

    /// Drops denylist entries whose sessions have expired anyway.
    pub async fn prune_revoked(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM revoked_sessions WHERE expires_at < ?")
            .bind(Utc::now().timestamp())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
