// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Binds Spotify identities to local users and hands out sign-in links.
//!
//! Find-or-create is keyed on the email index, which is written create-only:
//! two concurrent logins for a new email both end up with the same user.

use crate::db::Database;
use crate::error::AppError;
use crate::models::{
    email_key, EmailIndex, ExternalIdentity, LocalUser, SignInLinkRecord, TokenRecord,
};
use crate::time_utils::{expiry_after, format_utc_rfc3339};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// JWT audience for one-time sign-in links.
pub const SIGN_IN_AUDIENCE: &str = "judgify-sign-in";

/// How long a sign-in link stays valid.
const SIGN_IN_LINK_TTL_SECS: i64 = 5 * 60;

/// Claims carried by a sign-in link token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignInClaims {
    /// Email the link is scoped to
    pub email: String,
    /// Unique link ID (consumed once)
    pub jti: String,
    /// Where to send the browser after sign-in
    pub redirect_to: String,
    pub aud: String,
    pub iat: usize,
    pub exp: usize,
}

/// Identity binding and token persistence.
#[derive(Clone)]
pub struct SessionBinder {
    db: Database,
    signing_key: Vec<u8>,
    api_url: String,
}

impl SessionBinder {
    pub fn new(db: Database, signing_key: Vec<u8>, api_url: String) -> Self {
        Self {
            db,
            signing_key,
            api_url,
        }
    }

    // ─── Users ───────────────────────────────────────────────────

    /// Resolve the local user for an email, creating one if the email is new.
    pub async fn resolve_or_create_user(
        &self,
        identity: &ExternalIdentity,
    ) -> Result<LocalUser, AppError> {
        let key = email_key(&identity.email);

        if let Some(user) = self.lookup_by_key(&key, identity).await? {
            tracing::info!(user_id = %user.id, "Existing user found");
            return Ok(user);
        }

        let now = format_utc_rfc3339(Utc::now());
        let user = LocalUser::from_identity(identity, &now);
        let index = EmailIndex {
            user_id: user.id.clone(),
            email: identity.email.clone(),
        };

        let claimed = self
            .db
            .insert_email_index(&key, &index)
            .await
            .map_err(|e| AppError::UserCreation(e.to_string()))?;

        if !claimed {
            // Another login created this email between our read and insert.
            tracing::info!("Email claimed concurrently, using existing user");
            return self
                .lookup_by_key(&key, identity)
                .await?
                .ok_or_else(|| AppError::UserLookup("Email index vanished".to_string()));
        }

        self.db
            .upsert_user(&user)
            .await
            .map_err(|e| AppError::UserCreation(e.to_string()))?;

        tracing::info!(user_id = %user.id, "New user created");
        Ok(user)
    }

    /// Find a user through the email index.
    ///
    /// An index entry whose user document is missing (a write that failed
    /// halfway) is repaired by writing the user under the indexed ID.
    async fn lookup_by_key(
        &self,
        key: &str,
        identity: &ExternalIdentity,
    ) -> Result<Option<LocalUser>, AppError> {
        let index = match self
            .db
            .get_email_index(key)
            .await
            .map_err(|e| AppError::UserLookup(e.to_string()))?
        {
            Some(index) => index,
            None => return Ok(None),
        };

        if let Some(user) = self
            .db
            .get_user(&index.user_id)
            .await
            .map_err(|e| AppError::UserLookup(e.to_string()))?
        {
            return Ok(Some(user));
        }

        tracing::warn!(user_id = %index.user_id, "Email index without user, repairing");
        let mut user = LocalUser::from_identity(identity, &format_utc_rfc3339(Utc::now()));
        user.id = index.user_id;
        self.db
            .upsert_user(&user)
            .await
            .map_err(|e| AppError::UserCreation(e.to_string()))?;
        Ok(Some(user))
    }

    /// Look up an existing user by email without creating one.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<LocalUser>, AppError> {
        match self.db.get_email_index(&email_key(email)).await? {
            Some(index) => self.db.get_user(&index.user_id).await,
            None => Ok(None),
        }
    }

    // ─── Tokens ──────────────────────────────────────────────────

    /// Upsert the token record for a user, expiring `expires_in` seconds from now.
    pub async fn persist_tokens(
        &self,
        user_id: &str,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> Result<TokenRecord, AppError> {
        persist_tokens(&self.db, user_id, access_token, refresh_token, expires_in).await
    }

    // ─── Sign-in Links ───────────────────────────────────────────

    /// Mint a one-time sign-in link for an email.
    pub fn issue_sign_in_link(&self, email: &str, redirect_to: &str) -> Result<String, AppError> {
        if self.signing_key.is_empty() {
            return Err(AppError::LinkGeneration("Signing key not configured".to_string()));
        }

        let now = Utc::now().timestamp() as usize;
        let claims = SignInClaims {
            email: email.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            redirect_to: redirect_to.to_string(),
            aud: SIGN_IN_AUDIENCE.to_string(),
            iat: now,
            exp: now + SIGN_IN_LINK_TTL_SECS as usize,
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| AppError::LinkGeneration(e.to_string()))?;

        Ok(format!("{}/auth/verify?token={}", self.api_url, token))
    }

    /// Consume a sign-in link token.
    ///
    /// Returns the user and the redirect target. A link can be used once.
    pub async fn consume_sign_in_link(&self, token: &str) -> Result<(LocalUser, String), AppError> {
        let claims = self.decode_sign_in_token(token)?;

        let record = SignInLinkRecord {
            jti: claims.jti.clone(),
            email: claims.email.clone(),
            consumed_at: format_utc_rfc3339(Utc::now()),
        };
        if !self.db.consume_sign_in_link(&record).await? {
            tracing::warn!(jti = %claims.jti, "Sign-in link reused");
            return Err(AppError::InvalidToken);
        }

        let user = self
            .find_user_by_email(&claims.email)
            .await?
            .ok_or_else(|| AppError::NotFound("User for sign-in link".to_string()))?;

        Ok((user, claims.redirect_to))
    }

    fn decode_sign_in_token(&self, token: &str) -> Result<SignInClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SIGN_IN_AUDIENCE]);

        decode::<SignInClaims>(token, &DecodingKey::from_secret(&self.signing_key), &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected sign-in token");
                AppError::InvalidToken
            })
    }
}

/// Upsert a user's token record, keyed by user ID. Idempotent.
///
/// Fails with [`AppError::TokenLifetime`] without writing if `expires_in`
/// does not produce a representable expiry.
pub async fn persist_tokens(
    db: &Database,
    user_id: &str,
    access_token: &str,
    refresh_token: &str,
    expires_in: i64,
) -> Result<TokenRecord, AppError> {
    let now = Utc::now();
    let expires_at = expiry_after(now, expires_in).ok_or(AppError::TokenLifetime(expires_in))?;
    let record = TokenRecord {
        user_id: user_id.to_string(),
        access_token: access_token.to_string(),
        refresh_token: refresh_token.to_string(),
        expires_at,
        updated_at: format_utc_rfc3339(now),
    };

    db.set_tokens(&record).await?;
    tracing::debug!(user_id, expires_at = %record.expires_at, "Tokens stored");
    Ok(record)
}
