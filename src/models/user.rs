// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User, identity and token models for storage.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Profile snapshot returned by Spotify's `/v1/me`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Spotify user ID
    pub external_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

/// Local user stored in Firestore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalUser {
    /// UUID (also used as document ID)
    pub id: String,
    pub email: String,
    /// Always true: the email was verified by Spotify
    pub email_confirmed: bool,
    pub metadata: UserMetadata,
    /// When the user first connected (ISO 8601)
    pub created_at: String,
}

/// Provider details carried on the local user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Spotify user ID
    pub external_id: String,
    pub display_name: Option<String>,
}

impl LocalUser {
    /// Mint a new local user for an external identity.
    pub fn from_identity(identity: &ExternalIdentity, now: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            email_confirmed: true,
            metadata: UserMetadata {
                external_id: identity.external_id.clone(),
                display_name: identity.display_name.clone(),
            },
            created_at: now.to_string(),
        }
    }
}

/// Email uniqueness record, keyed by [`email_key`].
///
/// Created with create-only semantics, so at most one user can claim an email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailIndex {
    pub user_id: String,
    pub email: String,
}

/// Document key for an email address: hex SHA-256 of the normalized address.
pub fn email_key(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Spotify OAuth tokens for one user (one record per user ID).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Local user ID (also used as document ID)
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    /// When the access token expires (ISO 8601)
    pub expires_at: String,
    #[serde(default)]
    pub updated_at: String,
}

/// Consumption marker for a one-time sign-in link, keyed by the link's `jti`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInLinkRecord {
    pub jti: String,
    pub email: String,
    pub consumed_at: String,
}
