// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Users (local accounts) and the email uniqueness index
//! - Tokens (Spotify OAuth tokens, one document per user)
//! - Sign-in links (one-time consumption markers)

use crate::db::collections;
use crate::error::AppError;
use crate::models::{EmailIndex, LocalUser, SignInLinkRecord, TokenRecord};
use firestore::errors::FirestoreError;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator rejects real credentials; connect unauthenticated instead.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Get a user by local ID.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<LocalUser>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or update a user.
    pub async fn upsert_user(&self, user: &LocalUser) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(&user.id)
            .object(user)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get the email index entry for a normalized email key.
    pub async fn get_email_index(&self, key: &str) -> Result<Option<EmailIndex>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USER_EMAILS)
            .obj()
            .one(key)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Claim an email for a user. Returns `false` if the email is already claimed.
    pub async fn insert_email_index(
        &self,
        key: &str,
        index: &EmailIndex,
    ) -> Result<bool, AppError> {
        let result: Result<EmailIndex, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::USER_EMAILS)
            .document_id(key)
            .object(index)
            .execute()
            .await;

        create_only(result)
    }

    // ─── Token Operations ────────────────────────────────────────

    /// Get tokens for a user.
    pub async fn get_tokens(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::TOKENS)
            .obj()
            .one(user_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Upsert tokens keyed by user ID.
    pub async fn set_tokens(&self, tokens: &TokenRecord) -> Result<(), AppError> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::TOKENS)
            .document_id(&tokens.user_id)
            .object(tokens)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Sign-in Link Operations ─────────────────────────────────

    /// Record a sign-in link as consumed. Returns `false` if it already was.
    pub async fn consume_sign_in_link(&self, record: &SignInLinkRecord) -> Result<bool, AppError> {
        let result: Result<SignInLinkRecord, FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collections::SIGN_IN_LINKS)
            .document_id(&record.jti)
            .object(record)
            .execute()
            .await;

        create_only(result)
    }
}

/// Map a create-only insert result: conflict means the document already existed.
fn create_only<T>(result: Result<T, FirestoreError>) -> Result<bool, AppError> {
    match result {
        Ok(_) => Ok(true),
        Err(FirestoreError::DataConflictError(_)) => Ok(false),
        Err(e) => Err(AppError::Database(e.to_string())),
    }
}
