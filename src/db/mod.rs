// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, or in-memory for development and tests).

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::{Fault, MemoryDb};

use crate::config::{Config, StorageBackend};
use crate::error::AppError;
use crate::models::{EmailIndex, LocalUser, SignInLinkRecord, TokenRecord};
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Email uniqueness index (keyed by hashed normalized email)
    pub const USER_EMAILS: &str = "user_emails";
    pub const TOKENS: &str = "tokens";
    /// Consumed one-time sign-in links (keyed by jti)
    pub const SIGN_IN_LINKS: &str = "sign_in_links";
}

/// Storage handle shared by all request handlers.
#[derive(Clone)]
pub enum Database {
    Firestore(FirestoreDb),
    Memory(Arc<MemoryDb>),
}

impl Database {
    /// Connect to the backend selected in config.
    pub async fn connect(config: &Config) -> Result<Self, AppError> {
        match config.storage {
            StorageBackend::Firestore => {
                Ok(Self::Firestore(FirestoreDb::new(&config.gcp_project_id).await?))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                Ok(Self::in_memory())
            }
        }
    }

    /// Fresh, empty in-memory database.
    pub fn in_memory() -> Self {
        Self::Memory(Arc::new(MemoryDb::default()))
    }

    // ─── User Operations ─────────────────────────────────────────

    pub async fn get_user(&self, user_id: &str) -> Result<Option<LocalUser>, AppError> {
        match self {
            Self::Firestore(db) => db.get_user(user_id).await,
            Self::Memory(db) => Ok(db.get_user(user_id)),
        }
    }

    pub async fn upsert_user(&self, user: &LocalUser) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.upsert_user(user).await,
            Self::Memory(db) => db.upsert_user(user),
        }
    }

    pub async fn get_email_index(&self, key: &str) -> Result<Option<EmailIndex>, AppError> {
        match self {
            Self::Firestore(db) => db.get_email_index(key).await,
            Self::Memory(db) => db.get_email_index(key),
        }
    }

    /// Create-only insert. Returns `false` if the key was already claimed.
    pub async fn insert_email_index(
        &self,
        key: &str,
        index: &EmailIndex,
    ) -> Result<bool, AppError> {
        match self {
            Self::Firestore(db) => db.insert_email_index(key, index).await,
            Self::Memory(db) => db.insert_email_index(key, index),
        }
    }

    // ─── Token Operations ────────────────────────────────────────

    pub async fn get_tokens(&self, user_id: &str) -> Result<Option<TokenRecord>, AppError> {
        match self {
            Self::Firestore(db) => db.get_tokens(user_id).await,
            Self::Memory(db) => Ok(db.get_tokens(user_id)),
        }
    }

    /// Upsert keyed by `tokens.user_id`.
    pub async fn set_tokens(&self, tokens: &TokenRecord) -> Result<(), AppError> {
        match self {
            Self::Firestore(db) => db.set_tokens(tokens).await,
            Self::Memory(db) => db.set_tokens(tokens),
        }
    }

    // ─── Sign-in Link Operations ─────────────────────────────────

    /// Create-only insert. Returns `false` if the link was already consumed.
    pub async fn consume_sign_in_link(&self, record: &SignInLinkRecord) -> Result<bool, AppError> {
        match self {
            Self::Firestore(db) => db.consume_sign_in_link(record).await,
            Self::Memory(db) => Ok(db.consume_sign_in_link(record)),
        }
    }
}
