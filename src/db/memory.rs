// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process storage with the same semantics as the Firestore collections.

use crate::error::AppError;
use crate::models::{EmailIndex, LocalUser, SignInLinkRecord, TokenRecord};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

/// Storage operation that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    ReadEmailIndex,
    WriteEmailIndex,
    WriteUser,
    WriteTokens,
}

/// Concurrent maps standing in for Firestore collections.
#[derive(Default)]
pub struct MemoryDb {
    users: DashMap<String, LocalUser>,
    user_emails: DashMap<String, EmailIndex>,
    tokens: DashMap<String, TokenRecord>,
    sign_in_links: DashMap<String, SignInLinkRecord>,
    faults: DashSet<Fault>,
}

impl MemoryDb {
    /// Make every later `fault` operation fail with [`AppError::Database`].
    pub fn inject(&self, fault: Fault) {
        self.faults.insert(fault);
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }

    fn check(&self, fault: Fault) -> Result<(), AppError> {
        if self.faults.contains(&fault) {
            return Err(AppError::Database(format!("{:?} unavailable", fault)));
        }
        Ok(())
    }

    pub fn get_user(&self, user_id: &str) -> Option<LocalUser> {
        self.users.get(user_id).map(|u| u.clone())
    }

    pub fn upsert_user(&self, user: &LocalUser) -> Result<(), AppError> {
        self.check(Fault::WriteUser)?;
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    pub fn get_email_index(&self, key: &str) -> Result<Option<EmailIndex>, AppError> {
        self.check(Fault::ReadEmailIndex)?;
        Ok(self.user_emails.get(key).map(|i| i.clone()))
    }

    pub fn insert_email_index(&self, key: &str, index: &EmailIndex) -> Result<bool, AppError> {
        self.check(Fault::WriteEmailIndex)?;
        Ok(insert_if_vacant(&self.user_emails, key, index))
    }

    pub fn get_tokens(&self, user_id: &str) -> Option<TokenRecord> {
        self.tokens.get(user_id).map(|t| t.clone())
    }

    pub fn set_tokens(&self, tokens: &TokenRecord) -> Result<(), AppError> {
        self.check(Fault::WriteTokens)?;
        self.tokens.insert(tokens.user_id.clone(), tokens.clone());
        Ok(())
    }

    pub fn consume_sign_in_link(&self, record: &SignInLinkRecord) -> bool {
        insert_if_vacant(&self.sign_in_links, &record.jti, record)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

fn insert_if_vacant<V: Clone>(map: &DashMap<String, V>, key: &str, value: &V) -> bool {
    match map.entry(key.to_string()) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(value.clone());
            true
        }
    }
}
