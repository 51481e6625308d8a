//! Session-scoped cart storage.
//!
//! The cart is an explicit value object keyed by an opaque session token,
//! held in an injected in-process store. A cart is created implicitly on
//! first mutation and destroyed on clear or successful checkout. No state
//! is shared across sessions.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::errors::ServiceError;

pub const SESSION_HEADER: &str = "x-session-id";

/// Session cart value object: product id -> requested quantity.
///
/// Quantities are always positive; setting a non-positive quantity removes
/// the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: BTreeMap<Uuid, i32>,
}

impl Cart {
    /// Merges `qty` additively into the existing quantity. Non-positive
    /// quantities are ignored.
    pub fn add(&mut self, product_id: Uuid, qty: i32) {
        if qty <= 0 {
            return;
        }
        let entry = self.items.entry(product_id).or_insert(0);
        *entry = entry.saturating_add(qty);
    }

    /// Sets the quantity outright; non-positive removes the entry.
    pub fn set(&mut self, product_id: Uuid, qty: i32) {
        if qty <= 0 {
            self.items.remove(&product_id);
        } else {
            self.items.insert(product_id, qty);
        }
    }

    pub fn remove(&mut self, product_id: Uuid) {
        self.items.remove(&product_id);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn entries(&self) -> impl Iterator<Item = (Uuid, i32)> + '_ {
        self.items.iter().map(|(id, qty)| (*id, *qty))
    }

    pub fn product_ids(&self) -> Vec<Uuid> {
        self.items.keys().copied().collect()
    }
}

/// In-process session store holding one cart per session token.
#[derive(Debug, Default)]
pub struct SessionStore {
    carts: DashMap<String, Cart>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the session's cart (empty if none exists).
    pub fn cart(&self, session_id: &str) -> Cart {
        self.carts
            .get(session_id)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }

    /// Mutates the session's cart in place, creating it on first use, and
    /// returns a snapshot of the result.
    pub fn with_cart<F>(&self, session_id: &str, mutate: F) -> Cart
    where
        F: FnOnce(&mut Cart),
    {
        let mut entry = self.carts.entry(session_id.to_string()).or_default();
        mutate(&mut entry);
        entry.clone()
    }

    /// Destroys the session's cart. Idempotent.
    pub fn clear_cart(&self, session_id: &str) {
        self.carts.remove(session_id);
    }
}

/// Extractor for the session token carried in the `X-Session-Id` header.
#[derive(Debug, Clone)]
pub struct SessionId(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for SessionId
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| SessionId(value.to_string()))
            .ok_or_else(|| {
                ServiceError::ValidationError("Missing X-Session-Id header".to_string())
            })
    }
}
