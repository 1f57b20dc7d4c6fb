//! Per-request environment shared between middlewares.
//!
//! The well-known values exchanged by the stock middlewares are typed fields:
//!
//! | Field | Written by | Read by |
//! |---|---|---|
//! | `start_time` | timer | access logs |
//! | `elapsed_time` | timer | access logs, status |
//! | `status_code` | recorder | access logs, status |
//! | `bytes_written` | recorder | access logs |
//! | `remote_user` | auth-basic, auth-jwt | access logs |
//!
//! Anything else travels through the type-keyed extension map.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Request-scoped key/value area.
///
/// Created empty when a request enters the pipeline and dropped when it
/// leaves. Never shared between requests, so no synchronization is involved.
#[derive(Default)]
pub struct Env {
    /// Status code of the response, as recorded on the way out.
    pub status_code: Option<u16>,

    /// Time spent in the inner handlers.
    pub elapsed_time: Option<Duration>,

    /// When the request entered the timer.
    pub start_time: Option<DateTime<Utc>>,

    /// Number of body bytes handed to the writer below the recorder.
    pub bytes_written: Option<u64>,

    /// Authenticated user id.
    pub remote_user: Option<String>,

    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Env {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value keyed by its type, returning the previous one.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.extensions
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Gets a value by type.
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Gets a mutable value by type.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.extensions
            .get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut())
    }

    /// Removes a value by type.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    /// Returns true if a value of type `T` is stored.
    #[must_use]
    pub fn contains<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("status_code", &self.status_code)
            .field("elapsed_time", &self.elapsed_time)
            .field("start_time", &self.start_time)
            .field("bytes_written", &self.bytes_written)
            .field("remote_user", &self.remote_user)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TenantId(String);

    #[test]
    fn test_well_known_fields_start_empty() {
        let env = Env::new();
        assert!(env.status_code.is_none());
        assert!(env.elapsed_time.is_none());
        assert!(env.remote_user.is_none());
    }

    #[test]
    fn test_extensions() {
        let mut env = Env::new();
        assert!(env.insert(TenantId("acme".into())).is_none());
        assert!(env.contains::<TenantId>());
        assert_eq!(env.get::<TenantId>(), Some(&TenantId("acme".into())));

        env.get_mut::<TenantId>().unwrap().0.push_str("-corp");
        let old = env.insert(TenantId("other".into()));
        assert_eq!(old, Some(TenantId("acme-corp".into())));

        assert_eq!(env.remove::<TenantId>(), Some(TenantId("other".into())));
        assert!(!env.contains::<TenantId>());
    }
}
