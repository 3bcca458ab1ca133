//! Core traits shared by models, services, and the HTTP layer

use chrono::{DateTime, Utc};

/// Primary key type
pub type Id = i64;

/// Trait for entities that have a primary key
pub trait Identifiable {
    fn id(&self) -> Option<Id>;
    fn is_persisted(&self) -> bool {
        self.id().is_some()
    }
}

/// Trait for entities with a creation timestamp
pub trait Timestamped {
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn updated_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Base trait for all domain entities
pub trait Entity: Identifiable {
    /// The database table name
    const TABLE_NAME: &'static str;

    /// Human-readable type name for error messages
    const TYPE_NAME: &'static str;
}

/// Request-scoped identity of the caller.
///
/// Handlers build one per request and pass it into every service call.
pub trait UserContext: Send + Sync {
    fn user_id(&self) -> Id;
    fn is_superuser(&self) -> bool;
    fn is_anonymous(&self) -> bool;
    fn is_logged_in(&self) -> bool {
        !self.is_anonymous()
    }
}
