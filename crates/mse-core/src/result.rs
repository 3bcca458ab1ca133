//! Result type aliases and helpers

use crate::error::MseError;
use crate::traits::Entity;

/// Standard Result type for MedSynEval operations
pub type MseResult<T> = Result<T, MseError>;

/// Turn a missing lookup into a `NotFound` error for entity `E`
pub trait OptionExt<T> {
    fn or_not_found<E: Entity>(self, id: impl ToString) -> MseResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found<E: Entity>(self, id: impl ToString) -> MseResult<T> {
        self.ok_or_else(|| MseError::not_found::<E>(id))
    }
}
