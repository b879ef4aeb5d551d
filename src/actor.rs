//! Actor identity
//!
//! The core never looks up "who is acting" on its own. Callers resolve the
//! actor through an [`ActorResolver`] and thread the resulting [`ActorId`]
//! through every auditing call.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the user a write is attributed to
///
/// `0` is the sentinel for "no actor in context".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(i64);

impl ActorId {
    /// No actor in context
    pub const UNKNOWN: ActorId = ActorId(0);

    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Normalize a nullable identity; `None` becomes [`ActorId::UNKNOWN`]
    pub fn from_optional(id: Option<i64>) -> Self {
        id.map(Self).unwrap_or(Self::UNKNOWN)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == 0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ActorId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Option<i64>> for ActorId {
    fn from(id: Option<i64>) -> Self {
        Self::from_optional(id)
    }
}

/// Supplies the identity currently acting, if any
///
/// Implemented by the framework adapter (request context, CLI flag, job
/// runner). Returning `None` is not an error.
pub trait ActorResolver {
    fn current_actor_id(&self) -> Option<i64>;
}

/// Resolver for contexts with no authenticated actor
#[derive(Debug, Clone, Copy, Default)]
pub struct NoActor;

impl ActorResolver for NoActor {
    fn current_actor_id(&self) -> Option<i64> {
        None
    }
}

/// Resolver that always reports the same actor
#[derive(Debug, Clone, Copy)]
pub struct FixedActor(pub i64);

impl ActorResolver for FixedActor {
    fn current_actor_id(&self) -> Option<i64> {
        Some(self.0)
    }
}

impl<F> ActorResolver for F
where
    F: Fn() -> Option<i64>,
{
    fn current_actor_id(&self) -> Option<i64> {
        self()
    }
}

/// Resolve the acting identity, falling back to the sentinel
pub fn resolve_actor<R: ActorResolver + ?Sized>(resolver: &R) -> ActorId {
    ActorId::from_optional(resolver.current_actor_id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_sentinel() {
        assert_eq!(ActorId::UNKNOWN.value(), 0);
        assert!(ActorId::default().is_unknown());
        assert_eq!(ActorId::from_optional(None), ActorId::UNKNOWN);
    }

    #[test]
    fn test_resolve_without_actor() {
        assert_eq!(resolve_actor(&NoActor), ActorId::UNKNOWN);
    }

    #[test]
    fn test_resolve_fixed_actor() {
        assert_eq!(resolve_actor(&FixedActor(7)).value(), 7);
    }

    #[test]
    fn test_closure_resolver() {
        let session_user = Some(12);
        let resolver = move || session_user;
        assert_eq!(resolve_actor(&resolver), ActorId::new(12));
    }

    #[test]
    fn test_display() {
        assert_eq!(ActorId::new(5).to_string(), "5");
    }
}
