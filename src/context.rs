//! Request-scoped context carrying a trace identifier.
//!
//! A [`Context`] is an immutable map from [`ContextKey`] to arbitrary values.
//! Deriving a new context with [`Context::with_value`] leaves the parent
//! untouched, so contexts can be cloned freely across tasks and threads.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

/// Key under which a value is stored in a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextKey(&'static str);

impl ContextKey {
    /// Create a key with the given name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The key's name.
    pub fn name(&self) -> &'static str {
        self.0
    }
}

/// Key holding the trace identifier read by the `*_with_context` emitters.
pub const TRACE_ID: ContextKey = ContextKey::new("traceId");

type ContextValue = Arc<dyn Any + Send + Sync>;

/// Immutable request-scoped key/value store.
#[derive(Clone, Default)]
pub struct Context {
    values: Arc<HashMap<ContextKey, ContextValue>>,
}

impl Context {
    /// An empty context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with `key` bound to `value`.
    #[must_use]
    pub fn with_value<T>(&self, key: ContextKey, value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        let mut values = HashMap::clone(&self.values);
        values.insert(key, Arc::new(value));
        Self {
            values: Arc::new(values),
        }
    }

    /// Look up `key`, returning `None` when absent or of another type.
    pub fn value<T: Any>(&self, key: ContextKey) -> Option<&T> {
        self.values.get(&key)?.downcast_ref::<T>()
    }

    /// Derive a context carrying the given trace id.
    #[must_use]
    pub fn with_trace_id(&self, trace_id: impl Into<String>) -> Self {
        self.with_value(TRACE_ID, trace_id.into())
    }

    /// Derive a context carrying a freshly generated trace id.
    #[must_use]
    pub fn with_new_trace_id(&self) -> Self {
        self.with_trace_id(new_trace_id())
    }

    /// The trace id stored under [`TRACE_ID`].
    ///
    /// Both `String` and `&'static str` values are recognised. Absence or any
    /// other type yields an empty string.
    pub fn trace_id(&self) -> &str {
        self.value::<String>(TRACE_ID)
            .map(String::as_str)
            .or_else(|| self.value::<&'static str>(TRACE_ID).copied())
            .unwrap_or_default()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(ContextKey::name))
            .finish()
    }
}

/// Generate a new time-sortable trace id (UUIDv7, no hyphens).
#[must_use]
pub fn new_trace_id() -> String {
    Uuid::now_v7().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_has_empty_trace_id() {
        assert_eq!(Context::background().trace_id(), "");
    }

    #[test]
    fn test_trace_id_from_string_and_str() {
        let owned = Context::background().with_trace_id("111222121");
        assert_eq!(owned.trace_id(), "111222121");

        let borrowed = Context::background().with_value(TRACE_ID, "abc");
        assert_eq!(borrowed.trace_id(), "abc");
    }

    #[test]
    fn test_wrong_type_yields_empty_trace_id() {
        let ctx = Context::background().with_value(TRACE_ID, 42_u64);
        assert_eq!(ctx.trace_id(), "");
        assert_eq!(ctx.value::<u64>(TRACE_ID), Some(&42));
    }

    #[test]
    fn test_derivation_leaves_parent_untouched() {
        let parent = Context::background().with_trace_id("parent");
        let child = parent.with_trace_id("child");
        assert_eq!(parent.trace_id(), "parent");
        assert_eq!(child.trace_id(), "child");
    }

    #[test]
    fn test_new_trace_ids_are_unique() {
        let a = new_trace_id();
        let b = new_trace_id();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
