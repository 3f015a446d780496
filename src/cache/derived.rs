//! In-memory cache of objects resolved from a store's raw tokens.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::store::JsonStore;

/// Maps a stored token to a live object.
///
/// Returning `None` means the token refers to something that no longer
/// exists; the token is skipped rather than failing the rebuild.
pub trait Resolver<T> {
    fn resolve(&self, token: &str) -> Option<T>;
}

impl<T, F> Resolver<T> for F
where
    F: Fn(&str) -> Option<T>,
{
    fn resolve(&self, token: &str) -> Option<T> {
        self(token)
    }
}

/// Ordered sequence of resolved objects, rebuilt wholesale on demand.
///
/// Reads never trigger a rebuild. Cloning is cheap and shares the same
/// underlying sequence.
pub struct DerivedCache<T> {
    inner: Arc<RwLock<Vec<T>>>,
    name: Arc<str>,
}

impl<T> Clone for DerivedCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            name: Arc::clone(&self.name),
        }
    }
}

impl<T: Clone> DerivedCache<T> {
    /// Create an empty cache.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Vec::new())),
            name: name.into(),
        }
    }

    /// Resolve every token in `store` and replace the cache with the results.
    ///
    /// Output order follows token order. Unresolved tokens are logged and
    /// left out.
    pub fn rebuild<R>(&self, store: &JsonStore<Vec<String>>, resolver: &R) -> Vec<T>
    where
        R: Resolver<T> + ?Sized,
    {
        let tokens = store.get();
        let mut built = Vec::with_capacity(tokens.len());

        for token in &tokens {
            match resolver.resolve(token) {
                Some(item) => built.push(item),
                None => warn!(cache = %self.name, %token, "could not resolve token, dropping it"),
            }
        }

        debug!(cache = %self.name, resolved = built.len(), stored = tokens.len(), "cache rebuilt");
        *self.inner.write() = built.clone();
        built
    }

    /// Like [`rebuild`](Self::rebuild), but every token must convert.
    ///
    /// The first failure is returned and the cache is left as it was.
    pub fn try_rebuild<E, F>(&self, store: &JsonStore<Vec<String>>, convert: F) -> Result<Vec<T>, E>
    where
        F: FnMut(&str) -> Result<T, E>,
    {
        let built = Self::convert_all(&store.get(), convert)?;
        debug!(cache = %self.name, built = built.len(), "cache rebuilt");
        *self.inner.write() = built.clone();
        Ok(built)
    }

    /// Convert `tokens` without touching any cache.
    pub fn convert_all<E, F>(tokens: &[String], mut convert: F) -> Result<Vec<T>, E>
    where
        F: FnMut(&str) -> Result<T, E>,
    {
        tokens.iter().map(|token| convert(token)).collect()
    }

    /// A copy of the last built sequence.
    pub fn current(&self) -> Vec<T> {
        self.inner.read().clone()
    }

    /// Run `f` against the cached sequence without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl<T> std::fmt::Debug for DerivedCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedCache")
            .field("name", &self.name)
            .field("len", &self.inner.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_store(dir: &tempfile::TempDir, tokens: &[&str]) -> JsonStore<Vec<String>> {
        JsonStore::open(
            dir.path().join("tokens.json"),
            tokens.iter().map(|t| t.to_string()).collect(),
        )
        .unwrap()
    }

    fn upper_unless_stale(token: &str) -> Option<String> {
        (!token.starts_with("stale")).then(|| token.to_uppercase())
    }

    #[test]
    fn rebuild_keeps_order_and_drops_unresolved() {
        let dir = tempfile::tempdir().unwrap();
        let store = tokens_store(&dir, &["a", "stale-1", "b", "stale-2", "c"]);
        let cache = DerivedCache::new("letters");

        let built = cache.rebuild(&store, &upper_unless_stale);

        assert_eq!(built, vec!["A", "B", "C"]);
        assert_eq!(cache.current(), built);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn rebuild_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = tokens_store(&dir, &["a", "b"]);
        let cache = DerivedCache::new("letters");
        cache.rebuild(&store, &upper_unless_stale);

        store.set_blocking(vec!["stale".to_string()]).unwrap();
        cache.rebuild(&store, &upper_unless_stale);

        assert!(cache.is_empty());
    }

    #[test]
    fn reads_do_not_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let store = tokens_store(&dir, &["a"]);
        let cache: DerivedCache<String> = DerivedCache::new("letters");

        assert!(cache.current().is_empty());
        cache.rebuild(&store, &upper_unless_stale);
        store.set_blocking(vec!["a".to_string(), "b".to_string()]).unwrap();

        assert_eq!(cache.current(), vec!["A"]);
    }

    #[test]
    fn try_rebuild_failure_leaves_cache_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = tokens_store(&dir, &["1", "2"]);
        let cache = DerivedCache::new("numbers");
        cache.try_rebuild(&store, |t| t.parse::<u32>()).unwrap();

        store.set_blocking(vec!["3".to_string(), "x".to_string()]).unwrap();
        let result = cache.try_rebuild(&store, |t| t.parse::<u32>());

        assert!(result.is_err());
        assert_eq!(cache.current(), vec![1, 2]);
    }

    #[test]
    fn clones_share_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = tokens_store(&dir, &["a"]);
        let cache = DerivedCache::new("letters");
        let reader = cache.clone();

        cache.rebuild(&store, &upper_unless_stale);

        assert_eq!(reader.with(|items| items.to_vec()), vec!["A"]);
    }
}
