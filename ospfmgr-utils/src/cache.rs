//
// Copyright (c) The Ospfmgr Contributors
//
// SPDX-License-Identifier: MIT
//

// Per-request memoization of an expensive fetch.
//
// Aggregate reads and multi-step iterations fetch daemon status once at entry
// (`update`) and drop the cached value before returning (`invalidate`). The
// cache stores errors as well, so a failed fetch is not retried within the
// same request. It must never be held across independent calls.
#[derive(Debug)]
pub struct CachedResult<T, E> {
    value: Option<Result<T, E>>,
}

// ===== impl CachedResult =====

impl<T, E> CachedResult<T, E> {
    pub fn new() -> CachedResult<T, E> {
        CachedResult { value: None }
    }

    // Unconditionally re-fetches and stores the result.
    pub fn update(
        &mut self,
        fetch: impl FnOnce() -> Result<T, E>,
    ) -> &Result<T, E> {
        self.value.insert(fetch())
    }

    // Returns the stored result, fetching only when nothing is cached.
    pub fn result(
        &mut self,
        fetch: impl FnOnce() -> Result<T, E>,
    ) -> &Result<T, E> {
        self.value.get_or_insert_with(fetch)
    }

    pub fn invalidate(&mut self) {
        self.value = None;
    }

    pub fn is_cached(&self) -> bool {
        self.value.is_some()
    }
}

impl<T, E> Default for CachedResult<T, E> {
    fn default() -> CachedResult<T, E> {
        CachedResult::new()
    }
}

// ===== tests =====

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_fetches_once() {
        let mut cache = CachedResult::<u32, ()>::new();
        let mut fetches = 0;

        for _ in 0..3 {
            let value = cache.result(|| {
                fetches += 1;
                Ok(42)
            });
            assert_eq!(*value, Ok(42));
        }
        assert_eq!(fetches, 1);
    }

    #[test]
    fn errors_are_cached_too() {
        let mut cache = CachedResult::<u32, &str>::new();
        assert_eq!(*cache.result(|| Err("down")), Err("down"));
        // The stored error is returned without re-fetching.
        assert_eq!(*cache.result(|| Ok(1)), Err("down"));
    }

    #[test]
    fn update_and_invalidate() {
        let mut cache = CachedResult::<u32, ()>::new();
        assert_eq!(*cache.result(|| Ok(1)), Ok(1));
        // `update` re-fetches even with a value cached.
        assert_eq!(*cache.update(|| Ok(2)), Ok(2));
        assert!(cache.is_cached());

        cache.invalidate();
        assert!(!cache.is_cached());
        assert_eq!(*cache.result(|| Ok(3)), Ok(3));
    }
}
