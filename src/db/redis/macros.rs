/// Read-through caching against [`Cache`](crate::db::Cache).
///
/// Returns the cached value when present. Otherwise awaits `$block` (which
/// must produce an `AppResult`), stores the value in the background and
/// returns it. A failed cache read is logged and treated as a miss, so an
/// unavailable Redis never fails the caller.
///
/// The optional `keep_if` predicate decides whether a computed value is
/// worth caching.
///
/// # Example
/// ```rust,ignore
/// let profile = cached!(cache, CacheKey::Profile(user_id), ttl, async {
///     Ok::<_, AppError>(extractor.extract(user_id).await)
/// }, keep_if |p: &UserPreferenceProfile| p.is_complete())?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr, keep_if $keep:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await {
            Ok(Some(cached)) => {
                ::tracing::debug!(key = %key, "Cache hit");
                Ok(cached)
            }
            lookup => {
                if let Err(e) = lookup {
                    ::tracing::warn!(key = %key, error = %e, "Cache read failed, treating as miss");
                }
                match $block.await {
                    Ok(value) => {
                        if ($keep)(&value) {
                            $cache.set_in_background(&key, &value, $ttl);
                        }
                        Ok(value)
                    }
                    Err(e) => Err(e),
                }
            }
        }
    }};
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {
        $crate::cached!($cache, $key, $ttl, $block, keep_if |_| true)
    };
}
