//! Thread pool selection for parallel hashing.

use filewarden_core::WardenError;

/// Run `op` on a rayon pool sized by `threads`.
///
/// `0` uses the global pool; any other value builds a dedicated pool with
/// that many workers for the duration of the call.
pub fn run_in_pool<R, F>(threads: usize, op: F) -> Result<R, WardenError>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == 0 {
        return Ok(op());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| WardenError::InvalidConfig {
            message: format!("cannot start {threads} worker threads: {e}"),
        })?;
    Ok(pool.install(op))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedicated_pool_size() {
        let n = run_in_pool(2, rayon::current_num_threads).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_global_pool() {
        assert_eq!(run_in_pool(0, || 41 + 1).unwrap(), 42);
    }
}
