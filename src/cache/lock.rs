use std::sync::{RwLock, RwLockWriteGuard};

use tracing::warn;

/// Acquire a write guard, recovering the inner value if a writer panicked.
pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        log_poisoned(target, op, "rwlock.write");
        poisoned.into_inner()
    })
}

fn log_poisoned(target: &'static str, op: &'static str, lock_kind: &'static str) {
    warn!(
        op,
        target_module = target,
        lock_kind,
        result = "poisoned_recovered",
        "Recovered from poisoned cache lock; cached articles may be stale"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(RwLock::new(1_u32));
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.write().expect("first writer");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        *rw_write(&lock, "test", "write") += 1;
        assert_eq!(*rw_write(&lock, "test", "write"), 2);
    }
}
