use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

/// Serialises tests that read or mutate process environment variables.
pub(crate) fn env_guard() -> MutexGuard<'static, ()> {
    static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    GUARD
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}
