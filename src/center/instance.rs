//! Process-wide shared center.
//!
//! The first call to `get_or_create` decides the instance; later calls return
//! it unchanged and ignore their argument.

use super::Center;
use crate::error::{CenterError, CenterResult};
use std::mem;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing::info;

static CENTER: OnceLock<Mutex<Center>> = OnceLock::new();

/// Return the shared center, creating it with `name` on first use.
pub fn get_or_create(name: &str) -> &'static Mutex<Center> {
    CENTER.get_or_init(|| {
        info!(center = name, "shared center created");
        Mutex::new(Center::new(name))
    })
}

/// The shared center, if it has been created.
pub fn current() -> Option<&'static Mutex<Center>> {
    CENTER.get()
}

fn lock() -> CenterResult<MutexGuard<'static, Center>> {
    let shared = current().ok_or_else(|| {
        CenterError::OperationFailed("shared center has not been created".to_string())
    })?;
    shared
        .lock()
        .map_err(|e| CenterError::OperationFailed(format!("shared center lock poisoned: {}", e)))
}

/// Run `f` with exclusive access to the shared center.
pub fn with_center<R>(f: impl FnOnce(&mut Center) -> CenterResult<R>) -> CenterResult<R> {
    let mut guard = lock()?;
    f(&mut *guard)
}

/// Swap the shared center's state for `replacement`.
///
/// Subscribers registered on the shared center stay attached and are notified;
/// any registered on `replacement` are dropped.
pub fn replace(replacement: Center) -> CenterResult<()> {
    let mut guard = lock()?;
    let subscribers = mem::take(&mut guard.subscribers);
    let next_subscription = guard.next_subscription.max(replacement.next_subscription);
    *guard = Center {
        subscribers,
        next_subscription,
        ..replacement
    };
    info!(center = %guard.name(), "shared center replaced");
    guard.notify();
    Ok(())
}
