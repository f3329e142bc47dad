//! Process-wide async runtime shared by every service.

use std::sync::OnceLock;

// Static tokio runtime that lives for the duration of the application
static RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Initialize the tokio runtime (call once at application startup).
/// Later calls return the existing handle.
pub fn init_runtime() -> std::io::Result<tokio::runtime::Handle> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime.handle().clone());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("late-tokio")
        .build()?;

    // Losing a race against another initializer keeps the first runtime.
    if RUNTIME.set(runtime).is_err() {
        tracing::debug!("Runtime already initialized");
    }

    get_runtime().ok_or_else(|| std::io::Error::other("runtime unavailable"))
}

/// Get the runtime handle (available after `init_runtime`).
pub fn get_runtime() -> Option<tokio::runtime::Handle> {
    RUNTIME.get().map(|r| r.handle().clone())
}
