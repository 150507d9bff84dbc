//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logger setup
//! - Durable storage (LocalStorage on web, JSON files on native)

#[cfg(not(target_arch = "wasm32"))]
mod file_store;
#[cfg(target_arch = "wasm32")]
mod local_storage;

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorage;

/// Install the logger for this target; later calls are ignored
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        log::debug!("Logger already installed");
    }
}

/// Install the logger for this target; later calls are ignored
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already installed");
    }
}
