//! Core of MultiTool Box: a catalog of utility tools behind a JSON command
//! router, with real PDF batch processing, AI video generation and chat.
//!
//! Hosts drive a [`router::Toolbox`] with [`router::Command`]s (or raw JSON
//! through `dispatch_json`) and render the UI tree it returns.

pub mod artifacts;
pub mod catalog;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod features;
pub mod genai;
pub mod router;
pub mod state;
pub mod ui;

#[cfg(test)]
mod testing;

pub use catalog::{Catalog, CategoryFilter, ToolCategory, ToolDescriptor};
pub use config::ToolboxConfig;
pub use dispatch::{resolve, resolve_handler, DispatchResult, HandlerKind};
pub use error::{ToolboxError, ToolboxResult};
pub use router::{Command, Services, Toolbox};

/// Installs `env_logger` honoring `RUST_LOG` (default `info`). Safe to call
/// more than once; later calls are ignored.
pub fn init_logging() {
    let env = env_logger::Env::default().default_filter_or("info");
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::debug!("[core] logging initialized");
    }
}
