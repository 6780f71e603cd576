// Storechat Core
// Rust/WASM ядро уведомлений и чата для витрины маркетплейса

#![warn(clippy::all)]

// Модули
pub mod alert;
pub mod api;
pub mod config;
pub mod protocol;
pub mod state;
pub mod utils;
pub mod error;

// Re-exports для удобства
pub use api::{ChatPageController, ChatWidget, Viewer, ViewerRole};
pub use error::{Result, StorechatError};

// WASM-specific bindings
#[cfg(target_arch = "wasm32")]
pub mod wasm;
