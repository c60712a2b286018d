//! Domain model types (pure).
//!
//! All types in this module are pure data with smart constructors.

pub mod error;
pub mod identifiers;
pub mod settings;

// Re-export for convenience
pub use error::{AppError, SettingsError, TransportError};
pub use identifiers::{InvalidSessionId, InvalidViewerId, SessionId, ViewerId};
pub use settings::{InvalidSetting, LineWidth, LineWidthPreset, SettingChange, ViewerSettings};
