//! Session configuration.

use serde::Deserialize;
use sqlbridge_core::Engine;

/// Settings a [`Session`](crate::Session) starts with.
///
/// ```rust
/// use sqlbridge_session::SessionConfig;
/// use sqlbridge_core::Engine;
///
/// let config = SessionConfig::default();
/// assert_eq!(config.engine, Engine::Generic);
/// assert!(!config.read_only);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Engine whose dialect profile renders statements.
    pub engine: Engine,
    /// Reject writes, deletes and raw SQL.
    pub read_only: bool,
}

impl SessionConfig {
    /// Configuration for `engine` with everything else defaulted.
    #[must_use]
    pub const fn for_engine(engine: Engine) -> Self {
        Self {
            engine,
            read_only: false,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::for_engine(Engine::Generic)
    }
}
