//! # pbsdk-core - Core Domain Types
//!
//! Foundation crate for the Pebble SDK shell. Provides platform types, the SDK
//! distribution layout, error handling and logging setup.
//!
//! This crate has **zero internal dependencies** -- it only depends on external
//! crates (serde, thiserror, tracing, dirs).
//!
//! ## Public API
//!
//! ### Platforms (`platform`)
//! - [`Platform`] - Watch hardware platform (aplite, basalt)
//! - [`PlatformRequest`] - A specific platform, or "whatever is running"
//!
//! ### SDK Layout (`sdk`)
//! - [`SdkLayout`] - Path conventions of an installed SDK distribution
//!
//! ### Error Handling (`error`)
//! - [`Error`] - Custom error enum with `fatal` vs `recoverable` classification
//! - [`Result`] - Type alias for `std::result::Result<T, Error>`
//! - [`ResultExt`] - Extension trait for adding error context
//!
//! ## Prelude
//!
//! Import commonly used types with:
//! ```rust
//! use pbsdk_core::prelude::*;
//! ```

pub mod error;
pub mod logging;
pub mod platform;
pub mod sdk;

/// Prelude for common imports used throughout all pbsdk crates
pub mod prelude {
    pub use super::error::{Error, Result, ResultExt};
    pub use tracing::{debug, error, info, instrument, trace, warn};
}

pub use error::{Error, Result, ResultExt};
pub use platform::{Platform, PlatformRequest};
pub use sdk::{host_tag, SdkLayout};
