//! Centralized default constants for wikirelay.
//!
//! Organized by domain area. Crates reference these instead of defining
//! their own magic numbers.

// =============================================================================
// REGISTRY STORAGE
// =============================================================================

/// Prefix for composite index keys and the source of the registry blob key.
pub const SUBSCRIPTION_KEY_PREFIX: &str = "confluence_subs";

// =============================================================================
// ATOMIC UPDATE PROTOCOL
// =============================================================================

/// Maximum compare-and-set attempts before giving up.
pub const ATOMIC_WRITE_ATTEMPTS: u32 = 5;

/// Fixed pause between compare-and-set attempts, in milliseconds.
pub const ATOMIC_RETRY_WAIT_MS: u64 = 30;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default HTTP bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default Redis connection URL.
pub const REDIS_URL: &str = "redis://localhost:6379";

/// Timeout for outbound notification delivery, in seconds.
pub const NOTIFY_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// USER-FACING MESSAGES
// =============================================================================

pub const ALIAS_ALREADY_EXIST: &str =
    "a subscription with the same name already exists in this channel";

pub const URL_SPACE_KEY_ALREADY_EXIST: &str =
    "a subscription with the same url and space key already exists in this channel";

pub const URL_PAGE_ID_ALREADY_EXIST: &str =
    "a subscription with the same url and page id already exists in this channel";

pub const GENERAL_SAVE_ERROR: &str = "an error occurred attempting to save a subscription";

pub const GENERAL_ERROR: &str = "Some error occurred. Please try again after sometime.";

/// Format with the alias via [`general_delete_error`].
const GENERAL_DELETE_ERROR: &str = "Error occurred while deleting subscription with alias";

pub fn general_delete_error(alias: &str) -> String {
    format!("{} **{}**.", GENERAL_DELETE_ERROR, alias)
}

pub fn subscription_not_found(alias: &str) -> String {
    format!("Subscription with alias **{}** not found.", alias)
}
