//! Wiki event identifiers, display names, and per-server-version support.
//!
//! Event ids are the strings carried in subscriptions and in inbound webhook
//! payloads. Comment removal is not emitted by v9+ servers, so subscriptions
//! against such a server may not ask for it.

use crate::error::{Error, Result};

pub const COMMENT_CREATED: &str = "comment_created";
pub const COMMENT_UPDATED: &str = "comment_updated";
pub const COMMENT_REMOVED: &str = "comment_removed";
pub const PAGE_CREATED: &str = "page_created";
pub const PAGE_UPDATED: &str = "page_updated";
pub const PAGE_TRASHED: &str = "page_trashed";
pub const PAGE_RESTORED: &str = "page_restored";
pub const PAGE_REMOVED: &str = "page_removed";
pub const SPACE_UPDATED: &str = "space_updated";

/// Events supported by server v8 and below.
pub const SUPPORTED_EVENTS_V8_AND_BELOW: &[&str] = &[
    COMMENT_CREATED,
    COMMENT_UPDATED,
    COMMENT_REMOVED,
    PAGE_CREATED,
    PAGE_UPDATED,
    PAGE_TRASHED,
    PAGE_RESTORED,
    PAGE_REMOVED,
];

/// Events supported by server v9 and above.
pub const SUPPORTED_EVENTS_V9_AND_ABOVE: &[&str] = &[
    COMMENT_CREATED,
    COMMENT_UPDATED,
    PAGE_CREATED,
    PAGE_UPDATED,
    PAGE_TRASHED,
    PAGE_RESTORED,
    PAGE_REMOVED,
];

/// Human-readable name used in subscription tables.
///
/// Unknown ids render as themselves.
pub fn event_display_name(event: &str) -> &str {
    match event {
        COMMENT_CREATED => "Comment Create",
        COMMENT_UPDATED => "Comment Update",
        COMMENT_REMOVED => "Comment Remove",
        PAGE_CREATED => "Page Create",
        PAGE_UPDATED => "Page Update",
        PAGE_TRASHED => "Page Trash",
        PAGE_RESTORED => "Page Restore",
        PAGE_REMOVED => "Page Remove",
        other => other,
    }
}

/// The supported-event catalogue for the active server capability set.
pub fn supported_events(v9_or_above: bool) -> &'static [&'static str] {
    if v9_or_above {
        SUPPORTED_EVENTS_V9_AND_ABOVE
    } else {
        SUPPORTED_EVENTS_V8_AND_BELOW
    }
}

/// Reject the first event that the active server version cannot emit.
pub fn validate_events_for_server_version(events: &[String], v9_or_above: bool) -> Result<()> {
    let supported = supported_events(v9_or_above);
    match events.iter().find(|e| !supported.contains(&e.as_str())) {
        Some(event) => Err(Error::InvalidInput(format!(
            "event '{}' is not supported by the current Confluence Server version",
            event
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names() {
        assert_eq!(event_display_name(PAGE_CREATED), "Page Create");
        assert_eq!(event_display_name(COMMENT_REMOVED), "Comment Remove");
        assert_eq!(event_display_name("space_updated"), "space_updated");
    }

    #[test]
    fn test_v9_drops_comment_removed() {
        assert!(supported_events(false).contains(&COMMENT_REMOVED));
        assert!(!supported_events(true).contains(&COMMENT_REMOVED));
        assert_eq!(supported_events(true).len() + 1, supported_events(false).len());
    }

    #[test]
    fn test_validate_events_for_server_version() {
        let events = vec![PAGE_CREATED.to_string(), COMMENT_REMOVED.to_string()];
        assert!(validate_events_for_server_version(&events, false).is_ok());

        let err = validate_events_for_server_version(&events, true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid input: event 'comment_removed' is not supported by the current Confluence Server version"
        );
    }

    #[test]
    fn test_validate_rejects_unknown_event() {
        let events = vec!["page_exploded".to_string()];
        assert!(validate_events_for_server_version(&events, false).is_err());
    }

    #[test]
    fn test_validate_empty_events() {
        assert!(validate_events_for_server_version(&[], true).is_ok());
    }
}
