//! # wikirelay-core
//!
//! Core types, traits, and abstractions for wikirelay.
//!
//! This crate holds the subscription registry that maps wiki sites, spaces,
//! and pages to chat channels, the JSON codec for its persisted blob, and the
//! fan-out resolver that turns an inbound event into a set of channels. It
//! performs no I/O; storage backends implement [`KvStore`] elsewhere.

pub mod codec;
pub mod defaults;
pub mod error;
pub mod events;
pub mod keys;
pub mod registry;
pub mod resolver;
pub mod subscription;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{event_display_name, supported_events, validate_events_for_server_version};
pub use keys::{subscription_key, url_page_id_combination_key, url_space_key_combination_key};
pub use registry::{
    formatted_subscription_list, ChannelEvents, ChannelSubscriptions, InsensitiveLookup,
    Subscriptions,
};
pub use resolver::EventTarget;
pub use subscription::{
    BaseSubscription, IndexKind, PageSubscription, SpaceSubscription, Subscription,
    SUBSCRIPTION_TYPE_PAGE, SUBSCRIPTION_TYPE_SPACE,
};
pub use traits::*;
