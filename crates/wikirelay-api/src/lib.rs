//! # wikirelay-api
//!
//! HTTP service that manages wiki-to-chat subscriptions and fans inbound
//! wiki events out to the subscribed channels.

pub mod config;
pub mod error;
pub mod notification;
pub mod routes;
pub mod services;

use std::sync::Arc;

use wikirelay_core::SubscriptionRepository;

pub use config::RelayConfig;
pub use error::ApiError;
pub use notification::{
    DispatchReport, HttpNotifier, LogNotifier, NotificationDispatcher, Notifier, WikiEvent,
};
pub use routes::router;
pub use services::SubscriptionService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub subscriptions: SubscriptionService,
    pub dispatcher: NotificationDispatcher,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn SubscriptionRepository>,
        notifier: Arc<dyn Notifier>,
        server_v9_or_above: bool,
        wiki_url: String,
    ) -> Self {
        let subscriptions = SubscriptionService::new(repo, server_v9_or_above);
        let dispatcher = NotificationDispatcher::new(subscriptions.clone(), notifier, wiki_url);
        Self {
            subscriptions,
            dispatcher,
        }
    }
}
