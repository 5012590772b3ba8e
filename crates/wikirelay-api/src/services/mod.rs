//! Service layer for business logic.

pub mod subscription_service;

pub use subscription_service::SubscriptionService;
