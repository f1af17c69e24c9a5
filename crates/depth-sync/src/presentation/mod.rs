//! Presentation Layer - Outbound notifications to the owning application

pub mod notifier;

pub use notifier::NotificationPublisher;
