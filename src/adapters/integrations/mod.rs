//! Outbound integrations with external services.

pub mod webhook;

pub use webhook::WebhookNotifier;
