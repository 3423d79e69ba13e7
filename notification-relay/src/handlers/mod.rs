//! HTTP handlers for notification-relay.

pub mod notification;

pub use notification::send_notification;
