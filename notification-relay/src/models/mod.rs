pub mod notification;

pub use notification::{NotificationContent, NotificationRequest, ProviderMessage};
