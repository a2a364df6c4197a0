//! Services module
//!
//! Outbound messaging, reminder scheduling and periodic maintenance

pub mod maintenance;
pub mod notification;
pub mod reminder;

pub use maintenance::{MaintenanceReport, MaintenanceRunner};
pub use notification::{Messenger, NotificationService, RecordingMessenger, TelegramMessenger};
pub use reminder::{ReminderScheduler, ReminderService};
