pub mod event;
pub mod feedback;
pub mod notification;
pub mod registration;
pub mod service;
pub mod settings;
pub mod task;
pub mod user;

pub use event::{Category, Event, EventStatus, EventUpdate};
pub use feedback::{Feedback, FeedbackCategories};
pub use notification::{Notification, NotificationType};
pub use registration::{Registration, RegistrationStatus};
pub use service::{ServiceUpdate, VendorService};
pub use settings::{SettingsUpdate, SiteSettings};
pub use task::{Priority, Task, TaskStatus, TaskUpdate};
pub use user::{Role, User};

/// Rounded percentage of `part` over `whole`, zero when `whole` is zero.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Splits a comma separated form value into trimmed, non-empty items.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
