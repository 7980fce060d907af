use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteSettings {
    pub site_name: String,
    pub support_email: String,
    /// When false, attendees cannot take new seats on any event.
    pub registrations_open: bool,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            site_name: "EventMS".to_string(),
            support_email: "support@eventms.com".to_string(),
            registrations_open: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub site_name: Option<String>,
    pub support_email: Option<String>,
    pub registrations_open: Option<bool>,
}

impl SettingsUpdate {
    pub(crate) fn apply(self, settings: &mut SiteSettings) {
        if let Some(site_name) = self.site_name {
            settings.site_name = site_name;
        }
        if let Some(support_email) = self.support_email {
            settings.support_email = support_email;
        }
        if let Some(registrations_open) = self.registrations_open {
            settings.registrations_open = registrations_open;
        }
    }
}
