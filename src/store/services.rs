use tracing::debug;

use super::AppData;
use crate::model::{ServiceUpdate, SettingsUpdate, SiteSettings, VendorService};

impl AppData {
    pub fn services_of<'a>(
        &'a self,
        vendor_id: &'a str,
    ) -> impl Iterator<Item = &'a VendorService> + 'a {
        self.services.iter().filter(move |s| s.vendor_id == vendor_id)
    }

    pub fn add_service(&mut self, service: VendorService) {
        debug!("vendor {} added service {}", service.vendor_id, service.name);
        self.services.push(service);
    }

    /// Only the owning vendor's services are reachable through these mutators.
    pub fn update_service(&mut self, vendor_id: &str, id: &str, update: ServiceUpdate) -> bool {
        match self.owned_service(vendor_id, id) {
            Some(service) => {
                update.apply(service);
                true
            }
            None => false,
        }
    }

    pub fn toggle_service_availability(&mut self, vendor_id: &str, id: &str) -> Option<bool> {
        let service = self.owned_service(vendor_id, id)?;
        service.available = !service.available;
        Some(service.available)
    }

    pub fn delete_service(&mut self, vendor_id: &str, id: &str) -> bool {
        let before = self.services.len();
        self.services
            .retain(|s| !(s.id == id && s.vendor_id == vendor_id));
        before != self.services.len()
    }

    fn owned_service(&mut self, vendor_id: &str, id: &str) -> Option<&mut VendorService> {
        self.services
            .iter_mut()
            .find(|s| s.id == id && s.vendor_id == vendor_id)
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) -> &SiteSettings {
        update.apply(&mut self.settings);
        &self.settings
    }
}
