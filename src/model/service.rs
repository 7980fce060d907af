use serde::{Deserialize, Serialize};

pub const SERVICE_CATEGORIES: &[&str] = &[
    "Catering",
    "Equipment",
    "Photography",
    "Entertainment",
    "Decoration",
    "Transportation",
    "Security",
    "Other",
];

/// An offering in a vendor's own catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorService {
    pub id: String,
    pub vendor_id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: f64,
    pub duration: String,
    pub location: String,
    pub rating: f64,
    pub reviews: u32,
    pub available: bool,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<String>,
    pub location: Option<String>,
    pub features: Option<Vec<String>>,
}

impl ServiceUpdate {
    pub(crate) fn apply(self, service: &mut VendorService) {
        if let Some(name) = self.name {
            service.name = name;
        }
        if let Some(description) = self.description {
            service.description = description;
        }
        if let Some(category) = self.category {
            service.category = category;
        }
        if let Some(price) = self.price {
            service.price = price;
        }
        if let Some(duration) = self.duration {
            service.duration = duration;
        }
        if let Some(location) = self.location {
            service.location = location;
        }
        if let Some(features) = self.features {
            service.features = features;
        }
    }
}
