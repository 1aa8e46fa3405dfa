use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VendorId(pub u64);

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub category: String,
    pub email: String,
    pub location: String,
    /// Whole stars, 1..=5.
    pub rating: u8,
}

/// Copy of vendor details taken at invitation time. E-mail invitations carry no
/// directory id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorSnapshot {
    pub vendor_id: Option<VendorId>,
    pub name: String,
    pub email: String,
    pub category: Option<String>,
}

impl VendorSnapshot {
    pub fn from_vendor(vendor: &Vendor) -> Self {
        Self {
            vendor_id: Some(vendor.id),
            name: vendor.name.clone(),
            email: vendor.email.clone(),
            category: Some(vendor.category.clone()),
        }
    }

    pub fn email_invite(email: impl Into<String>) -> Self {
        let email = email.into();
        Self { vendor_id: None, name: email.clone(), email, category: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VendorDirectory {
    vendors: Vec<Vendor>,
}

impl VendorDirectory {
    pub fn new(vendors: Vec<Vendor>) -> Self {
        Self { vendors }
    }

    /// Static catalog the vendor tab picks from.
    pub fn mock() -> Self {
        let vendor = |id, name: &str, category: &str, email: &str, location: &str, rating| Vendor {
            id: VendorId(id),
            name: name.to_owned(),
            category: category.to_owned(),
            email: email.to_owned(),
            location: location.to_owned(),
            rating,
        };

        Self::new(vec![
            vendor(1, "TechSupply Co.", "IT Equipment", "sales@techsupply.example", "Austin, TX", 5),
            vendor(2, "Office Depot Pro", "Office Supplies", "b2b@officedepot.example", "Chicago, IL", 4),
            vendor(3, "Global Logistics", "Logistics", "quotes@globallog.example", "Newark, NJ", 4),
            vendor(4, "BuildRight Materials", "Construction", "rfq@buildright.example", "Denver, CO", 3),
            vendor(5, "CloudServe Solutions", "IT Services", "hello@cloudserve.example", "Seattle, WA", 5),
            vendor(6, "PrintWorks", "Marketing", "orders@printworks.example", "Portland, OR", 3),
        ])
    }

    pub fn get(&self, id: VendorId) -> Option<&Vendor> {
        self.vendors.iter().find(|vendor| vendor.id == id)
    }

    pub fn all(&self) -> &[Vendor] {
        &self.vendors
    }

    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<&Vendor> {
        let needle = query.trim().to_lowercase();
        self.vendors
            .iter()
            .filter(|vendor| category.map_or(true, |category| vendor.category == category))
            .filter(|vendor| {
                needle.is_empty()
                    || vendor.name.to_lowercase().contains(&needle)
                    || vendor.category.to_lowercase().contains(&needle)
                    || vendor.location.to_lowercase().contains(&needle)
            })
            .collect()
    }

    /// Unknown ids are skipped; vendor ids are not referentially checked.
    pub fn snapshots(&self, ids: &[VendorId]) -> Vec<VendorSnapshot> {
        ids.iter().filter_map(|id| self.get(*id)).map(VendorSnapshot::from_vendor).collect()
    }
}
