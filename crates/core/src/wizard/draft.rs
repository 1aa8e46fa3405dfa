use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::bus::AppEvent;
use crate::domain::rfq::{
    DeliveryAddress, DeliveryLocation, Priority, PurchaseType, Rfq, RfqContent, RfqItem, RfqType,
};
use crate::domain::vendor::{VendorId, VendorSnapshot};
use crate::validation::is_blank;

/// Everything the creation modal has collected so far. Field values are kept
/// as entered; nothing here is validated.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfqDraft {
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub rfq_type: RfqType,
    /// Used when `rfq_type` is single-item.
    pub item: RfqItem,
    /// Used when `rfq_type` is multiple-items.
    pub items: Vec<RfqItem>,
    /// Used for services and project requests.
    pub description: String,

    pub purchase_type: Option<PurchaseType>,
    pub payment_terms: String,
    pub payment_method: String,
    pub delivery_date: Option<NaiveDate>,
    /// Name of an existing delivery location.
    pub delivery_location: String,
    /// Set while a new delivery address is being added inline.
    pub new_location: Option<DeliveryAddress>,

    pub selected_vendors: Vec<VendorId>,
    pub invite_emails: Vec<String>,
}

impl RfqDraft {
    /// Draft pre-filled from an `OpenCreateRfqModal` request.
    pub fn from_open_request(event: &AppEvent) -> Option<Self> {
        match event {
            AppEvent::OpenCreateRfqModal { category } => Some(Self {
                category: category.clone().unwrap_or_default(),
                ..Self::default()
            }),
            _ => None,
        }
    }

    pub fn from_record(rfq: &Rfq) -> Self {
        let mut draft = Self {
            title: rfq.title.clone(),
            category: rfq.category.clone(),
            priority: rfq.priority,
            due_date: Some(rfq.due_date),
            rfq_type: rfq.rfq_type,
            purchase_type: rfq.purchase_type,
            payment_terms: rfq.payment_terms.clone().unwrap_or_default(),
            payment_method: rfq.payment_method.clone().unwrap_or_default(),
            delivery_date: rfq.delivery_date,
            selected_vendors: rfq.selected_vendors.clone(),
            invite_emails: rfq
                .invited_vendors
                .iter()
                .filter(|snapshot| snapshot.vendor_id.is_none())
                .map(|snapshot| snapshot.email.clone())
                .collect(),
            ..Self::default()
        };

        match &rfq.content {
            RfqContent::SingleItem(item) => draft.item = item.clone(),
            RfqContent::Items(items) => draft.items = items.clone(),
            RfqContent::Text(text) => draft.description = text.clone(),
        }
        match &rfq.delivery_location {
            Some(DeliveryLocation::Known(name)) => draft.delivery_location = name.clone(),
            Some(DeliveryLocation::New(address)) => draft.new_location = Some(address.clone()),
            None => {}
        }

        draft
    }

    pub fn add_item(&mut self) -> usize {
        self.items.push(RfqItem::default());
        self.items.len() - 1
    }

    pub fn remove_item(&mut self, index: usize) -> Option<RfqItem> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Returns whether the vendor is selected afterwards.
    pub fn toggle_vendor(&mut self, vendor_id: VendorId) -> bool {
        if let Some(position) = self.selected_vendors.iter().position(|id| *id == vendor_id) {
            self.selected_vendors.remove(position);
            return false;
        }
        self.selected_vendors.push(vendor_id);
        true
    }

    /// Adds an e-mail invitation. The address format is not checked.
    pub fn invite_email(&mut self, email: &str) -> bool {
        let email = email.trim();
        if email.is_empty() || self.invite_emails.iter().any(|existing| existing == email) {
            return false;
        }
        self.invite_emails.push(email.to_owned());
        true
    }

    pub fn start_new_location(&mut self) {
        if self.new_location.is_none() {
            self.new_location = Some(DeliveryAddress::default());
        }
    }

    pub fn cancel_new_location(&mut self) {
        self.new_location = None;
    }

    pub fn content(&self) -> RfqContent {
        match self.rfq_type {
            RfqType::SingleItem => RfqContent::SingleItem(self.item.clone()),
            RfqType::MultipleItems => RfqContent::Items(
                self.items.iter().filter(|item| item.is_complete()).cloned().collect(),
            ),
            RfqType::Services | RfqType::Project => RfqContent::Text(self.description.clone()),
        }
    }

    pub fn delivery(&self) -> Option<DeliveryLocation> {
        if let Some(address) = &self.new_location {
            return Some(DeliveryLocation::New(address.clone()));
        }
        (!is_blank(&self.delivery_location))
            .then(|| DeliveryLocation::Known(self.delivery_location.trim().to_owned()))
    }

    pub fn email_invites(&self) -> Vec<VendorSnapshot> {
        self.invite_emails.iter().map(VendorSnapshot::email_invite).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::RfqDraft;
    use crate::bus::AppEvent;
    use crate::domain::rfq::{DeliveryLocation, RfqContent, RfqItem, RfqType};
    use crate::domain::vendor::VendorId;

    #[test]
    fn multiple_items_content_keeps_only_complete_rows() {
        let mut draft = RfqDraft { rfq_type: RfqType::MultipleItems, ..RfqDraft::default() };
        let first = draft.add_item();
        draft.items[first] =
            RfqItem { description: "Chair".to_owned(), quantity: "12".to_owned(), unit: String::new() };
        draft.add_item();

        assert_eq!(draft.content(), RfqContent::Items(vec![draft.items[0].clone()]));
    }

    #[test]
    fn inline_location_takes_precedence() {
        let mut draft = RfqDraft { delivery_location: "HQ".to_owned(), ..RfqDraft::default() };
        assert_eq!(draft.delivery(), Some(DeliveryLocation::Known("HQ".to_owned())));

        draft.start_new_location();
        assert!(matches!(draft.delivery(), Some(DeliveryLocation::New(_))));

        draft.cancel_new_location();
        draft.delivery_location = "  ".to_owned();
        assert_eq!(draft.delivery(), None);
    }

    #[test]
    fn vendor_toggle_and_invites_avoid_duplicates() {
        let mut draft = RfqDraft::default();
        assert!(draft.toggle_vendor(VendorId(2)));
        assert!(!draft.toggle_vendor(VendorId(2)));
        assert!(draft.selected_vendors.is_empty());

        assert!(draft.invite_email("buyer@example.com"));
        assert!(!draft.invite_email(" buyer@example.com "));
        assert!(!draft.invite_email(""));
        assert!(draft.invite_email("no-at-sign"));
        assert_eq!(draft.email_invites().len(), 2);
    }

    #[test]
    fn open_request_prefills_category() {
        let event = AppEvent::OpenCreateRfqModal { category: Some("Logistics".to_owned()) };
        let draft = RfqDraft::from_open_request(&event).expect("open request");
        assert_eq!(draft.category, "Logistics");
        assert!(RfqDraft::from_open_request(&AppEvent::OpenAddTaskModal).is_none());
    }

    #[test]
    fn remove_item_ignores_out_of_range_index() {
        let mut draft = RfqDraft::default();
        draft.add_item();
        assert!(draft.remove_item(3).is_none());
        assert!(draft.remove_item(0).is_some());
    }

    #[test]
    fn drafts_deserialize_from_partial_json() {
        let draft: RfqDraft = serde_json::from_str(
            r#"{"title":"Pallets","rfq_type":"services","description":"Weekly pickup"}"#,
        )
        .expect("partial draft");
        assert_eq!(draft.rfq_type, RfqType::Services);
        assert_eq!(draft.content(), RfqContent::Text("Weekly pickup".to_owned()));
    }
}
