use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::vendor::{VendorId, VendorSnapshot};
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfqId(pub u64);

impl fmt::Display for RfqId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RFQ-{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RfqStatus {
    Draft,
    OnProcess,
    UnderApproval,
    Closed,
}

impl RfqStatus {
    pub const ALL: [RfqStatus; 4] =
        [RfqStatus::Draft, RfqStatus::OnProcess, RfqStatus::UnderApproval, RfqStatus::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::OnProcess => "on-process",
            Self::UnderApproval => "under-approval",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for RfqStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Lower rank sorts first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 0,
            Self::Medium => 1,
            Self::Low => 2,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RfqType {
    #[default]
    SingleItem,
    MultipleItems,
    Services,
    Project,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfqItem {
    pub description: String,
    pub quantity: String,
    #[serde(default)]
    pub unit: String,
}

impl RfqItem {
    pub fn is_complete(&self) -> bool {
        !self.description.trim().is_empty() && !self.quantity.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum RfqContent {
    SingleItem(RfqItem),
    Items(Vec<RfqItem>),
    Text(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PurchaseType {
    OneTime,
    Recurring,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub label: String,
    pub street: String,
    pub city: String,
    #[serde(default)]
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum DeliveryLocation {
    Known(String),
    New(DeliveryAddress),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rfq {
    pub id: RfqId,
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub rfq_type: RfqType,
    pub content: RfqContent,
    pub purchase_type: Option<PurchaseType>,
    pub payment_terms: Option<String>,
    pub payment_method: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub delivery_location: Option<DeliveryLocation>,
    pub selected_vendors: Vec<VendorId>,
    pub invited_vendors: Vec<VendorSnapshot>,
    pub status: RfqStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rfq {
    pub fn can_transition_to(&self, next: RfqStatus) -> bool {
        use RfqStatus::{Closed, Draft, OnProcess, UnderApproval};

        matches!(
            (self.status, next),
            (OnProcess, UnderApproval)
                | (UnderApproval, OnProcess)
                | (OnProcess, Draft)
                | (UnderApproval, Draft)
                | (Draft, OnProcess)
                | (Draft, Closed)
                | (OnProcess, Closed)
                | (UnderApproval, Closed)
        )
    }

    pub fn transition_to(&mut self, next: RfqStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            self.updated_at = Utc::now();
            return Ok(());
        }

        Err(DomainError::InvalidRfqTransition { from: self.status, to: next })
    }

    pub fn withdraw(&mut self) -> Result<(), DomainError> {
        self.transition_to(RfqStatus::Draft)
    }

    pub fn close(&mut self) -> Result<(), DomainError> {
        self.transition_to(RfqStatus::Closed)
    }

    pub fn request_approval(&mut self) -> Result<(), DomainError> {
        self.transition_to(RfqStatus::UnderApproval)
    }

    pub fn return_from_approval(&mut self) -> Result<(), DomainError> {
        if self.status != RfqStatus::UnderApproval {
            return Err(DomainError::InvalidRfqTransition {
                from: self.status,
                to: RfqStatus::OnProcess,
            });
        }
        self.transition_to(RfqStatus::OnProcess)
    }

    /// Moves the due date later without touching the status.
    pub fn extend(&mut self, new_due_date: NaiveDate) -> Result<(), DomainError> {
        if self.status == RfqStatus::Closed {
            return Err(DomainError::RfqClosed { id: self.id });
        }
        if new_due_date <= self.due_date {
            return Err(DomainError::DueDateNotExtended {
                current: self.due_date,
                requested: new_due_date,
            });
        }

        self.due_date = new_due_date;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(&needle)
            || self.category.to_lowercase().contains(&needle)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{NaiveDate, Utc};

    use super::{Priority, Rfq, RfqContent, RfqId, RfqItem, RfqStatus, RfqType};
    use crate::errors::DomainError;

    pub(crate) fn rfq(id: u64, status: RfqStatus) -> Rfq {
        let now = Utc::now();
        Rfq {
            id: RfqId(id),
            title: "Laptops Q3".to_owned(),
            category: "IT Equipment".to_owned(),
            priority: Priority::High,
            due_date: NaiveDate::from_ymd_opt(2026, 11, 1).expect("valid date"),
            rfq_type: RfqType::SingleItem,
            content: RfqContent::SingleItem(RfqItem {
                description: "Dell Latitop".to_owned(),
                quantity: "50".to_owned(),
                unit: "pcs".to_owned(),
            }),
            purchase_type: None,
            payment_terms: None,
            payment_method: None,
            delivery_date: None,
            delivery_location: None,
            selected_vendors: Vec::new(),
            invited_vendors: Vec::new(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn withdraw_returns_open_rfq_to_draft() {
        let mut record = rfq(1, RfqStatus::OnProcess);
        record.withdraw().expect("on-process -> draft");
        assert_eq!(record.status, RfqStatus::Draft);
    }

    #[test]
    fn closed_rfq_cannot_be_withdrawn() {
        let mut record = rfq(1, RfqStatus::Closed);
        let error = record.withdraw().expect_err("closed -> draft should fail");
        assert_eq!(
            error,
            DomainError::InvalidRfqTransition { from: RfqStatus::Closed, to: RfqStatus::Draft }
        );
    }

    #[test]
    fn draft_cannot_be_withdrawn_again() {
        let mut record = rfq(1, RfqStatus::Draft);
        assert!(record.withdraw().is_err());
    }

    #[test]
    fn approval_round_trip_keeps_record_open() {
        let mut record = rfq(3, RfqStatus::OnProcess);
        record.request_approval().expect("on-process -> under-approval");
        record.return_from_approval().expect("under-approval -> on-process");
        assert_eq!(record.status, RfqStatus::OnProcess);
        assert!(record.return_from_approval().is_err());
    }

    #[test]
    fn extend_requires_later_date_and_open_record() {
        let mut record = rfq(2, RfqStatus::OnProcess);
        let earlier = NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid date");
        let later = NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid date");

        assert!(matches!(record.extend(earlier), Err(DomainError::DueDateNotExtended { .. })));
        record.extend(later).expect("later date extends");
        assert_eq!(record.due_date, later);
        assert_eq!(record.status, RfqStatus::OnProcess);

        record.close().expect("on-process -> closed");
        let much_later = NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid date");
        assert_eq!(record.extend(much_later), Err(DomainError::RfqClosed { id: RfqId(2) }));
    }

    #[test]
    fn status_values_use_kebab_case() {
        let json = serde_json::to_string(&RfqStatus::UnderApproval).expect("serialize");
        assert_eq!(json, "\"under-approval\"");
        assert_eq!(RfqStatus::OnProcess.to_string(), "on-process");
    }

    #[test]
    fn query_matches_title_or_category_case_insensitively() {
        let record = rfq(4, RfqStatus::Draft);
        assert!(record.matches_query("laptops"));
        assert!(record.matches_query("it equip"));
        assert!(!record.matches_query("furniture"));
        assert!(record.matches_query("  "));
    }
}
