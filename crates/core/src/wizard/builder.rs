use chrono::{DateTime, Utc};

use crate::domain::rfq::{Rfq, RfqId, RfqStatus};
use crate::domain::vendor::VendorDirectory;
use crate::errors::DomainError;
use crate::validation::is_blank;
use crate::wizard::draft::RfqDraft;

/// Assembles an [`Rfq`] from accumulated draft state.
pub struct RfqBuilder<'a> {
    directory: &'a VendorDirectory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildOptions {
    pub id: RfqId,
    pub status: RfqStatus,
    /// Purchase, payment and delivery terms are dropped unless they are complete.
    pub include_terms: bool,
    /// Vendor data is only carried over once the vendor stage has been reached.
    pub include_vendors: bool,
    /// Kept when an existing record is being re-saved.
    pub created_at: Option<DateTime<Utc>>,
}

impl<'a> RfqBuilder<'a> {
    pub fn new(directory: &'a VendorDirectory) -> Self {
        Self { directory }
    }

    pub fn build(&self, draft: &RfqDraft, options: BuildOptions) -> Result<Rfq, DomainError> {
        let due_date = draft.due_date.ok_or_else(|| {
            DomainError::InvariantViolation("rfq cannot be built without a due date".to_owned())
        })?;
        if is_blank(&draft.title) {
            return Err(DomainError::InvariantViolation(
                "rfq cannot be built without a title".to_owned(),
            ));
        }

        let (selected_vendors, invited_vendors) = if options.include_vendors {
            let mut invited = self.directory.snapshots(&draft.selected_vendors);
            invited.extend(draft.email_invites());
            (draft.selected_vendors.clone(), invited)
        } else {
            (Vec::new(), Vec::new())
        };

        let terms = options.include_terms;
        let now = Utc::now();
        Ok(Rfq {
            id: options.id,
            title: draft.title.trim().to_owned(),
            category: draft.category.trim().to_owned(),
            priority: draft.priority,
            due_date,
            rfq_type: draft.rfq_type,
            content: draft.content(),
            purchase_type: draft.purchase_type.filter(|_| terms),
            payment_terms: non_blank(&draft.payment_terms).filter(|_| terms),
            payment_method: non_blank(&draft.payment_method).filter(|_| terms),
            delivery_date: draft.delivery_date.filter(|_| terms),
            delivery_location: draft.delivery().filter(|_| terms),
            selected_vendors,
            invited_vendors,
            status: options.status,
            created_at: options.created_at.unwrap_or(now),
            updated_at: now,
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    (!is_blank(value)).then(|| value.trim().to_owned())
}
