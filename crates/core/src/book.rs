use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::rfq::{Rfq, RfqId, RfqStatus};
use crate::errors::DomainError;

/// Receiver for records produced by the creation wizard.
pub trait RfqSink {
    fn save(&mut self, rfq: Rfq) -> Result<(), DomainError>;
}

impl RfqSink for Vec<Rfq> {
    fn save(&mut self, rfq: Rfq) -> Result<(), DomainError> {
        self.push(rfq);
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RfqSort {
    DueDate,
    CreatedAt,
    Priority,
    Title,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabCounts {
    pub draft: usize,
    pub on_process: usize,
    pub under_approval: usize,
    pub closed: usize,
}

/// In-memory RFQ list backing the tabbed list and detail views.
#[derive(Clone, Default)]
pub struct RfqBook {
    records: Vec<Rfq>,
    audit: Option<(Arc<dyn AuditSink>, AuditContext)>,
}

impl RfqBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audit(mut self, sink: Arc<dyn AuditSink>, context: AuditContext) -> Self {
        self.audit = Some((sink, context));
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Rfq] {
        &self.records
    }

    pub fn get(&self, id: RfqId) -> Option<&Rfq> {
        self.records.iter().find(|rfq| rfq.id == id)
    }

    /// Inserts a new record or replaces an existing one when the status change is allowed.
    pub fn upsert(&mut self, rfq: Rfq) -> Result<(), DomainError> {
        match self.records.iter_mut().find(|existing| existing.id == rfq.id) {
            Some(existing) => {
                if existing.status != rfq.status && !existing.can_transition_to(rfq.status) {
                    return Err(DomainError::InvalidRfqTransition {
                        from: existing.status,
                        to: rfq.status,
                    });
                }
                let created_at = existing.created_at;
                *existing = Rfq { created_at, ..rfq };
                info!(event_name = "rfq.replaced", rfq_id = %existing.id, status = %existing.status, "rfq replaced");
            }
            None => {
                info!(event_name = "rfq.inserted", rfq_id = %rfq.id, status = %rfq.status, "rfq inserted");
                self.records.push(rfq);
            }
        }
        Ok(())
    }

    pub fn by_status(&self, status: RfqStatus) -> Vec<&Rfq> {
        self.records.iter().filter(|rfq| rfq.status == status).collect()
    }

    pub fn tab_counts(&self) -> TabCounts {
        self.records.iter().fold(TabCounts::default(), |mut counts, rfq| {
            match rfq.status {
                RfqStatus::Draft => counts.draft += 1,
                RfqStatus::OnProcess => counts.on_process += 1,
                RfqStatus::UnderApproval => counts.under_approval += 1,
                RfqStatus::Closed => counts.closed += 1,
            }
            counts
        })
    }

    pub fn search(&self, query: &str, status: Option<RfqStatus>) -> Vec<&Rfq> {
        self.records
            .iter()
            .filter(|rfq| status.map_or(true, |status| rfq.status == status))
            .filter(|rfq| rfq.matches_query(query))
            .collect()
    }

    /// Stable sort; ties keep insertion order.
    pub fn sorted_by(&self, sort: RfqSort, status: Option<RfqStatus>) -> Vec<&Rfq> {
        let mut rows = self.search("", status);
        rows.sort_by(|left, right| compare(left, right, sort));
        rows
    }

    pub fn withdraw(&mut self, id: RfqId) -> Result<&Rfq, DomainError> {
        self.act(id, "rfq.withdrawn", Rfq::withdraw)
    }

    pub fn close(&mut self, id: RfqId) -> Result<&Rfq, DomainError> {
        self.act(id, "rfq.closed", Rfq::close)
    }

    pub fn request_approval(&mut self, id: RfqId) -> Result<&Rfq, DomainError> {
        self.act(id, "rfq.approval_requested", Rfq::request_approval)
    }

    pub fn return_from_approval(&mut self, id: RfqId) -> Result<&Rfq, DomainError> {
        self.act(id, "rfq.approval_returned", Rfq::return_from_approval)
    }

    pub fn extend(&mut self, id: RfqId, new_due_date: NaiveDate) -> Result<&Rfq, DomainError> {
        self.act(id, "rfq.due_date_extended", |rfq| rfq.extend(new_due_date))
    }

    pub fn remove(&mut self, id: RfqId) -> Result<Rfq, DomainError> {
        let position = self
            .records
            .iter()
            .position(|rfq| rfq.id == id)
            .ok_or(DomainError::UnknownRfq { id })?;
        Ok(self.records.remove(position))
    }

    fn act<F>(&mut self, id: RfqId, event_type: &str, action: F) -> Result<&Rfq, DomainError>
    where
        F: FnOnce(&mut Rfq) -> Result<(), DomainError>,
    {
        let position = self
            .records
            .iter()
            .position(|rfq| rfq.id == id)
            .ok_or(DomainError::UnknownRfq { id })?;
        let rfq = &mut self.records[position];
        let previous = rfq.status;
        let result = action(rfq);

        if let Some((sink, context)) = &self.audit {
            let outcome =
                if result.is_ok() { AuditOutcome::Success } else { AuditOutcome::Rejected };
            let mut event =
                AuditEvent::new(&context.with_subject(id.to_string()), event_type, AuditCategory::Lifecycle, outcome)
                    .with_metadata("from", previous.as_str())
                    .with_metadata("to", rfq.status.as_str());
            if let Err(error) = &result {
                event = event.with_metadata("error", error.to_string());
            }
            sink.emit(event);
        }

        result?;
        info!(event_name = event_type, rfq_id = %id, status = %rfq.status, "rfq updated");
        Ok(&self.records[position])
    }
}

impl RfqSink for RfqBook {
    fn save(&mut self, rfq: Rfq) -> Result<(), DomainError> {
        self.upsert(rfq)
    }
}

fn compare(left: &Rfq, right: &Rfq, sort: RfqSort) -> Ordering {
    match sort {
        RfqSort::DueDate => left.due_date.cmp(&right.due_date),
        RfqSort::CreatedAt => left.created_at.cmp(&right.created_at),
        RfqSort::Priority => left.priority.rank().cmp(&right.priority.rank()),
        RfqSort::Title => left.title.to_lowercase().cmp(&right.title.to_lowercase()),
    }
}
