use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::book::RfqSink;
use crate::domain::rfq::{Rfq, RfqId, RfqStatus};
use crate::domain::vendor::VendorDirectory;
use crate::errors::DomainError;
use crate::flows::{
    FlowEngine, FlowTransitionError, RfqCreationFlow, TransitionOutcome, WizardAction,
    WizardContext, WizardEvent, WizardStage, WizardState,
};
use crate::ids::IdGenerator;
use crate::validation::FieldErrors;
use crate::wizard::builder::{BuildOptions, RfqBuilder};
use crate::wizard::draft::RfqDraft;
use crate::wizard::validator::{
    validate_for_draft, validate_for_submission, validate_stage, validate_through,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("validation failed for {:?}", .0.fields())]
    Validation(FieldErrors),
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl WizardError {
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

/// Record produced by a draft save or an invite send.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WizardSubmission {
    pub rfq: Rfq,
    pub outcome: TransitionOutcome,
}

/// Drives the three-stage creation flow over a single draft.
pub struct RfqWizard<'a> {
    engine: FlowEngine<RfqCreationFlow>,
    state: WizardState,
    furthest: WizardStage,
    draft: RfqDraft,
    errors: FieldErrors,
    existing: Option<(RfqId, DateTime<Utc>)>,
    ids: &'a dyn IdGenerator,
    directory: &'a VendorDirectory,
    audit: Option<(&'a dyn AuditSink, AuditContext)>,
}

impl<'a> RfqWizard<'a> {
    pub fn new(ids: &'a dyn IdGenerator, directory: &'a VendorDirectory) -> Self {
        Self::with_draft(RfqDraft::default(), ids, directory)
    }

    pub fn with_draft(
        draft: RfqDraft,
        ids: &'a dyn IdGenerator,
        directory: &'a VendorDirectory,
    ) -> Self {
        let engine = FlowEngine::default();
        let state = engine.initial_state();
        Self {
            engine,
            state,
            furthest: WizardStage::Details,
            draft,
            errors: FieldErrors::new(),
            existing: None,
            ids,
            directory,
            audit: None,
        }
    }

    /// Re-opens a saved record for editing; saves keep its id. The vendor stage
    /// counts as reached when the record carries vendors or complete terms.
    pub fn resume(rfq: &Rfq, ids: &'a dyn IdGenerator, directory: &'a VendorDirectory) -> Self {
        let mut wizard = Self::with_draft(RfqDraft::from_record(rfq), ids, directory);
        wizard.existing = Some((rfq.id, rfq.created_at));
        wizard.furthest = reached_stage(&wizard.draft);
        wizard
    }

    pub fn with_audit(mut self, sink: &'a dyn AuditSink, context: AuditContext) -> Self {
        self.audit = Some((sink, context));
        self
    }

    pub fn draft(&self) -> &RfqDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut RfqDraft {
        &mut self.draft
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn state(&self) -> WizardState {
        self.state
    }

    pub fn current_stage(&self) -> Option<WizardStage> {
        self.state.stage()
    }

    pub fn active_tab(&self) -> Option<&'static str> {
        self.current_stage().map(|stage| stage.tab())
    }

    pub fn furthest_stage(&self) -> WizardStage {
        self.furthest
    }

    pub fn next(&mut self) -> Result<TransitionOutcome, WizardError> {
        let errors = match self.current_stage() {
            Some(stage) => validate_stage(&self.draft, stage),
            None => FieldErrors::new(),
        };
        self.step(WizardEvent::Next, errors)
    }

    pub fn back(&mut self) -> Result<TransitionOutcome, WizardError> {
        self.step(WizardEvent::Back, FieldErrors::new())
    }

    pub fn close(&mut self) -> Result<TransitionOutcome, WizardError> {
        self.step(WizardEvent::Close, FieldErrors::new())
    }

    pub fn save_draft(&mut self) -> Result<WizardSubmission, WizardError> {
        let submission = self.prepare_draft()?;
        self.commit(&submission.outcome);
        announce(&submission.rfq);
        Ok(submission)
    }

    pub fn send_invite(&mut self) -> Result<WizardSubmission, WizardError> {
        let submission = self.prepare_invite()?;
        self.commit(&submission.outcome);
        announce(&submission.rfq);
        Ok(submission)
    }

    /// Saves the draft through `sink`. The wizard only leaves its stage once the
    /// sink has accepted the record.
    pub fn save_draft_to<S>(&mut self, sink: &mut S) -> Result<WizardSubmission, WizardError>
    where
        S: RfqSink + ?Sized,
    {
        let submission = self.prepare_draft()?;
        self.persist(sink, submission)
    }

    /// Sends the invitations through `sink`; a rejected save leaves the wizard on
    /// the vendor stage.
    pub fn send_invite_to<S>(&mut self, sink: &mut S) -> Result<WizardSubmission, WizardError>
    where
        S: RfqSink + ?Sized,
    {
        let submission = self.prepare_invite()?;
        self.persist(sink, submission)
    }

    fn prepare_draft(&mut self) -> Result<WizardSubmission, WizardError> {
        let errors = match self.current_stage() {
            Some(stage) => validate_for_draft(&self.draft, stage),
            None => FieldErrors::new(),
        };
        let outcome = self.plan(WizardEvent::SaveDraft, errors)?;
        let include_terms = validate_stage(&self.draft, WizardStage::Terms).is_valid();
        let include_vendors = self.furthest == WizardStage::Vendors;
        let rfq = self.build(RfqStatus::Draft, include_terms, include_vendors)?;
        debug!(
            event_name = "rfq.draft_prepared",
            rfq_id = %rfq.id,
            include_terms,
            include_vendors,
            "rfq draft assembled"
        );
        Ok(WizardSubmission { rfq, outcome })
    }

    fn prepare_invite(&mut self) -> Result<WizardSubmission, WizardError> {
        let errors = match self.current_stage() {
            Some(WizardStage::Vendors) => validate_for_submission(&self.draft),
            _ => FieldErrors::new(),
        };
        let outcome = self.plan(WizardEvent::SendInvite, errors)?;
        let rfq = self.build(RfqStatus::OnProcess, true, true)?;
        Ok(WizardSubmission { rfq, outcome })
    }

    fn persist<S>(
        &mut self,
        sink: &mut S,
        submission: WizardSubmission,
    ) -> Result<WizardSubmission, WizardError>
    where
        S: RfqSink + ?Sized,
    {
        if let Err(error) = sink.save(submission.rfq.clone()) {
            warn!(
                event_name = "rfq.persist_rejected",
                rfq_id = %submission.rfq.id,
                error = %error,
                "sink rejected rfq; wizard stays on its stage"
            );
            if let Some((audit_sink, audit)) = &self.audit {
                audit_sink.emit(
                    AuditEvent::new(
                        audit,
                        "wizard.persist_rejected",
                        AuditCategory::Wizard,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("rfq_id", submission.rfq.id.to_string())
                    .with_metadata("error", error.to_string()),
                );
            }
            return Err(error.into());
        }
        self.commit(&submission.outcome);
        announce(&submission.rfq);
        Ok(submission)
    }

    fn step(
        &mut self,
        event: WizardEvent,
        errors: FieldErrors,
    ) -> Result<TransitionOutcome, WizardError> {
        let outcome = self.plan(event, errors)?;
        self.commit(&outcome);
        Ok(outcome)
    }

    /// Runs the transition table without moving the wizard. Validation failures
    /// still replace the visible errors.
    fn plan(
        &mut self,
        event: WizardEvent,
        errors: FieldErrors,
    ) -> Result<TransitionOutcome, WizardError> {
        let context = WizardContext::with_invalid_fields(errors.fields());
        let result = match &self.audit {
            Some((sink, audit)) => {
                self.engine.apply_with_audit(&self.state, &event, &context, *sink, audit)
            }
            None => self.engine.apply(&self.state, &event, &context),
        };

        match result {
            Ok(outcome) => Ok(outcome),
            Err(FlowTransitionError::MissingRequiredFields { .. }) => {
                debug!(
                    event_name = "rfq.wizard_blocked",
                    fields = ?errors.fields(),
                    "wizard transition blocked by validation"
                );
                self.errors = errors.clone();
                Err(WizardError::Validation(errors))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn commit(&mut self, outcome: &TransitionOutcome) {
        if outcome.actions.contains(&WizardAction::ClearFieldErrors) {
            self.errors.clear();
        }
        self.state = outcome.to;
        if let Some(stage) = self.state.stage() {
            self.furthest = self.furthest.max(stage);
        }
        debug!(
            event_name = "rfq.wizard_transition",
            from = ?outcome.from,
            to = ?outcome.to,
            "wizard transition applied"
        );
    }

    fn build(
        &self,
        status: RfqStatus,
        include_terms: bool,
        include_vendors: bool,
    ) -> Result<Rfq, DomainError> {
        let (id, created_at) = match self.existing {
            Some((id, created_at)) => (id, Some(created_at)),
            None => (RfqId(self.ids.next_id()), None),
        };
        RfqBuilder::new(self.directory).build(
            &self.draft,
            BuildOptions { id, status, include_terms, include_vendors, created_at },
        )
    }
}

fn announce(rfq: &Rfq) {
    match rfq.status {
        RfqStatus::Draft => info!(event_name = "rfq.draft_saved", rfq_id = %rfq.id, "rfq saved as draft"),
        _ => info!(
            event_name = "rfq.invite_sent",
            rfq_id = %rfq.id,
            vendors = rfq.selected_vendors.len(),
            "rfq invitations sent"
        ),
    }
}

fn reached_stage(draft: &RfqDraft) -> WizardStage {
    let terms_complete = validate_through(draft, WizardStage::Terms).is_valid();
    if terms_complete || !draft.selected_vendors.is_empty() {
        WizardStage::Vendors
    } else {
        WizardStage::Details
    }
}

#[cfg(test)]
mod tests {
    use super::{RfqWizard, WizardError};
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::book::RfqSink;
    use crate::domain::rfq::{PurchaseType, Rfq, RfqId, RfqStatus};
    use crate::errors::DomainError;
    use crate::domain::vendor::{VendorDirectory, VendorId};
    use crate::flows::{FlowTransitionError, WizardStage, WizardState};
    use crate::ids::MonotonicIds;
    use crate::wizard::validator::tests::{laptops_draft, with_terms};

    #[test]
    fn next_is_gated_by_stage_validation() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::new(&ids, &directory);

        let error = wizard.next().expect_err("empty details");
        assert!(matches!(error, WizardError::Validation(_)));
        assert_eq!(wizard.current_stage(), Some(WizardStage::Details));
        assert!(wizard.errors().contains("title"));

        *wizard.draft_mut() = laptops_draft();
        wizard.next().expect("details -> terms");
        assert_eq!(wizard.current_stage(), Some(WizardStage::Terms));
        assert_eq!(wizard.active_tab(), Some("terms"));
        assert!(wizard.errors().is_empty(), "errors clear after a successful step");
    }

    #[test]
    fn back_returns_to_previous_stage_without_validation() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(laptops_draft(), &ids, &directory);

        wizard.next().expect("details -> terms");
        wizard.back().expect("terms -> details");
        assert_eq!(wizard.active_tab(), Some("details"));
        assert_eq!(wizard.furthest_stage(), WizardStage::Terms);

        let error = wizard.back().expect_err("no stage before details");
        assert!(matches!(error, WizardError::Flow(FlowTransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn save_draft_never_requires_vendors() {
        let ids = MonotonicIds::starting_at(500);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        wizard.next().expect("details -> terms");
        wizard.next().expect("terms -> vendors");

        let saved = wizard.save_draft().expect("draft without vendors");
        assert_eq!(saved.rfq.status, RfqStatus::Draft);
        assert_eq!(saved.rfq.id, RfqId(500));
        assert!(saved.rfq.selected_vendors.is_empty());
        assert_eq!(wizard.state(), WizardState::DraftSaved);
    }

    #[test]
    fn draft_from_details_stage_skips_terms_and_vendor_data() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut draft = laptops_draft();
        draft.toggle_vendor(VendorId(3));
        let mut wizard = RfqWizard::with_draft(draft, &ids, &directory);

        let saved = wizard.save_draft().expect("stage-1 only draft");
        assert!(saved.rfq.selected_vendors.is_empty(), "vendor stage was never reached");
        assert_eq!(saved.rfq.purchase_type, None);
    }

    #[test]
    fn send_invite_without_vendors_sets_vendor_error() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        wizard.next().expect("details -> terms");
        wizard.next().expect("terms -> vendors");

        let error = wizard.send_invite().expect_err("no vendors selected");
        let errors = error.field_errors().expect("validation error");
        assert!(errors.contains("selected_vendors"));
        assert!(wizard.errors().contains("selected_vendors"));
        assert_eq!(wizard.current_stage(), Some(WizardStage::Vendors));
    }

    #[test]
    fn send_invite_produces_on_process_record() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        wizard.next().expect("details -> terms");
        wizard.next().expect("terms -> vendors");
        wizard.draft_mut().toggle_vendor(VendorId(1));

        let sent = wizard.send_invite().expect("all stages valid");
        assert_eq!(sent.rfq.status, RfqStatus::OnProcess);
        assert_eq!(sent.rfq.invited_vendors.len(), 1);
        assert_eq!(wizard.state(), WizardState::Submitted);
        assert_eq!(wizard.active_tab(), None);
    }

    #[test]
    fn send_invite_before_vendor_stage_is_rejected() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);

        let error = wizard.send_invite().expect_err("no skip-ahead");
        assert!(matches!(error, WizardError::Flow(FlowTransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn resumed_draft_keeps_identity_on_submission() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut first = RfqWizard::with_draft(laptops_draft(), &ids, &directory);
        let draft = first.save_draft().expect("draft").rfq;

        let mut resumed = RfqWizard::resume(&draft, &ids, &directory);
        let completed = with_terms(resumed.draft().clone());
        *resumed.draft_mut() = completed;
        resumed.next().expect("details -> terms");
        resumed.next().expect("terms -> vendors");
        resumed.draft_mut().toggle_vendor(VendorId(2));

        let sent = resumed.send_invite().expect("resubmission").rfq;
        assert_eq!(sent.id, draft.id);
        assert_eq!(sent.created_at, draft.created_at);
    }

    #[test]
    fn audited_wizard_records_each_transition() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let sink = InMemoryAuditSink::default();
        let mut wizard = RfqWizard::with_draft(laptops_draft(), &ids, &directory)
            .with_audit(&sink, AuditContext::new(None, "req-7", "rfq-wizard"));

        wizard.next().expect("details -> terms");
        let _ = wizard.next();

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "wizard.transition_applied");
        assert_eq!(events[1].event_type, "wizard.transition_rejected");
    }

    struct RefusingSink;

    impl RfqSink for RefusingSink {
        fn save(&mut self, _rfq: Rfq) -> Result<(), DomainError> {
            Err(DomainError::InvariantViolation("storage offline".to_owned()))
        }
    }

    #[test]
    fn refused_invite_stays_on_vendor_stage_and_is_audited() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let sink = InMemoryAuditSink::default();
        let mut wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory)
            .with_audit(&sink, AuditContext::new(None, "req-9", "rfq-wizard"));
        wizard.next().expect("details -> terms");
        wizard.next().expect("terms -> vendors");
        wizard.draft_mut().toggle_vendor(VendorId(4));

        let error = wizard.send_invite_to(&mut RefusingSink).expect_err("sink refuses");
        assert!(matches!(error, WizardError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(wizard.state(), WizardState::Editing(WizardStage::Vendors));

        let last = sink.events().pop().expect("audit event");
        assert_eq!(last.event_type, "wizard.persist_rejected");
        assert_eq!(last.outcome, AuditOutcome::Failed);

        let mut saved: Vec<Rfq> = Vec::new();
        wizard.send_invite_to(&mut saved).expect("retry succeeds");
        assert_eq!(wizard.state(), WizardState::Submitted);
        assert_eq!(saved.len(), 1);
    }

    #[test]
    fn resumed_draft_with_complete_terms_keeps_later_vendor_picks() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut first = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        first.next().expect("details -> terms");
        first.next().expect("terms -> vendors");
        let draft = first.save_draft().expect("draft on vendor stage").rfq;
        assert!(draft.selected_vendors.is_empty());

        let mut resumed = RfqWizard::resume(&draft, &ids, &directory);
        assert_eq!(resumed.furthest_stage(), WizardStage::Vendors);
        resumed.draft_mut().toggle_vendor(VendorId(2));

        let saved = resumed.save_draft().expect("draft from details").rfq;
        assert_eq!(saved.selected_vendors, vec![VendorId(2)]);
    }

    #[test]
    fn draft_after_back_drops_incomplete_terms() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut wizard = RfqWizard::with_draft(laptops_draft(), &ids, &directory);
        wizard.next().expect("details -> terms");
        wizard.draft_mut().purchase_type = Some(PurchaseType::OneTime);
        wizard.draft_mut().payment_terms = "Net 45".to_owned();
        wizard.back().expect("terms -> details");

        let saved = wizard.save_draft().expect("stage-1 draft").rfq;
        assert_eq!(saved.purchase_type, None);
        assert_eq!(saved.payment_terms, None);
    }
}
