use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    TransitionOutcome, WizardAction, WizardContext, WizardEvent, WizardStage, WizardState,
};

pub trait FlowDefinition {
    fn initial_state(&self) -> WizardState;
    fn transition(
        &self,
        current: &WizardState,
        event: &WizardEvent,
        context: &WizardContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Linear Details -> Terms -> Vendors wizard with draft and invite exits.
#[derive(Clone, Debug, Default)]
pub struct RfqCreationFlow;

impl FlowDefinition for RfqCreationFlow {
    fn initial_state(&self) -> WizardState {
        WizardState::Editing(WizardStage::Details)
    }

    fn transition(
        &self,
        current: &WizardState,
        event: &WizardEvent,
        context: &WizardContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_rfq_creation(current, event, context)
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> WizardState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &WizardState,
        event: &WizardEvent,
        context: &WizardContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &WizardState,
        event: &WizardEvent,
        context: &WizardContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "wizard.transition_applied",
                        AuditCategory::Wizard,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event)),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "wizard.transition_rejected",
                        AuditCategory::Wizard,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<RfqCreationFlow> {
    fn default() -> Self {
        Self::new(RfqCreationFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before leaving {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: WizardState, missing_fields: Vec<String> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: WizardState, event: WizardEvent },
}

fn transition_rfq_creation(
    current: &WizardState,
    event: &WizardEvent,
    context: &WizardContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use WizardAction::{
        ActivateTab, CancelPendingClose, ClearFieldErrors, CloseModal, PersistDraft,
        PersistSubmission, ScheduleClose, ShowSuccessNotice,
    };
    use WizardEvent::{Back, Close, Next, SaveDraft, SendInvite};
    use WizardStage::{Details, Terms, Vendors};
    use WizardState::{Closed, DraftSaved, Editing, Submitted};

    let gated = matches!(event, Next | SaveDraft | SendInvite);
    if gated && current.stage().is_some() && !context.invalid_fields.is_empty() {
        return Err(FlowTransitionError::MissingRequiredFields {
            state: *current,
            missing_fields: context.invalid_fields.clone(),
        });
    }

    let (to, actions) = match (current, event) {
        (Editing(Details), Next) => (Editing(Terms), vec![ClearFieldErrors, ActivateTab(Terms)]),
        (Editing(Terms), Next) => (Editing(Vendors), vec![ClearFieldErrors, ActivateTab(Vendors)]),
        (Editing(Terms), Back) => (Editing(Details), vec![ActivateTab(Details)]),
        (Editing(Vendors), Back) => (Editing(Terms), vec![ActivateTab(Terms)]),
        (Editing(_), SaveDraft) => (DraftSaved, vec![ClearFieldErrors, PersistDraft, CloseModal]),
        (Editing(Vendors), SendInvite) => {
            (Submitted, vec![ClearFieldErrors, PersistSubmission, ShowSuccessNotice, ScheduleClose])
        }
        (Submitted, Close) => (Closed, vec![CancelPendingClose, CloseModal]),
        (Editing(_), Close) | (DraftSaved, Close) => (Closed, vec![CloseModal]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}

#[cfg(test)]
mod tests {
    use crate::audit::{AuditContext, InMemoryAuditSink};
    use crate::flows::engine::{FlowEngine, FlowTransitionError, RfqCreationFlow};
    use crate::flows::states::{
        WizardAction, WizardContext, WizardEvent, WizardStage, WizardState,
    };

    #[test]
    fn creation_flow_happy_path_to_submission() {
        let engine = FlowEngine::new(RfqCreationFlow);
        let context = WizardContext::default();
        let mut state = engine.initial_state();

        state = engine.apply(&state, &WizardEvent::Next, &context).expect("details -> terms").to;
        state = engine.apply(&state, &WizardEvent::Next, &context).expect("terms -> vendors").to;
        let submitted =
            engine.apply(&state, &WizardEvent::SendInvite, &context).expect("vendors -> submitted");

        assert_eq!(submitted.to, WizardState::Submitted);
        assert!(submitted.actions.contains(&WizardAction::ScheduleClose));

        let closed = engine
            .apply(&submitted.to, &WizardEvent::Close, &context)
            .expect("submitted -> closed");
        assert_eq!(closed.actions, vec![WizardAction::CancelPendingClose, WizardAction::CloseModal]);
    }

    #[test]
    fn back_walks_one_stage_and_stops_at_details() {
        let engine = FlowEngine::default();
        let context = WizardContext::default();

        let terms = engine
            .apply(&WizardState::Editing(WizardStage::Vendors), &WizardEvent::Back, &context)
            .expect("vendors -> terms");
        assert_eq!(terms.to, WizardState::Editing(WizardStage::Terms));

        let error = engine
            .apply(&WizardState::Editing(WizardStage::Details), &WizardEvent::Back, &context)
            .expect_err("details has no previous stage");
        assert!(matches!(error, FlowTransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn send_invite_is_only_available_on_vendor_stage() {
        let engine = FlowEngine::default();
        let error = engine
            .apply(
                &WizardState::Editing(WizardStage::Terms),
                &WizardEvent::SendInvite,
                &WizardContext::default(),
            )
            .expect_err("no skip-ahead");

        assert_eq!(
            error,
            FlowTransitionError::InvalidTransition {
                state: WizardState::Editing(WizardStage::Terms),
                event: WizardEvent::SendInvite,
            }
        );
    }

    #[test]
    fn invalid_fields_block_gated_events() {
        let engine = FlowEngine::default();
        let context = WizardContext::with_invalid_fields(vec!["title".to_owned()]);

        for event in [WizardEvent::Next, WizardEvent::SaveDraft] {
            let error = engine
                .apply(&WizardState::Editing(WizardStage::Details), &event, &context)
                .expect_err("gated by validation");
            assert!(matches!(error, FlowTransitionError::MissingRequiredFields { .. }));
        }

        let back = engine
            .apply(&WizardState::Editing(WizardStage::Terms), &WizardEvent::Back, &context)
            .expect("back is never gated");
        assert_eq!(back.to, WizardState::Editing(WizardStage::Details));
    }

    #[test]
    fn draft_save_is_allowed_from_every_stage() {
        let engine = FlowEngine::default();
        for stage in WizardStage::ALL {
            let outcome = engine
                .apply(&WizardState::Editing(stage), &WizardEvent::SaveDraft, &WizardContext::default())
                .expect("draft save");
            assert_eq!(outcome.to, WizardState::DraftSaved);
            assert!(outcome.actions.contains(&WizardAction::PersistDraft));
        }
    }

    #[test]
    fn transitions_emit_audit_events() {
        let engine = FlowEngine::default();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "req-42", "rfq-wizard");

        engine
            .apply_with_audit(
                &WizardState::Editing(WizardStage::Details),
                &WizardEvent::Next,
                &WizardContext::default(),
                &sink,
                &audit,
            )
            .expect("transition should succeed");
        let _ = engine.apply_with_audit(
            &WizardState::Closed,
            &WizardEvent::Next,
            &WizardContext::default(),
            &sink,
            &audit,
        );

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "wizard.transition_applied");
        assert_eq!(events[1].event_type, "wizard.transition_rejected");
        assert_eq!(events[1].correlation_id, "req-42");
    }
}
