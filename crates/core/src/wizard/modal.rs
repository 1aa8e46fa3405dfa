use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::book::RfqSink;
use crate::bus::{AppEvent, EventBus};
use crate::domain::rfq::RfqId;
use crate::flows::WizardAction;
use crate::scheduler::{ScheduledTask, Scheduler};
use crate::wizard::controller::{RfqWizard, WizardError, WizardSubmission};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    Success(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalView {
    pub open: bool,
    pub notice: Option<Notice>,
}

/// The creation modal around a wizard: persists through a sink, shows the
/// success notice and closes itself after `close_delay` unless closed first.
pub struct RfqCreateModal<'a> {
    wizard: RfqWizard<'a>,
    view: Arc<Mutex<ModalView>>,
    scheduler: Scheduler,
    close_delay: Duration,
    pending_close: Option<ScheduledTask>,
    bus: Option<EventBus>,
}

impl<'a> RfqCreateModal<'a> {
    pub fn open(wizard: RfqWizard<'a>, scheduler: Scheduler, close_delay: Duration) -> Self {
        Self {
            wizard,
            view: Arc::new(Mutex::new(ModalView { open: true, notice: None })),
            scheduler,
            close_delay,
            pending_close: None,
            bus: None,
        }
    }

    pub fn with_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn wizard(&self) -> &RfqWizard<'a> {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut RfqWizard<'a> {
        &mut self.wizard
    }

    pub fn view(&self) -> ModalView {
        read_view(&self.view)
    }

    pub fn is_open(&self) -> bool {
        self.view().open
    }

    pub fn has_pending_close(&self) -> bool {
        self.pending_close.as_ref().is_some_and(ScheduledTask::is_pending)
    }

    pub fn save_draft<S>(&mut self, sink: &mut S) -> Result<RfqId, WizardError>
    where
        S: RfqSink + ?Sized,
    {
        let submission = self.wizard.save_draft_to(sink)?;
        let id = self.publish_saved(&submission);
        if submission.outcome.actions.contains(&WizardAction::CloseModal) {
            update_view(&self.view, |view| view.open = false);
        }
        Ok(id)
    }

    pub fn send_invite<S>(&mut self, sink: &mut S) -> Result<RfqId, WizardError>
    where
        S: RfqSink + ?Sized,
    {
        let submission = self.wizard.send_invite_to(sink)?;
        let id = self.publish_saved(&submission);

        if submission.outcome.actions.contains(&WizardAction::ShowSuccessNotice) {
            let message = format!(
                "RFQ sent to {} vendor(s)",
                submission.rfq.invited_vendors.len().max(submission.rfq.selected_vendors.len())
            );
            update_view(&self.view, |view| view.notice = Some(Notice::Success(message)));
        }
        if submission.outcome.actions.contains(&WizardAction::ScheduleClose) {
            let view = Arc::clone(&self.view);
            self.pending_close =
                Some(self.scheduler.schedule("rfq-modal-close", self.close_delay, move || {
                    update_view(&view, |view| {
                        view.open = false;
                        view.notice = None;
                    });
                }));
        }
        Ok(id)
    }

    /// Closes immediately and cancels a pending delayed close.
    pub fn close(&mut self) -> Result<(), WizardError> {
        if !self.wizard.state().is_terminal() {
            self.wizard.close()?;
        }
        if let Some(mut task) = self.pending_close.take() {
            if task.cancel() {
                info!(event_name = "rfq.modal_close_cancelled", "pending modal close cancelled");
            }
        }
        update_view(&self.view, |view| {
            view.open = false;
            view.notice = None;
        });
        Ok(())
    }

    fn publish_saved(&self, submission: &WizardSubmission) -> RfqId {
        let (id, status) = (submission.rfq.id, submission.rfq.status);
        if let Some(bus) = &self.bus {
            bus.publish(AppEvent::RfqSaved { id, status });
        }
        id
    }
}

fn read_view(view: &Mutex<ModalView>) -> ModalView {
    match view.lock() {
        Ok(view) => view.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

fn update_view(view: &Mutex<ModalView>, change: impl FnOnce(&mut ModalView)) {
    match view.lock() {
        Ok(mut view) => change(&mut view),
        Err(poisoned) => change(&mut poisoned.into_inner()),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{Notice, RfqCreateModal};
    use crate::book::RfqBook;
    use crate::bus::{AppEvent, EventBus, EventTopic};
    use crate::domain::rfq::{Rfq, RfqStatus};
    use crate::errors::DomainError;
    use crate::flows::{WizardStage, WizardState};
    use crate::domain::vendor::{VendorDirectory, VendorId};
    use crate::ids::MonotonicIds;
    use crate::scheduler::Scheduler;
    use crate::wizard::controller::{RfqWizard, WizardError};
    use crate::wizard::validator::tests::{laptops_draft, with_terms};

    const CLOSE_DELAY: Duration = Duration::from_millis(2000);

    fn advance_to_vendors(modal: &mut RfqCreateModal<'_>) {
        modal.wizard_mut().next().expect("details -> terms");
        modal.wizard_mut().next().expect("terms -> vendors");
    }

    #[tokio::test(start_paused = true)]
    async fn send_without_vendors_never_reaches_sink() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        let mut modal = RfqCreateModal::open(wizard, Scheduler::current().expect("runtime"), CLOSE_DELAY);
        advance_to_vendors(&mut modal);

        let mut saved: Vec<Rfq> = Vec::new();
        let error = modal.send_invite(&mut saved).expect_err("no vendors");

        assert!(error.field_errors().is_some_and(|errors| errors.contains("selected_vendors")));
        assert!(saved.is_empty());
        assert!(modal.is_open());
        assert!(!modal.has_pending_close());
    }

    #[tokio::test(start_paused = true)]
    async fn successful_send_closes_after_delay() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let bus = EventBus::default();
        let mut saved_events = bus.subscribe_to([EventTopic::RfqSaved]);
        let wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        let mut modal = RfqCreateModal::open(wizard, Scheduler::current().expect("runtime"), CLOSE_DELAY)
            .with_bus(bus.clone());
        advance_to_vendors(&mut modal);
        modal.wizard_mut().draft_mut().toggle_vendor(VendorId(1));

        let mut book = RfqBook::new();
        let id = modal.send_invite(&mut book).expect("send");

        assert_eq!(book.get(id).map(|rfq| rfq.status), Some(RfqStatus::OnProcess));
        assert_eq!(saved_events.drain(), vec![AppEvent::RfqSaved { id, status: RfqStatus::OnProcess }]);
        assert!(matches!(modal.view().notice, Some(Notice::Success(_))));
        assert!(modal.has_pending_close());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(modal.is_open());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!modal.is_open());
        assert_eq!(modal.view().notice, None);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_early_cancels_pending_close() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let wizard = RfqWizard::with_draft(with_terms(laptops_draft()), &ids, &directory);
        let mut modal = RfqCreateModal::open(wizard, Scheduler::current().expect("runtime"), CLOSE_DELAY);
        advance_to_vendors(&mut modal);
        modal.wizard_mut().draft_mut().toggle_vendor(VendorId(2));

        let mut saved: Vec<Rfq> = Vec::new();
        modal.send_invite(&mut saved).expect("send");
        tokio::time::sleep(Duration::from_millis(100)).await;

        modal.close().expect("close early");
        assert!(!modal.is_open());
        assert!(!modal.has_pending_close());
        modal.close().expect("closing twice is a no-op");

        tokio::time::sleep(Duration::from_millis(5000)).await;
        assert!(!modal.is_open());
        assert_eq!(saved.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn draft_save_closes_immediately_without_vendors() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let wizard = RfqWizard::with_draft(laptops_draft(), &ids, &directory);
        let mut modal = RfqCreateModal::open(wizard, Scheduler::current().expect("runtime"), CLOSE_DELAY);

        let mut book = RfqBook::new();
        let id = modal.save_draft(&mut book).expect("draft");

        assert_eq!(book.get(id).map(|rfq| rfq.status), Some(RfqStatus::Draft));
        assert!(!modal.is_open());
        assert!(!modal.has_pending_close());
        modal.close().expect("closing a saved draft modal is allowed");
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_save_keeps_wizard_editable() {
        let ids = MonotonicIds::starting_at(1);
        let directory = VendorDirectory::mock();
        let mut book = RfqBook::new();
        let mut first = RfqCreateModal::open(
            RfqWizard::with_draft(laptops_draft(), &ids, &directory),
            Scheduler::current().expect("runtime"),
            CLOSE_DELAY,
        );
        let id = first.save_draft(&mut book).expect("draft");
        let closed = book.close(id).expect("close").clone();

        let bus = EventBus::default();
        let mut saved_events = bus.subscribe_to([EventTopic::RfqSaved]);
        let wizard = RfqWizard::resume(&closed, &ids, &directory);
        let mut modal = RfqCreateModal::open(wizard, Scheduler::current().expect("runtime"), CLOSE_DELAY)
            .with_bus(bus.clone());

        let error = modal.save_draft(&mut book).expect_err("closed records cannot become drafts");
        assert_eq!(
            error,
            WizardError::Domain(DomainError::InvalidRfqTransition {
                from: RfqStatus::Closed,
                to: RfqStatus::Draft,
            })
        );
        assert_eq!(modal.wizard().state(), WizardState::Editing(WizardStage::Details));
        assert!(modal.is_open());
        assert!(saved_events.drain().is_empty());
        assert_eq!(book.get(id).map(|rfq| rfq.status), Some(RfqStatus::Closed));

        let mut copy: Vec<Rfq> = Vec::new();
        let retried = modal.save_draft(&mut copy).expect("retry into another sink");
        assert_eq!(retried, id);
        assert_eq!(modal.wizard().state(), WizardState::DraftSaved);
        assert!(!modal.is_open());
    }
}
