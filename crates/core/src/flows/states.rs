use serde::{Deserialize, Serialize};

/// One step of the RFQ creation wizard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WizardStage {
    Details,
    Terms,
    Vendors,
}

impl WizardStage {
    pub const ALL: [WizardStage; 3] = [WizardStage::Details, WizardStage::Terms, WizardStage::Vendors];

    pub fn number(&self) -> u8 {
        match self {
            Self::Details => 1,
            Self::Terms => 2,
            Self::Vendors => 3,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Details),
            2 => Some(Self::Terms),
            3 => Some(Self::Vendors),
            _ => None,
        }
    }

    /// Tab identifier shown for this stage.
    pub fn tab(&self) -> &'static str {
        match self {
            Self::Details => "details",
            Self::Terms => "terms",
            Self::Vendors => "vendors",
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_number(self.number() + 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "kebab-case")]
pub enum WizardState {
    Editing(WizardStage),
    DraftSaved,
    Submitted,
    Closed,
}

impl WizardState {
    pub fn stage(&self) -> Option<WizardStage> {
        match self {
            Self::Editing(stage) => Some(*stage),
            _ => None,
        }
    }

    /// No event leaves a closed wizard.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardEvent {
    Next,
    Back,
    SaveDraft,
    SendInvite,
    Close,
}

/// Validation outcome the controller hands to the state machine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct WizardContext {
    pub invalid_fields: Vec<String>,
}

impl WizardContext {
    pub fn with_invalid_fields(invalid_fields: Vec<String>) -> Self {
        Self { invalid_fields }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WizardAction {
    ClearFieldErrors,
    ActivateTab(WizardStage),
    PersistDraft,
    PersistSubmission,
    ShowSuccessNotice,
    ScheduleClose,
    CancelPendingClose,
    CloseModal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WizardState,
    pub to: WizardState,
    pub event: WizardEvent,
    pub actions: Vec<WizardAction>,
}
