pub mod engine;
pub mod states;

pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, RfqCreationFlow};
pub use states::{
    TransitionOutcome, WizardAction, WizardContext, WizardEvent, WizardStage, WizardState,
};
