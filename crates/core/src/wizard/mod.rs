//! RFQ creation wizard: draft form state, stage validation, the stage
//! controller, record assembly and the modal session around them.

pub mod builder;
pub mod controller;
pub mod draft;
pub mod modal;
pub mod validator;

pub use builder::{BuildOptions, RfqBuilder};
pub use controller::{RfqWizard, WizardError, WizardSubmission};
pub use draft::RfqDraft;
pub use modal::{ModalView, Notice, RfqCreateModal};
pub use validator::{validate_for_draft, validate_for_submission, validate_stage, validate_through};
