pub mod engine;
pub mod states;

pub use engine::{apply, can_advance, step_errors, submission, WizardError};
pub use states::{WizardEvent, WizardForm, WizardState, WizardStep};
