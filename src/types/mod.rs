mod name;
mod outcome;

pub use name::{BundleName, RoleName};
pub use outcome::{
    Action, OutcomeStatus, ProvisioningOutcome, Step, StepError, StepRecord, StepStatus,
};
