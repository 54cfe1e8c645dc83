//! Step catalog. The fixed, ordered list of interpretation steps.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One named step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    DetectIntent,
    ExtractName,
    ExtractDatetime,
    ExtractService,
    ValidateRequiredFields,
    ValidateOpeningHours,
    CreateLead,
    CreateBooking,
    BuildResponse,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DetectIntent => "detect_intent",
            Self::ExtractName => "extract_name",
            Self::ExtractDatetime => "extract_datetime",
            Self::ExtractService => "extract_service",
            Self::ValidateRequiredFields => "validate_required_fields",
            Self::ValidateOpeningHours => "validate_opening_hours",
            Self::CreateLead => "create_lead",
            Self::CreateBooking => "create_booking",
            Self::BuildResponse => "build_response",
        }
    }

    /// Event type recorded when this step fails unexpectedly.
    pub fn error_event(&self) -> String {
        format!("step_error_{}", self.as_str())
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, triggered sequence of steps.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowTemplate {
    pub name: &'static str,
    pub trigger: &'static str,
    pub steps: &'static [StepName],
}

/// The booking assistant workflow.
pub const WORKFLOW_TEMPLATE: WorkflowTemplate = WorkflowTemplate {
    name: "Booking Assistant v1",
    trigger: "incoming_message",
    steps: &[
        StepName::DetectIntent,
        StepName::ExtractName,
        StepName::ExtractDatetime,
        StepName::ExtractService,
        StepName::ValidateRequiredFields,
        StepName::ValidateOpeningHours,
        StepName::CreateLead,
        StepName::CreateBooking,
        StepName::BuildResponse,
    ],
};
