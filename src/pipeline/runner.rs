//! Pipeline runner. Executes the step catalog over one inbound message.
//!
//! Flow:
//! 1. `message_received` is logged
//! 2. Business snapshot is fetched (missing → single `workflow_error`, no steps)
//! 3. Each step runs in catalog order, isolated: an `Err` or a panic becomes
//!    one `step_error_<step>` event and the next step still runs
//! 4. The run stops once the response has been built if validation failed
//!
//! The runner never fails. Everything that went wrong is in the event log.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::business::{BusinessDirectory, BusinessSnapshot};
use crate::error::PipelineError;
use crate::ledger::CustomerLedger;
use crate::pipeline::actions::{record_booking, record_lead};
use crate::pipeline::context::{Channel, RunContext};
use crate::pipeline::dates::DateParser;
use crate::pipeline::events::{EventLog, Severity};
use crate::pipeline::extract::{NameExtractor, apply_datetime, apply_service};
use crate::pipeline::intent::IntentClassifier;
use crate::pipeline::panic_message;
use crate::pipeline::response::build_response;
use crate::pipeline::template::{StepName, WORKFLOW_TEMPLATE, WorkflowTemplate};
use crate::pipeline::validate::{validate_opening_hours, validate_required_fields};

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final context plus the ordered audit trail.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub context: RunContext,
    pub events: EventLog,
}

impl RunResult {
    /// `failed` if any event is an error, else `partial` if validation
    /// failed, else `success`.
    pub fn status(&self) -> RunStatus {
        if self.events.has_errors() {
            RunStatus::Failed
        } else if !self.context.validation_errors.is_empty() {
            RunStatus::Partial
        } else {
            RunStatus::Success
        }
    }
}

/// Runs the workflow template against inbound messages.
pub struct WorkflowRunner {
    directory: Arc<dyn BusinessDirectory>,
    date_parser: Arc<dyn DateParser>,
    ledger: Arc<dyn CustomerLedger>,
    classifier: IntentClassifier,
    names: NameExtractor,
    template: WorkflowTemplate,
}

impl WorkflowRunner {
    pub fn new(
        directory: Arc<dyn BusinessDirectory>,
        date_parser: Arc<dyn DateParser>,
        ledger: Arc<dyn CustomerLedger>,
    ) -> Self {
        Self {
            directory,
            date_parser,
            ledger,
            classifier: IntentClassifier::default_rules(),
            names: NameExtractor::new(),
            template: WORKFLOW_TEMPLATE,
        }
    }

    /// Replace the step template.
    pub fn with_template(mut self, template: WorkflowTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn directory(&self) -> &Arc<dyn BusinessDirectory> {
        &self.directory
    }

    /// Fetch the business and run every step.
    pub async fn run(&self, business_id: &str, channel: Channel, raw_message: &str) -> RunResult {
        let ctx = RunContext::new(business_id, channel, raw_message);
        let mut log = EventLog::new();
        log_received(&ctx, &mut log);

        let snapshot = match self.directory.fetch(business_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                let err = PipelineError::BusinessNotFound {
                    business_id: business_id.to_string(),
                };
                return abort(ctx, log, err);
            }
            Err(e) => {
                let err = PipelineError::SnapshotUnavailable {
                    business_id: business_id.to_string(),
                    reason: e.to_string(),
                };
                return abort(ctx, log, err);
            }
        };

        self.execute(ctx, log, &snapshot).await
    }

    /// Run every step against a snapshot the caller already holds.
    pub async fn run_with_snapshot(
        &self,
        snapshot: &BusinessSnapshot,
        channel: Channel,
        raw_message: &str,
    ) -> RunResult {
        let ctx = RunContext::new(snapshot.id.clone(), channel, raw_message);
        let mut log = EventLog::new();
        log_received(&ctx, &mut log);
        self.execute(ctx, log, snapshot).await
    }

    async fn execute(
        &self,
        mut ctx: RunContext,
        mut log: EventLog,
        snapshot: &BusinessSnapshot,
    ) -> RunResult {
        info!(
            workflow = self.template.name,
            business = %snapshot.id,
            channel = %ctx.channel,
            "Running workflow"
        );

        for &step in self.template.steps {
            let outcome = AssertUnwindSafe(self.run_step(step, &mut ctx, snapshot, &mut log))
                .catch_unwind()
                .await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e.to_string()),
                Err(payload) => Some(panic_message(payload.as_ref())),
            };
            if let Some(reason) = failure {
                log.error(
                    step.error_event(),
                    format!("Error in step {step}: {reason}"),
                    json!({ "error": reason }),
                );
            }

            if step == StepName::BuildResponse && !ctx.validation_errors.is_empty() {
                debug!(
                    errors = ctx.validation_errors.len(),
                    "Response built with validation errors, stopping run"
                );
                break;
            }
        }

        let result = RunResult { context: ctx, events: log };
        info!(
            status = %result.status(),
            intent = %result.context.intent(),
            events = result.events.len(),
            "Workflow finished"
        );
        result
    }

    async fn run_step(
        &self,
        step: StepName,
        ctx: &mut RunContext,
        snapshot: &BusinessSnapshot,
        log: &mut EventLog,
    ) -> Result<(), PipelineError> {
        match step {
            StepName::DetectIntent => {
                let classification = self.classifier.classify(&ctx.raw_message);
                ctx.intent = Some(classification.intent);
                ctx.escalation = classification.escalation;
                log.info(
                    "intent_detected",
                    format!("Intent detected: {}", classification.intent),
                    json!({
                        "intent": classification.intent,
                        "escalation": classification.escalation,
                    }),
                );
            }
            StepName::ExtractName => {
                if let Some(name) = self.names.apply(ctx) {
                    log.info(
                        "name_extracted",
                        format!("Customer name extracted: {name}"),
                        json!({ "name": name }),
                    );
                }
            }
            StepName::ExtractDatetime => {
                if let Some(when) = apply_datetime(ctx, self.date_parser.as_ref()).await? {
                    let iso = when.format("%Y-%m-%dT%H:%M:%S").to_string();
                    log.info(
                        "datetime_parsed",
                        format!("DateTime parsed: {iso}"),
                        json!({ "datetime": iso }),
                    );
                }
            }
            StepName::ExtractService => {
                if let Some(service) = apply_service(ctx, &snapshot.services) {
                    log.info(
                        "service_matched",
                        format!("Service matched: {service}"),
                        json!({ "service": service }),
                    );
                }
            }
            StepName::ValidateRequiredFields => {
                if validate_required_fields(ctx) > 0 {
                    log.warning(
                        "validation_failed_missing_fields",
                        "Required fields validation failed",
                        json!({ "errors": ctx.validation_errors }),
                    );
                }
            }
            StepName::ValidateOpeningHours => {
                if validate_opening_hours(ctx, snapshot).is_some() {
                    log.warning(
                        "validation_failed_outside_hours",
                        "Opening hours validation failed",
                        json!({ "errors": ctx.validation_errors }),
                    );
                }
            }
            StepName::CreateLead => {
                record_lead(ctx, self.ledger.as_ref(), log).await;
            }
            StepName::CreateBooking => {
                record_booking(ctx, self.ledger.as_ref(), log).await;
            }
            StepName::BuildResponse => {
                let kind = build_response(ctx, snapshot, &self.classifier);
                log.info(
                    "response_generated",
                    "Response message generated",
                    json!({ "response": ctx.response_message, "kind": kind.as_str() }),
                );
            }
        }
        Ok(())
    }
}

fn log_received(ctx: &RunContext, log: &mut EventLog) {
    log.info(
        "message_received",
        format!("Message received via {}", ctx.channel),
        json!({
            "channel": ctx.channel,
            "message_length": ctx.raw_message.chars().count(),
        }),
    );
}

fn abort(ctx: RunContext, mut log: EventLog, err: PipelineError) -> RunResult {
    let reason = err.to_string();
    log.push(
        "workflow_error",
        Severity::Error,
        format!("Workflow execution error: {reason}"),
        Some(json!({ "error": reason })),
    );
    RunResult { context: ctx, events: log }
}
