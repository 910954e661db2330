//! Task Controller: drives one natural-language task to a final answer.
//!
//! # State machine
//! `Received → Planning → Acting(capability) → Planning → … → Completed | Failed`
//!
//! - `Planning` sends the task, the capability catalog and the transcript to the model and
//!   parses its reply into a `PlannerDecision`.
//! - `Acting` resolves the named capability, validates its arguments and invokes it under
//!   the capability timeout. The result or error is appended to the transcript.
//! - Recoverable errors (from planning or acting) are fed back as observations and count
//!   toward the consecutive-error cap. A success resets the count.
//! - Unrecoverable errors (credentials, timeouts) fail the task at once.
//! - The iteration cap bounds the number of planning cycles.
//! - A cancelled task still ends in `Failed` with the transcript recorded so far.

pub mod decision;
pub mod prompts;
pub mod transcript;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::capabilities::CapabilityError;
use crate::errors::AppError;
use crate::state::AppState;

use decision::{parse_decision, PlannerDecision};
use prompts::{PLANNER_PROMPT_TEMPLATE, PLANNER_SYSTEM};
use transcript::Transcript;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Received,
    Planning,
    Acting { capability: String },
    Completed,
    Failed,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Received => write!(f, "Received"),
            TaskState::Planning => write!(f, "Planning"),
            TaskState::Acting { capability } => write!(f, "Acting({capability})"),
            TaskState::Completed => write!(f, "Completed"),
            TaskState::Failed => write!(f, "Failed"),
        }
    }
}

/// Why a task ended in `Failed`.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no final answer within {max} planning cycles")]
    IterationCapExceeded { max: u32 },

    #[error("{count} consecutive errors; last: {last}")]
    ConsecutiveErrorCap { count: u32, last: AppError },

    #[error("unrecoverable error: {0}")]
    Unrecoverable(AppError),

    #[error("cancelled by user")]
    Cancelled,
}

#[derive(Debug)]
pub enum TaskOutcome {
    Completed { answer: String },
    Failed(ControllerError),
}

/// Everything the caller gets back for one task, including the transcript for diagnosis.
#[derive(Debug)]
pub struct TaskReport {
    pub task_id: Uuid,
    pub outcome: TaskOutcome,
    pub transcript: Transcript,
    pub iterations: u32,
}

impl TaskReport {
    pub fn final_state(&self) -> TaskState {
        match self.outcome {
            TaskOutcome::Completed { .. } => TaskState::Completed,
            TaskOutcome::Failed(_) => TaskState::Failed,
        }
    }
}

/// Per-task bookkeeping. Dropped when the task ends.
struct TaskRun {
    task_id: Uuid,
    state: TaskState,
    transcript: Transcript,
    iterations: u32,
    consecutive_errors: u32,
}

impl TaskRun {
    fn new() -> Self {
        Self {
            task_id: Uuid::new_v4(),
            state: TaskState::Received,
            transcript: Transcript::new(),
            iterations: 0,
            consecutive_errors: 0,
        }
    }

    fn transition(&mut self, next: TaskState) {
        debug!("Task {}: {} -> {}", self.task_id, self.state, next);
        self.state = next;
    }

    fn finish(mut self, outcome: TaskOutcome) -> TaskReport {
        match &outcome {
            TaskOutcome::Completed { .. } => {
                self.transition(TaskState::Completed);
                let failed = self.transcript.invocations().filter(|r| !r.succeeded()).count();
                info!(
                    "Task {} completed after {} planning cycle(s), {} failed invocation(s)",
                    self.task_id, self.iterations, failed
                );
            }
            TaskOutcome::Failed(reason) => {
                self.transition(TaskState::Failed);
                warn!("Task {} failed: {reason}", self.task_id);
            }
        }
        TaskReport {
            task_id: self.task_id,
            outcome,
            transcript: self.transcript,
            iterations: self.iterations,
        }
    }
}

pub struct TaskController {
    state: Arc<AppState>,
}

impl TaskController {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    #[cfg(test)]
    pub async fn run(&self, task: &str) -> TaskReport {
        self.run_until_cancelled(task, std::future::pending()).await
    }

    /// Runs `task` until the model gives a final answer or a cap or unrecoverable error ends it.
    /// If `cancel` resolves first the task ends as `Failed(Cancelled)`, keeping the transcript
    /// recorded up to that point.
    pub async fn run_until_cancelled<F>(&self, task: &str, cancel: F) -> TaskReport
    where
        F: Future<Output = ()>,
    {
        let mut run = TaskRun::new();
        info!("Task {} received: {}", run.task_id, task.trim());

        let outcome = tokio::select! {
            biased;
            () = cancel => TaskOutcome::Failed(ControllerError::Cancelled),
            outcome = self.drive(task, &mut run) => outcome,
        };
        run.finish(outcome)
    }

    async fn drive(&self, task: &str, run: &mut TaskRun) -> TaskOutcome {
        let max_iterations = self.state.config.max_iterations;
        let max_errors = self.state.config.max_consecutive_errors;

        if task.trim().is_empty() {
            let err = AppError::InvalidInput("task cannot be empty".to_string());
            return TaskOutcome::Failed(ControllerError::Unrecoverable(err));
        }

        while run.iterations < max_iterations {
            run.iterations += 1;
            run.transition(TaskState::Planning);

            let step = match self.plan(task, &run.transcript).await {
                Ok(PlannerDecision::Finish { thought, answer }) => {
                    run.transcript.record_thought(&thought);
                    return TaskOutcome::Completed { answer };
                }
                Ok(PlannerDecision::Act {
                    thought,
                    capability,
                    arguments,
                }) => {
                    run.transcript.record_thought(&thought);
                    run.transition(TaskState::Acting {
                        capability: capability.clone(),
                    });
                    let result = self.act(&capability, arguments.clone()).await;
                    run.transcript.record_invocation(&capability, arguments, &result);
                    result.map(|value| warn_if_needs_review(&capability, &value))
                }
                Err(err) => {
                    warn!("Task {}: planning failed: {err}", run.task_id);
                    run.transcript.record_planning_error(&err);
                    Err(err)
                }
            };

            match step {
                Ok(()) => run.consecutive_errors = 0,
                Err(err) if err.is_unrecoverable() => {
                    return TaskOutcome::Failed(ControllerError::Unrecoverable(err));
                }
                Err(err) => {
                    run.consecutive_errors += 1;
                    let count = run.consecutive_errors;
                    debug!("Task {}: {count}/{max_errors} consecutive errors", run.task_id);
                    if count >= max_errors {
                        return TaskOutcome::Failed(ControllerError::ConsecutiveErrorCap {
                            count,
                            last: err,
                        });
                    }
                }
            }
        }

        TaskOutcome::Failed(ControllerError::IterationCapExceeded {
            max: max_iterations,
        })
    }

    async fn plan(&self, task: &str, transcript: &Transcript) -> Result<PlannerDecision, AppError> {
        let prompt = self.build_planner_prompt(task, transcript)?;
        let text = self.state.llm().call(&prompt, PLANNER_SYSTEM).await?;
        Ok(parse_decision(&text)?)
    }

    fn build_planner_prompt(&self, task: &str, transcript: &Transcript) -> Result<String, AppError> {
        let catalog = serde_json::to_string_pretty(self.state.registry.descriptors())
            .map_err(anyhow::Error::from)?;
        Ok(PLANNER_PROMPT_TEMPLATE
            .replace("{task}", task.trim())
            .replace("{capabilities}", &catalog)
            .replace("{transcript}", &transcript.render()))
    }

    async fn act(&self, name: &str, arguments: Value) -> Result<Value, AppError> {
        let descriptor = self.state.registry.resolve(name)?;
        let timeout = self.state.config.capability_timeout;

        match tokio::time::timeout(timeout, self.state.toolbox.invoke(descriptor, arguments)).await {
            Ok(result) => result,
            Err(_) => Err(CapabilityError::Timeout {
                capability: descriptor.name.clone(),
                after: timeout,
            }
            .into()),
        }
    }
}

fn warn_if_needs_review(capability: &str, value: &Value) {
    if value.get("needs_review").and_then(Value::as_bool) == Some(true) {
        warn!("{capability} returned an empty draft; flagged for human review");
    }
}
