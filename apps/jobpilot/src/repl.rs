//! Interactive command surface. One task per line; `exit` / `quit` leave the loop.

use std::future::Future;
use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

use crate::controller::transcript::{InvocationOutcome, TranscriptEntry};
use crate::controller::{TaskController, TaskOutcome, TaskReport};
use crate::state::AppState;

const EXAMPLE_TASK: &str = "Load my résumé and the job description in data/jd.txt, \
    score the match, then draft a cover letter for the Senior Python Developer role at Acme.";

pub fn is_exit_command(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

pub fn banner(state: &AppState) -> String {
    let workspace = if state.config.workspace.is_some() {
        "enabled"
    } else {
        "disabled (set NOTION_API_KEY to enable)"
    };
    format!(
        "jobpilot v{}\n\
         model: {}\n\
         capabilities: {}\n\
         workspace logging: {}\n\
         \n\
         Type a task and press Enter. Ctrl-C cancels a running task; 'exit', 'quit' or Ctrl-C at the prompt leaves.\n\
         Example: {}\n",
        env!("CARGO_PKG_VERSION"),
        state.llm().model(),
        state.registry.len(),
        workspace,
        EXAMPLE_TASK
    )
}

/// Text shown to the user for a finished task.
pub fn render_report(report: &TaskReport) -> String {
    match &report.outcome {
        TaskOutcome::Completed { answer } => answer.trim().to_string(),
        TaskOutcome::Failed(reason) => {
            let mut lines = vec![format!("Task failed: {reason}")];
            let last_error = report.transcript.entries().iter().rev().find_map(|entry| match entry {
                TranscriptEntry::Invocation(record) => match &record.outcome {
                    InvocationOutcome::Error(observation) => {
                        Some(format!("last failed step: {} -> {observation}", record.capability))
                    }
                    InvocationOutcome::Success(_) => None,
                },
                TranscriptEntry::PlanningError { observation, .. } => {
                    Some(format!("last failed step: planning -> {observation}"))
                }
                TranscriptEntry::Thought { .. } => None,
            });
            lines.extend(last_error);
            lines.push(format!(
                "({} planning cycle(s), task id {})",
                report.iterations, report.task_id
            ));
            lines.join("\n")
        }
    }
}

/// Reads tasks from `input` until EOF, an exit command or Ctrl-C at the prompt.
/// Ctrl-C while a task runs cancels only that task. Results go to `output`.
pub async fn run<R, W>(controller: &TaskController, input: R, output: &mut W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    run_with_interrupt(controller, input, output, interrupted).await
}

/// Resolves on Ctrl-C. Never resolves if the signal cannot be watched.
async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for Ctrl-C: {err}");
        std::future::pending::<()>().await;
    }
}

async fn run_with_interrupt<R, W, I, F>(
    controller: &TaskController,
    input: R,
    output: &mut W,
    interrupt: I,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    I: Fn() -> F,
    F: Future<Output = ()>,
{
    let mut lines = input.lines();
    loop {
        write!(output, "> ")?;
        output.flush()?;

        let next = tokio::select! {
            line = lines.next_line() => line?,
            () = interrupt() => {
                writeln!(output)?;
                info!("Interrupted at the prompt, leaving");
                break;
            }
        };
        let Some(line) = next else {
            writeln!(output)?;
            info!("Input closed, leaving");
            break;
        };
        let task = line.trim();
        if task.is_empty() {
            continue;
        }
        if is_exit_command(task) {
            info!("Exit requested");
            break;
        }

        let report = controller.run_until_cancelled(task, interrupt()).await;
        info!("Task {} ended in {}", report.task_id, report.final_state());
        writeln!(output, "{}\n", render_report(&report))?;
    }
    writeln!(output, "Goodbye.")?;
    Ok(())
}
