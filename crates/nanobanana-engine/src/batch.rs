use std::ops::Range;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use nanobanana_contracts::request::MAX_PARALLEL;

use crate::error::GenerationError;

/// How finished attempts are folded into the output list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Paths in completion order.
    AppendOnSuccess,
    /// Paths in attempt index order, gaps dropped.
    FixedSlot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptSuccess {
    pub path: PathBuf,
    pub model_used: String,
    pub used_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Pending,
    Succeeded(PathBuf),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationAttempt {
    pub index: usize,
    pub prompt: String,
    pub outcome: AttemptOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub files: Vec<PathBuf>,
    pub requested: usize,
    pub first_error: Option<String>,
    pub model_used: Option<String>,
    pub used_fallback: bool,
    pub attempts: Vec<GenerationAttempt>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.len()
    }

    pub fn is_success(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.files.len() == self.requested
    }
}

/// Runs attempts in windows of at most `width` concurrent workers.
///
/// A window is fully settled before the next one starts. A failed attempt
/// never cancels its siblings.
#[derive(Debug, Clone, Copy)]
pub struct BatchCoordinator {
    width: usize,
    aggregation: Aggregation,
}

impl BatchCoordinator {
    pub fn new(width: usize, aggregation: Aggregation) -> Self {
        Self {
            width: width.clamp(1, MAX_PARALLEL as usize),
            aggregation,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn run<F>(&self, prompts: &[String], attempt: F) -> BatchReport
    where
        F: Fn(usize, &str) -> Result<AttemptSuccess, GenerationError> + Sync,
    {
        let requested = prompts.len();
        let mut attempts: Vec<GenerationAttempt> = prompts
            .iter()
            .enumerate()
            .map(|(index, prompt)| GenerationAttempt {
                index,
                prompt: prompt.clone(),
                outcome: AttemptOutcome::Pending,
            })
            .collect();
        let mut slots: Vec<Option<PathBuf>> = vec![None; requested];
        let mut appended = Vec::new();
        let mut first_error = None;
        let mut model_used = None;
        let mut used_fallback = false;

        tracing::debug!(
            attempts = requested,
            width = self.width,
            aggregation = ?self.aggregation,
            "starting batch"
        );

        let mut start = 0;
        while start < requested {
            let end = (start + self.width).min(requested);
            for (index, result) in run_window(start..end, prompts, &attempt) {
                match result {
                    Ok(success) => {
                        if model_used.is_none() {
                            model_used = Some(success.model_used.clone());
                            used_fallback = success.used_fallback;
                        }
                        attempts[index].outcome = AttemptOutcome::Succeeded(success.path.clone());
                        match self.aggregation {
                            Aggregation::AppendOnSuccess => appended.push(success.path),
                            Aggregation::FixedSlot => slots[index] = Some(success.path),
                        }
                    }
                    Err(err) => {
                        let message = err.to_string();
                        tracing::warn!(attempt = index, "attempt failed: {message}");
                        if first_error.is_none() {
                            first_error = Some(message.clone());
                        }
                        attempts[index].outcome = AttemptOutcome::Failed(message);
                    }
                }
            }
            start = end;
        }

        let files = match self.aggregation {
            Aggregation::AppendOnSuccess => appended,
            Aggregation::FixedSlot => slots.into_iter().flatten().collect(),
        };
        BatchReport {
            files,
            requested,
            first_error,
            model_used,
            used_fallback,
            attempts,
        }
    }
}

type Completion = (usize, Result<AttemptSuccess, GenerationError>);

/// Returns the window's results in the order the workers finished.
fn run_window<F>(range: Range<usize>, prompts: &[String], attempt: &F) -> Vec<Completion>
where
    F: Fn(usize, &str) -> Result<AttemptSuccess, GenerationError> + Sync,
{
    let (tx, rx) = mpsc::channel::<Completion>();
    thread::scope(|scope| {
        let handles: Vec<_> = range
            .map(|index| {
                let tx = tx.clone();
                let prompt = prompts[index].as_str();
                let handle = scope.spawn(move || {
                    let result = attempt(index, prompt);
                    let _ = tx.send((index, result));
                });
                (index, handle)
            })
            .collect();
        drop(tx);

        let mut completed: Vec<Completion> = rx.iter().collect();
        for (index, handle) in handles {
            if handle.join().is_err() {
                completed.push((index, Err(GenerationError::WorkerPanicked)));
            }
        }
        completed
    })
}
