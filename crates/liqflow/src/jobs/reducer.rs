//! Single state-transition function for the local job mirror.
//!
//! Submission, the three push handlers and the poll loop all funnel their
//! observations through [`reduce`] as tagged [`Update`]s. Side effects are
//! returned as [`Effect`]s for the caller to run.

use crate::dispatch::ui::Notice;
use crate::jobs::model::{
    JobSnapshot, JobState, JobStatus, Progress, MSG_COMPLETED, MSG_FAILED, MSG_PREPARING,
    MSG_PROCESSING,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Validation passed, the submission request is about to be sent.
    Submitting { recipients: u32 },
    /// The backend accepted the job.
    Accepted { job_id: String },
    /// The submission request failed or was refused.
    Rejected { error: String },
    PushProgress { job_id: String, percentage: f64 },
    PushCompleted { job_id: String },
    PushFailed { job_id: String, error: Option<String> },
    Polled { job_id: String, snapshot: JobSnapshot },
    /// The post-completion delay elapsed. `status` is the one observed at
    /// transition time, not re-read after the delay.
    CloseElapsed { job_id: String, status: JobStatus },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    StartPolling { job_id: String },
    StopPolling,
    Notify(Notice),
    ScheduleClose { job_id: String, status: JobStatus },
    Close { status: JobStatus },
    /// The job ended without a close timer. Resources kept alive for it
    /// go once nothing is showing it.
    Ended { status: JobStatus },
}

pub fn reduce(state: &mut JobState, update: Update) -> Vec<Effect> {
    match update {
        Update::Submitting { recipients } => {
            *state = JobState {
                job_id: None,
                status: JobStatus::Queued,
                progress: Progress {
                    current: 0,
                    total: recipients.max(1),
                    message: MSG_PREPARING.to_string(),
                },
                in_flight: true,
                error: None,
                recipients,
            };
            Vec::new()
        }

        Update::Accepted { job_id } => {
            state.job_id = Some(job_id.clone());
            vec![Effect::StartPolling { job_id }]
        }

        Update::Rejected { error } => {
            state.job_id = None;
            state.status = JobStatus::Failed;
            state.in_flight = false;
            state.progress.message = MSG_FAILED.to_string();
            state.error = Some(error.clone());
            vec![
                Effect::Notify(Notice::error(error)),
                Effect::Ended {
                    status: JobStatus::Failed,
                },
            ]
        }

        Update::PushProgress { job_id, percentage } => {
            if !accepts(state, &job_id) {
                return Vec::new();
            }
            state.status = JobStatus::Processing;
            state.progress.current =
                scale(percentage, state.recipients, f64::floor).min(state.progress.total);
            state.progress.message = MSG_PROCESSING.to_string();
            Vec::new()
        }

        Update::PushCompleted { job_id } => {
            if !accepts(state, &job_id) {
                return Vec::new();
            }
            complete(state, job_id)
        }

        Update::PushFailed { job_id, error } => {
            if !accepts(state, &job_id) {
                return Vec::new();
            }
            fail(state, error)
        }

        Update::Polled { job_id, snapshot } => {
            if !accepts(state, &job_id) {
                return Vec::new();
            }

            let total = snapshot
                .total_emails
                .filter(|n| *n > 0)
                .unwrap_or(state.recipients)
                .max(1);
            state.progress.total = total;

            match snapshot.status {
                JobStatus::Completed => complete(state, job_id),
                JobStatus::Failed => fail(state, snapshot.error),
                JobStatus::Processing => {
                    state.status = JobStatus::Processing;
                    state.progress.current = scale(snapshot.progress, total, f64::round).min(total);
                    state.progress.message = MSG_PROCESSING.to_string();
                    Vec::new()
                }
                // A job the worker has not picked up yet may still read as idle.
                // A stale poll never moves a processing job back to queued.
                JobStatus::Queued | JobStatus::Idle => {
                    if state.status != JobStatus::Processing {
                        state.status = JobStatus::Queued;
                        state.progress.current =
                            scale(snapshot.progress, total, f64::round).min(total);
                        state.progress.message = MSG_PREPARING.to_string();
                    }
                    Vec::new()
                }
            }
        }

        Update::CloseElapsed { job_id, status } => {
            if !state.tracks(&job_id) {
                return Vec::new();
            }
            state.in_flight = false;
            state.job_id = None;
            vec![Effect::Close { status }]
        }
    }
}

/// Only the tracked job may change state, and only until it is terminal.
fn accepts(state: &JobState, job_id: &str) -> bool {
    state.tracks(job_id) && !state.status.is_terminal()
}

fn scale(percentage: f64, total: u32, rounding: fn(f64) -> f64) -> u32 {
    if !percentage.is_finite() {
        return 0;
    }
    let pct = percentage.clamp(0.0, 100.0);
    rounding(pct / 100.0 * f64::from(total)) as u32
}

fn complete(state: &mut JobState, job_id: String) -> Vec<Effect> {
    state.status = JobStatus::Completed;
    state.progress.current = state.progress.total;
    state.progress.message = MSG_COMPLETED.to_string();
    state.error = None;

    vec![
        Effect::StopPolling,
        Effect::Notify(Notice::success(format!(
            "{} emails sent",
            state.progress.total
        ))),
        Effect::ScheduleClose {
            job_id,
            status: JobStatus::Completed,
        },
    ]
}

fn fail(state: &mut JobState, error: Option<String>) -> Vec<Effect> {
    let error = error
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| MSG_FAILED.to_string());

    state.status = JobStatus::Failed;
    state.progress.message = MSG_FAILED.to_string();
    state.error = Some(error.clone());
    state.in_flight = false;
    state.job_id = None;

    vec![
        Effect::StopPolling,
        Effect::Notify(Notice::error(error)),
        Effect::Ended {
            status: JobStatus::Failed,
        },
    ]
}
