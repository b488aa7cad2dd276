pub mod api;
pub mod model;
pub mod reducer;

pub use api::{ApiError, HttpJobsApi, JobsApi};
pub use model::{
    EmailConfig, EmailDraft, JobSnapshot, JobState, JobStatus, Progress, SubmitRequest,
    SubmitResponse,
};
pub use reducer::{reduce, Effect, Update};
