#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast;

use liqflow::config::DispatchTiming;
use liqflow::dispatch::{Confirm, Coordinator, Notice, Notifier};
use liqflow::jobs::{ApiError, JobSnapshot, JobStatus, JobsApi, SubmitRequest, SubmitResponse};
use liqflow::push::{ChannelError, PushChannel, PushEvent};
use liqflow::settlements::{Driver, Settlement};

pub enum SubmitReply {
    Accept(String),
    Refuse(Option<String>),
    HttpError(u16),
}

/// Scripted stand-in for the backend job endpoints.
pub struct FakeJobs {
    reply: Mutex<SubmitReply>,
    statuses: Mutex<VecDeque<JobSnapshot>>,
    pub submissions: Mutex<Vec<SubmitRequest>>,
    pub status_calls: AtomicUsize,
}

impl FakeJobs {
    pub fn accepting(job_id: &str) -> Arc<Self> {
        Arc::new(Self::with_reply(SubmitReply::Accept(job_id.to_string())))
    }

    pub fn with_reply(reply: SubmitReply) -> Self {
        Self {
            reply: Mutex::new(reply),
            statuses: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Queue poll answers; the last one keeps being returned.
    pub fn script_status(&self, snapshots: impl IntoIterator<Item = JobSnapshot>) {
        self.statuses.lock().unwrap().extend(snapshots);
    }

    pub fn submissions(&self) -> Vec<SubmitRequest> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobsApi for FakeJobs {
    async fn submit(&self, request: &SubmitRequest) -> Result<SubmitResponse, ApiError> {
        self.submissions.lock().unwrap().push(request.clone());
        match &*self.reply.lock().unwrap() {
            SubmitReply::Accept(job_id) => Ok(SubmitResponse {
                success: true,
                job_id: Some(job_id.clone()),
                message: None,
            }),
            SubmitReply::Refuse(message) => Ok(SubmitResponse {
                success: false,
                job_id: None,
                message: message.clone(),
            }),
            SubmitReply::HttpError(status) => Err(ApiError::Status {
                status: *status,
                body: "boom".to_string(),
            }),
        }
    }

    async fn status(&self, _job_id: &str) -> Result<JobSnapshot, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut statuses = self.statuses.lock().unwrap();
        let snapshot = if statuses.len() > 1 {
            statuses.pop_front()
        } else {
            statuses.front().cloned()
        };
        Ok(snapshot.unwrap_or_else(|| snapshot_of(JobStatus::Queued, 0.0, None)))
    }
}

/// In-memory push channel; tests drive it with [`FakeChannel::emit`].
pub struct FakeChannel {
    events: broadcast::Sender<PushEvent>,
    connected: AtomicBool,
    pub refuse: AtomicBool,
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeChannel {
    pub fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            events,
            connected: AtomicBool::new(false),
            refuse: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
        })
    }

    pub fn refusing() -> Arc<Self> {
        let channel = Self::new();
        channel.refuse.store(true, Ordering::SeqCst);
        channel
    }

    pub fn emit(&self, event: PushEvent) {
        let _ = self.events.send(event);
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushChannel for FakeChannel {
    async fn connect(&self, _user_id: &str) -> Result<(), ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(ChannelError::Connection("connection refused".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        self.emit(PushEvent::Connected);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<PushEvent> {
        self.events.subscribe()
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        if self.connected.swap(false, Ordering::SeqCst) {
            self.emit(PushEvent::Disconnected);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct ScriptedConfirm {
    answer: bool,
    pub asked: AtomicUsize,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            asked: AtomicUsize::new(0),
        })
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _question: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}

pub struct Harness {
    pub coordinator: Coordinator,
    pub jobs: Arc<FakeJobs>,
    pub channel: Arc<FakeChannel>,
    pub notifier: Arc<RecordingNotifier>,
    pub confirm: Arc<ScriptedConfirm>,
}

pub fn harness(jobs: Arc<FakeJobs>, channel: Arc<FakeChannel>, confirm_answer: bool) -> Harness {
    let notifier = Arc::new(RecordingNotifier::default());
    let confirm = ScriptedConfirm::answering(confirm_answer);

    let coordinator = Coordinator::new(
        jobs.clone(),
        Some(channel.clone() as Arc<dyn PushChannel>),
        notifier.clone(),
        confirm.clone(),
        DispatchTiming::default(),
    );

    Harness {
        coordinator,
        jobs,
        channel,
        notifier,
        confirm,
    }
}

/// Let spawned tasks run (time is paused in these tests, so this also
/// advances the clock by a few milliseconds).
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

pub fn snapshot_of(status: JobStatus, progress: f64, total_emails: Option<u32>) -> JobSnapshot {
    JobSnapshot {
        status,
        progress,
        total_emails,
        error: None,
    }
}

pub fn settlement(id: &str, first: &str, last: &str, email: Option<&str>) -> Settlement {
    Settlement {
        id: id.to_string(),
        driver: Some(Driver {
            id: format!("d-{id}"),
            first_name: first.to_string(),
            last_name: last.to_string(),
            email: email.map(str::to_string),
        }),
        period_start: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        period_end: NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        base_salary: 1_300_000,
        bonuses: Vec::new(),
        overnight_stays: Vec::new(),
        surcharges: Vec::new(),
        vacation_pay: 0,
        advances: Vec::new(),
    }
}

/// Three settlements, all with email addresses.
pub fn fleet() -> Vec<Settlement> {
    vec![
        settlement("s1", "Ana", "Rojas", Some("ana@fleet.co")),
        settlement("s2", "Luis", "Gómez", Some("luis@fleet.co")),
        settlement("s3", "Marta", "Díaz", Some("marta@fleet.co")),
    ]
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
