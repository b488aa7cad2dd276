//! Bulk email dispatch coordinator.
//!
//! [`Coordinator`] submits a payslip email job and then tracks it through
//! two channels at once: events from an injected [`PushChannel`] and a
//! status poll loop against [`JobsApi`]. Both write to the same
//! [`JobState`] through [`reduce`], so whichever channel observes a
//! terminal state first drives the close sequence and the other one's
//! late report is ignored.
//!
//! The handle is cheap to clone; background tasks (listener, poll loop,
//! close timer) each hold a clone.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::DispatchTiming;
use crate::dispatch::ui::{Confirm, Notice, Notifier};
use crate::error::DispatchError;
use crate::jobs::api::JobsApi;
use crate::jobs::model::{EmailConfig, EmailDraft, JobState, JobStatus, SubmitRequest};
use crate::jobs::reducer::{reduce, Effect, Update};
use crate::push::channel::PushChannel;
use crate::push::events::PushEvent;
use crate::settlements::model::Settlement;
use crate::settlements::recipients::{dedup_selection, resolve_recipients};

pub const CLOSE_WHILE_RUNNING: &str = "Emails are still being sent. Close anyway?";
pub const CHANNEL_UNAVAILABLE: &str =
    "Live updates unavailable; progress refreshes every few seconds";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// Not attempted, or released on close.
    #[default]
    Idle,
    Connected,
    /// Attempted but not connected: polling only, reconnect offered.
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewState {
    pub open: bool,
    pub channel: ChannelState,
}

impl ViewState {
    pub fn can_reconnect(&self) -> bool {
        self.channel == ChannelState::Unavailable
    }
}

#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    jobs: Arc<dyn JobsApi>,
    /// `None` runs the coordinator in poll-only mode.
    channel: Option<Arc<dyn PushChannel>>,
    notifier: Arc<dyn Notifier>,
    confirm: Arc<dyn Confirm>,
    timing: DispatchTiming,

    state: watch::Sender<JobState>,
    view: watch::Sender<ViewState>,

    user_id: Mutex<Option<String>>,
    polling: Mutex<Option<CancellationToken>>,
    subscription: Mutex<Option<CancellationToken>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Coordinator {
    pub fn new(
        jobs: Arc<dyn JobsApi>,
        channel: Option<Arc<dyn PushChannel>>,
        notifier: Arc<dyn Notifier>,
        confirm: Arc<dyn Confirm>,
        timing: DispatchTiming,
    ) -> Self {
        let (state, _) = watch::channel(JobState::default());
        let (view, _) = watch::channel(ViewState::default());

        Self {
            inner: Arc::new(Inner {
                jobs,
                channel,
                notifier,
                confirm,
                timing,
                state,
                view,
                user_id: Mutex::new(None),
                polling: Mutex::new(None),
                subscription: Mutex::new(None),
            }),
        }
    }

    pub fn snapshot(&self) -> JobState {
        self.inner.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<JobState> {
        self.inner.state.subscribe()
    }

    pub fn view(&self) -> ViewState {
        *self.inner.view.borrow()
    }

    pub fn watch_view(&self) -> watch::Receiver<ViewState> {
        self.inner.view.subscribe()
    }

    /// Show the dispatch view. The push channel is connected once a user
    /// identity is known; failing to connect only degrades to polling.
    pub async fn open(&self, user_id: Option<&str>) {
        self.inner.view.send_modify(|v| v.open = true);

        let Some(user_id) = user_id else {
            return;
        };
        *lock(&self.inner.user_id) = Some(user_id.to_string());
        self.attach(user_id).await;
    }

    /// Validate the selection, submit the job and start tracking it.
    pub async fn submit(
        &self,
        settlements: &[Settlement],
        selected_ids: &[String],
        draft: &EmailDraft,
    ) -> Result<String, DispatchError> {
        let in_flight = self.inner.state.borrow().in_flight;
        if in_flight {
            return Err(DispatchError::Busy);
        }

        let selection = dedup_selection(selected_ids);
        let recipients = match resolve_recipients(settlements, &selection) {
            Ok(recipients) => recipients,
            Err(e) => {
                self.inner.notifier.notify(Notice::error(e.to_string()));
                return Err(e);
            }
        };

        let dispatch_id = Uuid::new_v4();
        let count = u32::try_from(selection.len()).unwrap_or(u32::MAX);
        let request = SubmitRequest {
            liquidacion_ids: selection,
            email_config: EmailConfig {
                subject: draft.subject.clone(),
                body: draft.body.clone(),
                recipients,
            },
        };

        if !self.claim(count) {
            return Err(DispatchError::Busy);
        }
        tracing::info!(
            %dispatch_id,
            settlements = request.liquidacion_ids.len(),
            recipients = request.email_config.recipients.len(),
            "Submitting email job",
        );

        match self.inner.jobs.submit(&request).await {
            Ok(response) => match response.job_id.filter(|_| response.success) {
                Some(job_id) => {
                    tracing::info!(%dispatch_id, job_id = %job_id, "Email job accepted");
                    self.apply(Update::Accepted {
                        job_id: job_id.clone(),
                    });
                    Ok(job_id)
                }
                None => {
                    let reason = response
                        .message
                        .unwrap_or_else(|| "the backend did not return a job id".to_string());
                    tracing::warn!(%dispatch_id, reason = %reason, "Email job rejected");
                    self.apply(Update::Rejected {
                        error: reason.clone(),
                    });
                    Err(DispatchError::Rejected(reason))
                }
            },
            Err(e) => {
                tracing::error!(%dispatch_id, error = %e, "Email job submission failed");
                self.apply(Update::Rejected {
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Close the view. While a job is in flight and not completed the user
    /// must confirm; returns `false` when they decline.
    pub async fn request_close(&self) -> bool {
        let (in_flight, status) = {
            let s = self.inner.state.borrow();
            (s.in_flight, s.status)
        };

        if in_flight
            && status != JobStatus::Completed
            && !self.inner.confirm.confirm(CLOSE_WHILE_RUNNING).await
        {
            tracing::debug!(%status, "Close declined while job in flight");
            return false;
        }

        self.close_with(status).await;
        true
    }

    /// Close the view for a known status. The push subscription survives
    /// while the job is still queued or processing.
    pub async fn close_with(&self, status: JobStatus) {
        self.inner.view.send_modify(|v| v.open = false);

        if status.is_active() {
            tracing::info!(%status, "Dispatch view closed, keeping push channel for running job");
            return;
        }
        self.release_channel().await;
    }

    /// Tear the push channel down and bring it back after a short pause.
    pub async fn reconnect(&self) {
        let Some(channel) = self.inner.channel.clone() else {
            return;
        };
        let user_id = lock(&self.inner.user_id).clone();
        let Some(user_id) = user_id else {
            return;
        };

        tracing::info!(user_id = %user_id, "Reconnecting push channel");
        channel.disconnect().await;
        tokio::time::sleep(self.inner.timing.reconnect_pause).await;
        self.attach(&user_id).await;
    }

    /// Reconnect only when the push channel is unavailable. Returns whether
    /// a reconnect was attempted.
    pub async fn reconnect_if_unavailable(&self) -> bool {
        if !self.view().can_reconnect() {
            return false;
        }
        self.reconnect().await;
        true
    }

    /// Reset a finished or failed dispatch back to idle.
    pub fn dismiss(&self) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.in_flight || *s == JobState::default() {
                return false;
            }
            *s = JobState::default();
            true
        })
    }

    /// Check-and-set of the in-flight flag: a concurrent submit from another
    /// handle sees the claim and backs off.
    fn claim(&self, recipients: u32) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.in_flight {
                return false;
            }
            // `Submitting` yields no effects.
            reduce(state, Update::Submitting { recipients });
            true
        })
    }

    fn apply(&self, update: Update) {
        let mut effects = Vec::new();
        self.inner.state.send_if_modified(|state| {
            let before = state.clone();
            effects = reduce(state, update);
            *state != before
        });

        for effect in effects {
            self.run(effect);
        }
    }

    fn run(&self, effect: Effect) {
        match effect {
            Effect::StartPolling { job_id } => self.start_polling(job_id),
            Effect::StopPolling => {
                if let Some(token) = lock(&self.inner.polling).take() {
                    token.cancel();
                }
            }
            Effect::Notify(notice) => self.inner.notifier.notify(notice),
            Effect::ScheduleClose { job_id, status } => {
                let this = self.clone();
                let delay = self.inner.timing.close_delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    this.apply(Update::CloseElapsed { job_id, status });
                });
            }
            Effect::Close { status } => {
                let this = self.clone();
                tokio::spawn(async move { this.close_with(status).await });
            }
            Effect::Ended { status } => {
                // An open view keeps the channel until the user closes it.
                if self.inner.view.borrow().open {
                    return;
                }
                tracing::info!(%status, "Job ended after the view closed, releasing push channel");
                let this = self.clone();
                tokio::spawn(async move { this.release_channel().await });
            }
        }
    }

    fn start_polling(&self, job_id: String) {
        let cancel = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.polling).replace(cancel.clone()) {
            previous.cancel();
        }
        tokio::spawn(self.clone().poll_loop(job_id, cancel));
    }

    async fn poll_loop(self, job_id: String, cancel: CancellationToken) {
        let period = self.inner.timing.poll_interval;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(period) => {}
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.inner.jobs.status(&job_id) => result,
            };

            match result {
                Ok(snapshot) => {
                    tracing::debug!(
                        job_id = %job_id,
                        status = %snapshot.status,
                        progress = snapshot.progress,
                        "Polled job status",
                    );
                    self.apply(Update::Polled {
                        job_id: job_id.clone(),
                        snapshot,
                    });
                }
                Err(e) => {
                    tracing::warn!(job_id = %job_id, error = %e, "Job status poll failed");
                }
            }

            let keep_polling = {
                let s = self.inner.state.borrow();
                s.tracks(&job_id) && s.status.is_active()
            };
            if !keep_polling {
                break;
            }
        }

        tracing::debug!(job_id = %job_id, "Status polling stopped");
    }

    async fn attach(&self, user_id: &str) {
        let Some(channel) = self.inner.channel.clone() else {
            return;
        };

        // Subscribe before connecting so the `connect` event is not missed.
        self.ensure_subscription(channel.as_ref());

        if channel.is_connected() {
            self.set_channel(ChannelState::Connected);
            return;
        }

        match channel.connect(user_id).await {
            Ok(()) => self.set_channel(ChannelState::Connected),
            Err(e) => {
                tracing::warn!(error = %e, "Push channel unavailable, polling only");
                self.set_channel(ChannelState::Unavailable);
                self.inner.notifier.notify(Notice::warning(CHANNEL_UNAVAILABLE));
            }
        }
    }

    fn ensure_subscription(&self, channel: &dyn PushChannel) {
        let mut slot = lock(&self.inner.subscription);
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return;
        }

        let cancel = CancellationToken::new();
        *slot = Some(cancel.clone());
        tokio::spawn(self.clone().listen(channel.subscribe(), cancel));
    }

    async fn release_channel(&self) {
        let subscription = lock(&self.inner.subscription).take();
        if let Some(token) = subscription {
            token.cancel();
        }
        if let Some(channel) = &self.inner.channel {
            channel.disconnect().await;
        }
        self.set_channel(ChannelState::Idle);
    }

    async fn listen(self, mut events: broadcast::Receiver<PushEvent>, cancel: CancellationToken) {
        loop {
            // A released subscription must not replay the teardown events.
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(event) => self.on_push(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Push listener lagged, relying on polling");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    fn on_push(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => self.set_channel(ChannelState::Connected),
            PushEvent::Disconnected => {
                tracing::warn!("Push channel dropped, polling only");
                self.set_channel(ChannelState::Unavailable);
            }
            PushEvent::Progress(data) => self.apply(Update::PushProgress {
                job_id: data.job_id,
                percentage: data.progress,
            }),
            PushEvent::Completed(data) => self.apply(Update::PushCompleted {
                job_id: data.job_id,
            }),
            PushEvent::Failed(data) => self.apply(Update::PushFailed {
                job_id: data.job_id,
                error: data.error,
            }),
        }
    }

    fn set_channel(&self, channel: ChannelState) {
        self.inner.view.send_if_modified(|v| {
            let changed = v.channel != channel;
            v.channel = channel;
            changed
        });
    }
}
