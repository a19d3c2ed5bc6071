//! Poll-claim-complete adapter.
//!
//! Claims the next job queued for this document, applies it together with its
//! completion marker in one serializer task, and reports the outcome. A job
//! whose marker is already in the body is reported done without touching the
//! document again.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::{
    core::list,
    engine::mutator::DocumentMutator,
    op::{normalize_batch, payload_values},
    runtime::serializer::SerializerHandle,
    types::JobId,
};

use super::{
    TransportError,
    message::{ClaimRequest, ClaimResponse, ClaimedJob, CompleteRequest},
};

/// Completion message for a job whose marker was already present.
pub const ALREADY_PRESENT: &str = "already-present";
/// Completion message for a freshly applied job.
pub const APPLIED: &str = "insert+marker+1save";

/// The coordinator's job queue.
#[async_trait]
pub trait Coordinator: Send + Sync {
    /// Claims the next job for `doc_url`, if any.
    async fn claim_next(&self, doc_url: &str) -> Result<Option<ClaimedJob>, TransportError>;

    /// Reports the outcome of `job_id`.
    async fn complete(&self, job_id: &str, ok: bool, message: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl<C: Coordinator + ?Sized> Coordinator for Arc<C> {
    async fn claim_next(&self, doc_url: &str) -> Result<Option<ClaimedJob>, TransportError> {
        (**self).claim_next(doc_url).await
    }

    async fn complete(&self, job_id: &str, ok: bool, message: &str) -> Result<(), TransportError> {
        (**self).complete(job_id, ok, message).await
    }
}

/// JSON-over-HTTP coordinator client.
#[derive(Clone)]
pub struct HttpCoordinator {
    base_url: String,
    http: reqwest::Client,
}

impl HttpCoordinator {
    /// Client rooted at `base_url` (scheme and host, no trailing path).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, TransportError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "coordinator request");

        let response = self.http.post(&url).json(body).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TransportError::Status { status, body });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Coordinator for HttpCoordinator {
    async fn claim_next(&self, doc_url: &str) -> Result<Option<ClaimedJob>, TransportError> {
        let res: ClaimResponse = self.post("/api/docs/next", &ClaimRequest { url: doc_url }).await?;
        Ok(res.job)
    }

    async fn complete(&self, job_id: &str, ok: bool, message: &str) -> Result<(), TransportError> {
        let path = format!("/api/jobs/{job_id}/complete");
        let _: serde_json::Value = self.post(&path, &CompleteRequest { ok, message }).await?;
        Ok(())
    }
}

/// Pull adapter settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PullConfig {
    /// Coordinator origin, e.g. `https://localhost:8001`.
    pub base_url: String,
    /// Identity of this document when claiming.
    pub doc_url: String,
}

/// Poll pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Pause after a claimed job.
    pub success_pause_ms: u64,
    /// Pause for the first idle polls.
    pub idle_short_ms: u64,
    /// Pause once the idle streak reaches `escalate_after`.
    pub idle_long_ms: u64,
    /// Idle streak at which the long pause starts.
    pub escalate_after: u32,
    /// Idle streak cap.
    pub max_idle_streak: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            success_pause_ms: 600,
            idle_short_ms: 800,
            idle_long_ms: 1_500,
            escalate_after: 2,
            max_idle_streak: 4,
        }
    }
}

/// Idle-streak backoff.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    idle_streak: u32,
}

impl Backoff {
    /// Starts with an empty idle streak.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            idle_streak: 0,
        }
    }

    /// A job was claimed: reset and take the short pause.
    pub fn on_claimed(&mut self) -> Duration {
        self.idle_streak = 0;
        Duration::from_millis(self.config.success_pause_ms)
    }

    /// Nothing was done: grow the streak up to its cap.
    pub fn on_idle(&mut self) -> Duration {
        self.idle_streak = (self.idle_streak + 1).min(self.config.max_idle_streak);
        let ms = if self.idle_streak < self.config.escalate_after {
            self.config.idle_short_ms
        } else {
            self.config.idle_long_ms
        };
        Duration::from_millis(ms)
    }

    /// Consecutive idle polls, capped.
    pub fn idle_streak(&self) -> u32 {
        self.idle_streak
    }
}

/// What one poll did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Another poll was still in flight.
    Busy,
    /// No job was queued.
    Idle,
    /// The job's marker was already present; nothing was applied.
    AlreadyApplied(JobId),
    /// The job was applied, marked and saved.
    Applied(JobId),
    /// Claiming or applying failed.
    Failed {
        /// The job, when the failure happened after a claim.
        job_id: Option<JobId>,
        /// Error text, as reported to the coordinator.
        error: String,
    },
}

impl PollOutcome {
    /// True when a job was claimed and finished successfully.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::AlreadyApplied(_) | Self::Applied(_))
    }
}

/// Drives the claim loop for one document.
pub struct PullAdapter<C> {
    coordinator: C,
    doc: SerializerHandle<DocumentMutator>,
    doc_url: String,
    backoff: BackoffConfig,
    inflight: AtomicBool,
}

struct InflightGuard<'a>(&'a AtomicBool);

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<C: Coordinator> PullAdapter<C> {
    /// Jobs claimed for `doc_url` are applied through `doc`.
    pub fn new(
        coordinator: C,
        doc: SerializerHandle<DocumentMutator>,
        doc_url: impl Into<String>,
        backoff: BackoffConfig,
    ) -> Self {
        Self {
            coordinator,
            doc,
            doc_url: doc_url.into(),
            backoff,
            inflight: AtomicBool::new(false),
        }
    }

    /// Polls forever.
    pub async fn run(&self) {
        let mut backoff = Backoff::new(self.backoff);
        info!(doc_url = %self.doc_url, "pull loop started");
        loop {
            let outcome = self.process_once().await;
            let pause = if outcome.is_done() {
                backoff.on_claimed()
            } else {
                backoff.on_idle()
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// One claim-apply-complete round. Never more than one in flight.
    pub async fn process_once(&self) -> PollOutcome {
        if self.inflight.swap(true, Ordering::AcqRel) {
            debug!("poll already in flight");
            return PollOutcome::Busy;
        }
        let _guard = InflightGuard(&self.inflight);

        let job = match self.coordinator.claim_next(&self.doc_url).await {
            Ok(Some(job)) => job,
            Ok(None) => return PollOutcome::Idle,
            Err(err) => {
                warn!(error = %err, "claim failed");
                return PollOutcome::Failed {
                    job_id: None,
                    error: err.to_string(),
                };
            }
        };
        let ClaimedJob { id: job_id, payload } = job;
        debug!(job_id = %job_id, "job claimed");

        let check_id = job_id.clone();
        let present = self
            .doc
            .submit_with("marker-check", move |m| m.has_marker(&check_id))
            .wait()
            .await;
        match present {
            Ok(true) => {
                info!(job_id = %job_id, "marker present, skipping apply");
                self.complete(&job_id, true, ALREADY_PRESENT).await;
                return PollOutcome::AlreadyApplied(job_id);
            }
            Ok(false) => {}
            Err(err) => return self.fail(job_id, err.to_string()).await,
        }

        let plan = list::plan(normalize_batch(&payload_values(&payload)));
        let apply_id = job_id.clone();
        let applied = self
            .doc
            .submit("job", move |m| m.apply_job(&apply_id, &plan))
            .wait()
            .await;
        match applied {
            Ok(report) => {
                info!(job_id = %job_id, applied = report.applied, "job applied");
                self.complete(&job_id, true, APPLIED).await;
                PollOutcome::Applied(job_id)
            }
            Err(err) => self.fail(job_id, err.to_string()).await,
        }
    }

    async fn fail(&self, job_id: JobId, error: String) -> PollOutcome {
        warn!(job_id = %job_id, error = %error, "job failed");
        self.complete(&job_id, false, &error).await;
        PollOutcome::Failed {
            job_id: Some(job_id),
            error,
        }
    }

    /// Best effort; a failed report is only logged.
    async fn complete(&self, job_id: &str, ok: bool, message: &str) {
        if let Err(err) = self.coordinator.complete(job_id, ok, message).await {
            warn!(job_id = %job_id, error = %err, "completion report failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_backoff_escalates_caps_and_resets() {
        let mut b = Backoff::new(BackoffConfig::default());
        assert_eq!(b.on_idle(), Duration::from_millis(800));
        assert_eq!(b.on_idle(), Duration::from_millis(1_500));
        for _ in 0..10 {
            assert_eq!(b.on_idle(), Duration::from_millis(1_500));
        }
        assert_eq!(b.idle_streak(), 4);

        assert_eq!(b.on_claimed(), Duration::from_millis(600));
        assert_eq!(b.idle_streak(), 0);
        assert_eq!(b.on_idle(), Duration::from_millis(800));
    }
}
