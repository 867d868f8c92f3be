//! Resumable setup pipeline
//!
//! Runs live in an in-process session table keyed by run id. Each request
//! checks a run out, drives it outside the lock, and commits it back with a
//! version compare-and-swap, so a racing second write is rejected instead of
//! silently overwriting the first.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

use crate::integration::{IntegrationProvider, IntegrationRecord, IntegrationStore};

use super::error::PipelineError;
use super::run::{Drive, RunProgress, drive};
use super::state::PipelineState;
use super::step::{Step, StepRequest};
use super::view::StepView;

/// Upper bound on how long an idle run is kept, in days
pub const MAX_RUN_TTL_DAYS: i64 = 7;

/// One stored pipeline run
#[derive(Debug, Clone)]
struct PipelineSession {
    progress: RunProgress,
    version: u64,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl PipelineSession {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of dispatching a request into a run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The run is suspended on a step
    Render(StepView),
    /// The finalizer ran and the record was handed to the store
    Finished(IntegrationRecord),
}

pub struct SetupPipeline {
    provider: Arc<dyn IntegrationProvider>,
    store: Arc<dyn IntegrationStore>,
    steps: Vec<Arc<dyn Step>>,
    sessions: Mutex<HashMap<String, PipelineSession>>,
    ttl: Duration,
}

impl SetupPipeline {
    pub fn new(
        provider: Arc<dyn IntegrationProvider>,
        store: Arc<dyn IntegrationStore>,
        ttl: Duration,
    ) -> Self {
        let steps = provider.pipeline_steps();
        Self {
            provider,
            store,
            steps,
            sessions: Mutex::new(HashMap::new()),
            ttl: ttl.clamp(Duration::zero(), Duration::days(MAX_RUN_TTL_DAYS)),
        }
    }

    fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl).unwrap_or(now)
    }

    pub fn provider(&self) -> &Arc<dyn IntegrationProvider> {
        &self.provider
    }

    pub fn store(&self) -> &Arc<dyn IntegrationStore> {
        &self.store
    }

    /// Generate a random run id
    fn generate_run_id() -> String {
        use base64::Engine;
        let mut bytes = [0u8; 16];
        for byte in &mut bytes {
            *byte = fastrand::u8(..);
        }
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Open a new run with empty state
    pub fn start(&self) -> String {
        let run_id = Self::generate_run_id();
        let now = Utc::now();
        let session = PipelineSession {
            progress: RunProgress::default(),
            version: 0,
            started_at: now,
            expires_at: self.expiry(now),
        };

        self.sessions.lock().insert(run_id.clone(), session);
        tracing::info!(provider = %self.provider.descriptor().key, "Setup pipeline started");
        run_id
    }

    /// Resume `run_id` with the request's parameters
    pub async fn dispatch(
        &self,
        run_id: &str,
        params: HashMap<String, String>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let (mut progress, version) = self.checkout(run_id)?;
        let request = StepRequest::new(run_id, params);

        match drive(&self.steps, &mut progress, &request).await {
            Ok(Drive::Suspended(view)) => {
                self.commit(run_id, progress, version)?;
                Ok(PipelineOutcome::Render(view))
            }
            Ok(Drive::Completed) => self.finalize(run_id, progress, version).await,
            Err(e) => {
                tracing::warn!(cursor = progress.cursor(), "Setup step failed: {}", e);
                // Keep what earlier steps bound so the user can resume
                self.commit(run_id, progress, version)?;
                Err(e)
            }
        }
    }

    async fn finalize(
        &self,
        run_id: &str,
        progress: RunProgress,
        version: u64,
    ) -> Result<PipelineOutcome, PipelineError> {
        let record = match self.provider.build_integration(progress.current_state()).await {
            Ok(record) => record,
            Err(e) if e.is_retryable() => {
                tracing::warn!("Finalize failed, run kept for retry: {}", e);
                self.commit(run_id, progress, version)?;
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Finalize failed, aborting setup: {}", e);
                self.finish(run_id, version)?;
                return Err(e);
            }
        };

        // Claim the run before persisting so a racing finalize cannot persist twice
        self.finish(run_id, version)?;
        self.store
            .create_or_update(record.clone())
            .map_err(|e| PipelineError::Storage(e.to_string()))?;

        tracing::info!(
            provider = %record.provider,
            external_id = %record.external_id,
            "Integration created"
        );
        Ok(PipelineOutcome::Finished(record))
    }

    /// Snapshot of the run's bindings
    pub fn current_state(&self, run_id: &str) -> Result<PipelineState, PipelineError> {
        self.checkout(run_id)
            .map(|(progress, _)| progress.into_state())
    }

    fn checkout(&self, run_id: &str) -> Result<(RunProgress, u64), PipelineError> {
        let mut sessions = self.sessions.lock();
        let now = Utc::now();

        match sessions.get(run_id) {
            Some(session) if session.is_expired(now) => {
                sessions.remove(run_id);
                Err(PipelineError::ExpiredPipeline)
            }
            Some(session) => Ok((session.progress.clone(), session.version)),
            None => Err(PipelineError::ExpiredPipeline),
        }
    }

    fn commit(
        &self,
        run_id: &str,
        progress: RunProgress,
        version: u64,
    ) -> Result<(), PipelineError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(run_id)
            .ok_or(PipelineError::ExpiredPipeline)?;

        if session.version != version {
            tracing::warn!("Rejected concurrent write to setup run");
            return Err(PipelineError::StateConflict);
        }

        session.progress = progress;
        session.version += 1;
        session.expires_at = self.expiry(Utc::now());
        Ok(())
    }

    /// Remove the run if nobody committed to it since `version` was read
    fn finish(&self, run_id: &str, version: u64) -> Result<(), PipelineError> {
        let mut sessions = self.sessions.lock();
        match sessions.get(run_id) {
            Some(session) if session.version == version => {
                let age = Utc::now() - session.started_at;
                sessions.remove(run_id);
                tracing::debug!(age_secs = age.num_seconds(), "Setup run closed");
                Ok(())
            }
            Some(_) => Err(PipelineError::StateConflict),
            None => Err(PipelineError::ExpiredPipeline),
        }
    }

    /// Drop lapsed runs, returning how many were removed
    pub fn cleanup_expired_sessions(&self) -> usize {
        let mut sessions = self.sessions.lock();
        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        before - sessions.len()
    }

    pub fn active_runs(&self) -> usize {
        self.sessions.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex as SyncMutex;
    use serde_json::Map;

    use crate::integration::MemoryIntegrationStore;
    use crate::integration::types::{
        IdentityCredential, IntegrationDescriptor, IntegrationMetadata, ProviderMetadata,
        SetupDialogConfig,
    };
    use crate::pipeline::run::tests::AskStep;

    /// Two text steps; finalize fails with whatever error is queued
    struct FakeProvider {
        descriptor: IntegrationDescriptor,
        finalize_error: SyncMutex<Option<PipelineError>>,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                descriptor: IntegrationDescriptor {
                    key: "fake".to_string(),
                    name: "Fake".to_string(),
                    domain: ".example.com".to_string(),
                    api_version: "1".to_string(),
                    metadata: ProviderMetadata {
                        description: String::new(),
                        author: String::new(),
                        issue_url: String::new(),
                        source_url: String::new(),
                        aspects: Map::new(),
                    },
                    setup_dialog: SetupDialogConfig {
                        width: 600,
                        height: 800,
                    },
                    oauth_scopes: vec![],
                },
                finalize_error: SyncMutex::new(None),
            }
        }

        fn fail_next_finalize(&self, error: PipelineError) {
            *self.finalize_error.lock() = Some(error);
        }
    }

    #[async_trait]
    impl IntegrationProvider for FakeProvider {
        fn descriptor(&self) -> &IntegrationDescriptor {
            &self.descriptor
        }

        fn pipeline_steps(&self) -> Vec<Arc<dyn Step>> {
            vec![AskStep::new("instance"), AskStep::new("project")]
        }

        async fn build_integration(
            &self,
            state: &PipelineState,
        ) -> Result<IntegrationRecord, PipelineError> {
            if let Some(error) = self.finalize_error.lock().take() {
                return Err(error);
            }
            let instance = state.require_str(&["instance"])?;
            let project = state.require_str(&["project"])?;
            Ok(IntegrationRecord {
                provider: "fake".to_string(),
                name: project.to_string(),
                external_id: format!("id-{}", project),
                metadata: IntegrationMetadata {
                    scopes: vec![],
                    domain_name: instance.to_string(),
                },
                credential: IdentityCredential {
                    access_token: "token".to_string(),
                    kind: "fake".to_string(),
                    external_id: instance.to_string(),
                    scopes: vec![],
                    data: Map::new(),
                },
            })
        }

        async fn account_info(
            &self,
            record: &IntegrationRecord,
        ) -> Result<serde_json::Value, PipelineError> {
            Ok(serde_json::json!({"domain": record.metadata.domain_name}))
        }
    }

    fn pipeline_with(ttl: Duration) -> (SetupPipeline, Arc<FakeProvider>, Arc<MemoryIntegrationStore>) {
        let provider = Arc::new(FakeProvider::new());
        let store = Arc::new(MemoryIntegrationStore::new());
        let pipeline = SetupPipeline::new(provider.clone(), store.clone(), ttl);
        (pipeline, provider, store)
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_run_ids_are_unique_and_url_safe() {
        let (pipeline, _, _) = pipeline_with(Duration::minutes(10));
        let a = pipeline.start();
        let b = pipeline.start();
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_eq!(pipeline.active_runs(), 2);
    }

    #[tokio::test]
    async fn test_full_run_persists_record_and_closes_run() {
        let (pipeline, _, store) = pipeline_with(Duration::minutes(10));
        let run = pipeline.start();

        let first = pipeline.dispatch(&run, params(&[])).await.unwrap();
        assert!(matches!(first, PipelineOutcome::Render(StepView::Form(_))));

        pipeline
            .dispatch(&run, params(&[("instance", "fabrikam")]))
            .await
            .unwrap();
        assert_eq!(
            pipeline.current_state(&run).unwrap().get("instance"),
            Some(&serde_json::json!("fabrikam"))
        );

        let done = pipeline
            .dispatch(&run, params(&[("project", "Alpha")]))
            .await
            .unwrap();
        match done {
            PipelineOutcome::Finished(record) => assert_eq!(record.external_id, "id-Alpha"),
            other => panic!("expected finished, got {:?}", other),
        }

        assert_eq!(store.list().len(), 1);
        assert_eq!(pipeline.active_runs(), 0);
        assert_eq!(
            pipeline.dispatch(&run, params(&[])).await.unwrap_err(),
            PipelineError::ExpiredPipeline
        );
    }

    #[tokio::test]
    async fn test_expired_run_is_rejected_not_restarted() {
        let (pipeline, _, _) = pipeline_with(Duration::zero());
        let run = pipeline.start();

        let err = pipeline
            .dispatch(&run, params(&[("instance", "fabrikam")]))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::ExpiredPipeline);
        assert_eq!(pipeline.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_ttl_is_clamped() {
        let (pipeline, _, _) = pipeline_with(Duration::days(1_000_000_000));
        let run = pipeline.start();
        let first = pipeline.dispatch(&run, params(&[])).await.unwrap();
        assert!(matches!(first, PipelineOutcome::Render(StepView::Form(_))));
        assert_eq!(pipeline.ttl, Duration::days(MAX_RUN_TTL_DAYS));

        let (pipeline, _, _) = pipeline_with(Duration::seconds(-30));
        assert_eq!(pipeline.ttl, Duration::zero());
        let run = pipeline.start();
        assert_eq!(
            pipeline.dispatch(&run, params(&[])).await.unwrap_err(),
            PipelineError::ExpiredPipeline
        );
    }

    #[tokio::test]
    async fn test_unknown_run_is_expired() {
        let (pipeline, _, _) = pipeline_with(Duration::minutes(10));
        let err = pipeline.dispatch("nope", params(&[])).await.unwrap_err();
        assert_eq!(err, PipelineError::ExpiredPipeline);
    }

    #[test]
    fn test_racing_commit_is_state_conflict() {
        let (pipeline, _, _) = pipeline_with(Duration::minutes(10));
        let run = pipeline.start();

        let (first, v1) = pipeline.checkout(&run).unwrap();
        let (second, v2) = pipeline.checkout(&run).unwrap();
        assert_eq!(v1, v2);

        pipeline.commit(&run, first, v1).unwrap();
        assert_eq!(
            pipeline.commit(&run, second, v2).unwrap_err(),
            PipelineError::StateConflict
        );
        assert_eq!(
            pipeline.finish(&run, v2).unwrap_err(),
            PipelineError::StateConflict
        );
    }

    #[tokio::test]
    async fn test_retryable_finalize_error_keeps_run() {
        let (pipeline, provider, store) = pipeline_with(Duration::minutes(10));
        let run = pipeline.start();
        pipeline
            .dispatch(&run, params(&[("instance", "fabrikam")]))
            .await
            .unwrap();

        provider.fail_next_finalize(PipelineError::UpstreamError { status_code: 503 });
        let err = pipeline
            .dispatch(&run, params(&[("project", "Alpha")]))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::UpstreamError { status_code: 503 });
        assert!(store.list().is_empty());

        // Resubmitting goes straight to the finalizer again
        let done = pipeline.dispatch(&run, params(&[])).await.unwrap();
        assert!(matches!(done, PipelineOutcome::Finished(_)));
        assert_eq!(store.list().len(), 1);
    }

    #[tokio::test]
    async fn test_terminal_finalize_error_discards_run() {
        let (pipeline, provider, store) = pipeline_with(Duration::minutes(10));
        let run = pipeline.start();
        pipeline
            .dispatch(&run, params(&[("instance", "fabrikam")]))
            .await
            .unwrap();

        provider.fail_next_finalize(PipelineError::ProjectNotFound("Alpha".to_string()));
        let err = pipeline
            .dispatch(&run, params(&[("project", "Alpha")]))
            .await
            .unwrap_err();
        assert_eq!(err, PipelineError::ProjectNotFound("Alpha".to_string()));
        assert!(store.list().is_empty());
        assert_eq!(pipeline.active_runs(), 0);
    }

    #[tokio::test]
    async fn test_step_error_keeps_run_resumable() {
        let (pipeline, _, _) = pipeline_with(Duration::minutes(10));
        let run = pipeline.start();

        let err = pipeline
            .dispatch(&run, params(&[("instance", "")]))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));

        let next = pipeline
            .dispatch(&run, params(&[("instance", "fabrikam")]))
            .await
            .unwrap();
        assert!(matches!(next, PipelineOutcome::Render(_)));
    }

    #[test]
    fn test_cleanup_expired_sessions() {
        let (pipeline, _, _) = pipeline_with(Duration::zero());
        pipeline.start();
        pipeline.start();
        assert_eq!(pipeline.cleanup_expired_sessions(), 2);
        assert_eq!(pipeline.active_runs(), 0);
    }
}
