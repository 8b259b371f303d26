//! The four-phase submission pipeline.
//!
//! Phases of one transaction are strictly sequential; independent
//! submissions share nothing but the broadcaster, so they may be in flight
//! concurrently. The pipeline holds no retry logic: every failure is
//! reported once on the bus and re-raised to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{
    normalize_backend_message, BackendStats, CallBundle, FeeConfig, OffchainEffect, PipelineError,
    ProvingRequest, TxIdentity,
};
use connect::Session;

use crate::broadcast::ProgressBroadcaster;
use crate::events::{PhaseBreakdown, SubStep, TxPhase, TxProgressEvent};
use crate::ledger::{InclusionResult, LedgerClient, TxStatus, TxWait};

/// Result of one completed submission.
#[derive(Debug, Clone)]
pub struct TxOutcome {
    /// Per-submission id, as carried by the progress events.
    pub tx_id: Uuid,
    /// On-ledger transaction identity.
    pub identity: TxIdentity,
    /// Inclusion details; `None` for `NoWait` submissions.
    pub inclusion: Option<InclusionResult>,
}

/// Executes submissions and broadcasts their progress.
pub struct TransactionPipeline {
    ledger: Arc<dyn LedgerClient>,
    events: ProgressBroadcaster,
}

impl TransactionPipeline {
    pub fn new(ledger: Arc<dyn LedgerClient>, events: ProgressBroadcaster) -> Self {
        Self { ledger, events }
    }

    /// The event bus progress subscribers attach to.
    pub fn events(&self) -> &ProgressBroadcaster {
        &self.events
    }

    /// Fee configuration based on the network's current floor.
    pub async fn recommended_fee(&self) -> Result<FeeConfig, PipelineError> {
        let floor = self
            .ledger
            .current_fee_floor()
            .await
            .map_err(|err| phase_error(TxPhase::Sending, &err.to_string()))?;
        Ok(FeeConfig::with_floor(floor))
    }

    /// Submit one call bundle through simulate → prove → send → mine.
    ///
    /// On failure one `error` event is emitted (with a normalized message)
    /// and the error is returned to the caller; the pipeline never retries.
    pub async fn submit(
        &self,
        session: &Session,
        bundle: CallBundle,
        fee: FeeConfig,
        wait: TxWait,
    ) -> Result<TxOutcome, PipelineError> {
        let mut tracker = ProgressTracker::new();
        debug!(tx_id = %tracker.tx_id, calls = bundle.calls.len(), "submission started");
        match self.run(session, bundle, fee, &wait, &mut tracker).await {
            Ok(outcome) => {
                info!(tx_id = %outcome.tx_id, identity = %outcome.identity, "submission complete");
                Ok(outcome)
            }
            Err(err) => {
                self.events.emit(tracker.snapshot(
                    TxPhase::Error,
                    Some(user_message(&err)),
                ));
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        session: &Session,
        bundle: CallBundle,
        fee: FeeConfig,
        wait: &TxWait,
        tracker: &mut ProgressTracker,
    ) -> Result<TxOutcome, PipelineError> {
        // --- simulating ---------------------------------------------------
        let phase_start = Instant::now();
        let output = session
            .signer()
            .simulate(bundle)
            .await
            .map_err(|err| phase_error(TxPhase::Simulating, &err.to_string()))?;
        let mut bundle = output.bundle;

        let mut witness_steps = Vec::new();
        for effect in &output.effects {
            // Only authorization requests are acted on; everything else the
            // simulator declared is informational.
            let OffchainEffect::AuthorizationRequest(request) = effect else {
                continue;
            };
            let witness_start = Instant::now();
            let witness = session
                .signer()
                .authorize(request.clone())
                .await
                .map_err(|err| phase_error(TxPhase::Simulating, &err.to_string()))?;
            witness_steps.push(SubStep {
                name: format!("witness[{}]", witness.call_index),
                duration_ms: witness_start.elapsed().as_millis() as u64,
            });
            match bundle.calls.get_mut(witness.call_index) {
                Some(call) => call.witness = Some(witness),
                None => warn!(
                    call_index = witness.call_index,
                    "authorization witness for out-of-range call, skipped"
                ),
            }
        }
        tracker.complete_phase(
            TxPhase::Simulating,
            phase_start.elapsed().as_millis() as u64,
            output.stats,
            witness_steps,
        );
        self.events.emit(tracker.snapshot(TxPhase::Simulating, None));

        // --- proving ------------------------------------------------------
        let phase_start = Instant::now();
        let proven = session
            .signer()
            .prove(ProvingRequest { bundle, fee })
            .await
            .map_err(|err| phase_error(TxPhase::Proving, &err.to_string()))?;
        tracker.complete_phase(
            TxPhase::Proving,
            phase_start.elapsed().as_millis() as u64,
            proven.stats.clone(),
            Vec::new(),
        );
        self.events.emit(tracker.snapshot(TxPhase::Proving, None));

        // --- sending ------------------------------------------------------
        let phase_start = Instant::now();
        let status = self
            .ledger
            .transaction_status(&proven.identity)
            .await
            .map_err(|err| phase_error(TxPhase::Sending, &err.to_string()))?;
        if status == TxStatus::Final {
            return Err(PipelineError::DuplicateSubmission {
                identity: proven.identity,
            });
        }
        self.ledger
            .send_transaction(&proven)
            .await
            .map_err(|err| phase_error(TxPhase::Sending, &err.to_string()))?;
        tracker.complete_phase(
            TxPhase::Sending,
            phase_start.elapsed().as_millis() as u64,
            None,
            Vec::new(),
        );
        self.events.emit(tracker.snapshot(TxPhase::Sending, None));

        // --- mining -------------------------------------------------------
        let inclusion = if wait.is_no_wait() {
            None
        } else {
            let phase_start = Instant::now();
            let inclusion = self
                .ledger
                .wait_for_inclusion(&proven.identity, wait)
                .await
                .map_err(|err| phase_error(TxPhase::Mining, &err.to_string()))?;
            tracker.complete_phase(
                TxPhase::Mining,
                phase_start.elapsed().as_millis() as u64,
                None,
                Vec::new(),
            );
            self.events.emit(tracker.snapshot(TxPhase::Mining, None));
            Some(inclusion)
        };

        self.events.emit(tracker.snapshot(TxPhase::Complete, None));
        Ok(TxOutcome {
            tx_id: tracker.tx_id,
            identity: proven.identity,
            inclusion,
        })
    }
}

fn phase_error(phase: TxPhase, message: &str) -> PipelineError {
    PipelineError::Phase {
        phase: phase.as_str(),
        message: message.to_string(),
    }
}

/// Best-effort user-facing message for an error event.
fn user_message(err: &PipelineError) -> String {
    match err {
        PipelineError::Phase { message, .. } => normalize_backend_message(message),
        other => normalize_backend_message(&other.to_string()),
    }
}

/// Accumulates per-phase timings for one submission and builds event
/// snapshots.
struct ProgressTracker {
    tx_id: Uuid,
    started_at: DateTime<Utc>,
    durations_ms: BTreeMap<String, u64>,
    breakdowns: Vec<PhaseBreakdown>,
}

impl ProgressTracker {
    fn new() -> Self {
        Self {
            tx_id: Uuid::new_v4(),
            started_at: Utc::now(),
            durations_ms: BTreeMap::new(),
            breakdowns: Vec::new(),
        }
    }

    /// Record a completed phase with its backend-reported statistics and any
    /// pipeline-measured extra steps.
    fn complete_phase(
        &mut self,
        phase: TxPhase,
        duration_ms: u64,
        stats: Option<BackendStats>,
        extra_steps: Vec<SubStep>,
    ) {
        let mut steps: Vec<SubStep> = stats
            .map(|s| {
                s.steps
                    .into_iter()
                    .map(|step| SubStep {
                        name: step.name,
                        duration_ms: step.duration_ms,
                    })
                    .collect()
            })
            .unwrap_or_default();
        steps.extend(extra_steps);

        if !steps.is_empty() {
            let accounted: u64 = steps.iter().map(|s| s.duration_ms).sum();
            if duration_ms > accounted {
                steps.push(SubStep {
                    name: "unaccounted".to_string(),
                    duration_ms: duration_ms - accounted,
                });
            }
        }

        self.durations_ms.insert(phase.as_str().to_string(), duration_ms);
        self.breakdowns.push(PhaseBreakdown {
            name: phase.as_str().to_string(),
            duration_ms,
            steps,
        });
    }

    /// Full-history snapshot for the given phase.
    fn snapshot(&self, phase: TxPhase, error: Option<String>) -> TxProgressEvent {
        TxProgressEvent {
            tx_id: self.tx_id,
            phase,
            started_at: self.started_at,
            durations_ms: self.durations_ms.clone(),
            breakdowns: self.breakdowns.clone(),
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use common::{
        Address, AuthorizationRequest, AuthorizationWitness, BackendStats, BackendStep,
        CapabilityGrant, CapabilityManifest, ContractAddress, ContractCall, ProvenTransaction,
        SignerError, SimulationOutput,
    };
    use connect::Signer;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::ledger::LedgerError;

    /// Signer with scriptable effects and failure injection.
    #[derive(Default)]
    struct ScriptedSigner {
        effects: Vec<OffchainEffect>,
        stats: Option<BackendStats>,
        fail_prove: Option<String>,
        authorize_calls: AtomicUsize,
    }

    #[async_trait]
    impl Signer for ScriptedSigner {
        async fn accounts(&self) -> Result<Vec<Address>, SignerError> {
            Ok(vec![Address("acct".into())])
        }

        async fn simulate(&self, bundle: CallBundle) -> Result<SimulationOutput, SignerError> {
            Ok(SimulationOutput {
                bundle,
                effects: self.effects.clone(),
                stats: self.stats.clone(),
            })
        }

        async fn prove(&self, request: ProvingRequest) -> Result<ProvenTransaction, SignerError> {
            if let Some(message) = &self.fail_prove {
                return Err(SignerError::Rejected(message.clone()));
            }
            Ok(ProvenTransaction {
                identity: TxIdentity("tx-1".into()),
                payload: serde_json::to_vec(&request.bundle).unwrap(),
                stats: None,
            })
        }

        async fn authorize(
            &self,
            request: AuthorizationRequest,
        ) -> Result<AuthorizationWitness, SignerError> {
            self.authorize_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AuthorizationWitness {
                account: request.account,
                call_index: request.call_index,
                material: vec![0xcc],
            })
        }

        async fn request_capabilities(
            &self,
            _manifest: CapabilityManifest,
        ) -> Result<CapabilityGrant, SignerError> {
            Ok(CapabilityGrant::default())
        }
    }

    /// In-memory ledger recording sends.
    struct MemoryLedger {
        preset_status: TxStatus,
        sent: Mutex<Vec<TxIdentity>>,
    }

    impl MemoryLedger {
        fn new() -> Self {
            Self::with_status(TxStatus::Unknown)
        }

        fn with_status(status: TxStatus) -> Self {
            Self {
                preset_status: status,
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LedgerClient for MemoryLedger {
        async fn send_transaction(&self, tx: &ProvenTransaction) -> Result<(), LedgerError> {
            self.sent.lock().unwrap().push(tx.identity.clone());
            Ok(())
        }

        async fn transaction_status(
            &self,
            _identity: &TxIdentity,
        ) -> Result<TxStatus, LedgerError> {
            Ok(self.preset_status)
        }

        async fn wait_for_inclusion(
            &self,
            identity: &TxIdentity,
            _wait: &TxWait,
        ) -> Result<InclusionResult, LedgerError> {
            Ok(InclusionResult {
                identity: identity.clone(),
                block_height: Some(42),
            })
        }

        async fn current_fee_floor(&self) -> Result<u64, LedgerError> {
            Ok(100)
        }
    }

    fn bundle() -> CallBundle {
        CallBundle::new(vec![ContractCall::new(
            ContractAddress("swap".into()),
            "trade",
        )])
    }

    fn pipeline_with(
        signer: Arc<ScriptedSigner>,
        ledger: Arc<MemoryLedger>,
    ) -> (TransactionPipeline, Session) {
        let session = Session::embedded(signer as Arc<dyn Signer>);
        let pipeline =
            TransactionPipeline::new(ledger as Arc<dyn LedgerClient>, ProgressBroadcaster::new());
        (pipeline, session)
    }

    fn phases(events: &[TxProgressEvent]) -> Vec<TxPhase> {
        events.iter().map(|e| e.phase).collect()
    }

    #[tokio::test]
    async fn test_no_wait_skips_mining() {
        let ledger = Arc::new(MemoryLedger::new());
        let (pipeline, session) =
            pipeline_with(Arc::new(ScriptedSigner::default()), Arc::clone(&ledger));
        let mut sub = pipeline.events().subscribe();

        let outcome = pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await
            .unwrap();

        assert!(outcome.inclusion.is_none());
        assert_eq!(ledger.sent.lock().unwrap().len(), 1);
        assert_eq!(
            phases(&sub.drain_ready()),
            vec![
                TxPhase::Simulating,
                TxPhase::Proving,
                TxPhase::Sending,
                TxPhase::Complete
            ]
        );
    }

    #[tokio::test]
    async fn test_inclusion_wait_runs_mining() {
        let (pipeline, session) = pipeline_with(
            Arc::new(ScriptedSigner::default()),
            Arc::new(MemoryLedger::new()),
        );
        let mut sub = pipeline.events().subscribe();

        let outcome = pipeline
            .submit(
                &session,
                bundle(),
                FeeConfig::with_floor(10),
                TxWait::Inclusion { timeout: None },
            )
            .await
            .unwrap();

        assert_eq!(outcome.inclusion.unwrap().block_height, Some(42));
        let seen = phases(&sub.drain_ready());
        assert!(seen.contains(&TxPhase::Mining));
        assert_eq!(*seen.last().unwrap(), TxPhase::Complete);
    }

    #[tokio::test]
    async fn test_phase_sequence_is_monotonic() {
        let (pipeline, session) = pipeline_with(
            Arc::new(ScriptedSigner::default()),
            Arc::new(MemoryLedger::new()),
        );
        let mut sub = pipeline.events().subscribe();

        pipeline
            .submit(
                &session,
                bundle(),
                FeeConfig::with_floor(10),
                TxWait::Inclusion { timeout: None },
            )
            .await
            .unwrap();

        let events = sub.drain_ready();
        let tx_id = events[0].tx_id;
        let mut last_rank = None;
        for event in &events {
            assert_eq!(event.tx_id, tx_id);
            if let Some(last) = last_rank {
                assert!(event.phase.rank() > last, "phase regressed");
            }
            last_rank = Some(event.phase.rank());
        }
    }

    #[tokio::test]
    async fn test_witnesses_extracted_and_non_auth_effects_skipped() {
        let signer = Arc::new(ScriptedSigner {
            effects: vec![
                OffchainEffect::Log {
                    message: "ignored".into(),
                },
                OffchainEffect::AuthorizationRequest(AuthorizationRequest {
                    account: Address("acct".into()),
                    call_index: 0,
                    payload: vec![1],
                }),
                OffchainEffect::Other {
                    kind: "telemetry".into(),
                    data: serde_json::Value::Null,
                },
            ],
            ..Default::default()
        });
        let (pipeline, session) = pipeline_with(Arc::clone(&signer), Arc::new(MemoryLedger::new()));
        let mut sub = pipeline.events().subscribe();

        pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await
            .unwrap();

        // One witness for the single authorization request; the log and
        // telemetry records produced no signer calls.
        assert_eq!(signer.authorize_calls.load(Ordering::SeqCst), 1);

        let events = sub.drain_ready();
        let simulating = &events[0];
        assert!(simulating.breakdowns[0]
            .steps
            .iter()
            .any(|s| s.name == "witness[0]"));
    }

    #[tokio::test]
    async fn test_duplicate_submission_guard() {
        let ledger = Arc::new(MemoryLedger::with_status(TxStatus::Final));
        let (pipeline, session) =
            pipeline_with(Arc::new(ScriptedSigner::default()), Arc::clone(&ledger));
        let mut sub = pipeline.events().subscribe();

        let err = pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await;

        assert!(matches!(
            err,
            Err(PipelineError::DuplicateSubmission { .. })
        ));
        // Nothing was handed to the network and no sending success event
        // precedes the error.
        assert!(ledger.sent.lock().unwrap().is_empty());
        let seen = phases(&sub.drain_ready());
        assert_eq!(
            seen,
            vec![TxPhase::Simulating, TxPhase::Proving, TxPhase::Error]
        );
    }

    #[tokio::test]
    async fn test_failure_emits_one_error_event_then_reraises() {
        let signer = Arc::new(ScriptedSigner {
            fail_prove: Some("user rejected the proof request".into()),
            ..Default::default()
        });
        let (pipeline, session) = pipeline_with(signer, Arc::new(MemoryLedger::new()));
        let mut sub = pipeline.events().subscribe();

        let err = pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await;
        assert!(matches!(err, Err(PipelineError::Phase { phase, .. }) if phase == "proving"));

        let events = sub.drain_ready();
        let errors: Vec<_> = events
            .iter()
            .filter(|e| e.phase == TxPhase::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].error.as_deref(),
            Some("The request was declined in the signer.")
        );
    }

    #[tokio::test]
    async fn test_late_snapshot_carries_full_history() {
        let signer = Arc::new(ScriptedSigner {
            stats: Some(BackendStats {
                total_ms: 30,
                steps: vec![BackendStep {
                    name: "sync".into(),
                    duration_ms: 30,
                }],
            }),
            ..Default::default()
        });
        let (pipeline, session) = pipeline_with(signer, Arc::new(MemoryLedger::new()));
        let mut sub = pipeline.events().subscribe();

        pipeline
            .submit(
                &session,
                bundle(),
                FeeConfig::with_floor(10),
                TxWait::Inclusion { timeout: None },
            )
            .await
            .unwrap();

        let events = sub.drain_ready();
        let last = events.last().unwrap();
        assert_eq!(last.phase, TxPhase::Complete);
        for key in ["simulating", "proving", "sending", "mining"] {
            assert!(
                last.durations_ms.contains_key(key),
                "missing duration for {key}"
            );
        }
        assert_eq!(last.breakdowns.len(), 4);
        assert_eq!(last.breakdowns[0].steps[0].name, "sync");
    }

    #[tokio::test]
    async fn test_independent_submissions_have_independent_ids() {
        let (pipeline, session) = pipeline_with(
            Arc::new(ScriptedSigner::default()),
            Arc::new(MemoryLedger::new()),
        );
        let a = pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await
            .unwrap();
        let b = pipeline
            .submit(&session, bundle(), FeeConfig::with_floor(10), TxWait::NoWait)
            .await
            .unwrap();
        assert_ne!(a.tx_id, b.tx_id);
    }

    #[tokio::test]
    async fn test_recommended_fee_uses_floor() {
        let (pipeline, _session) = pipeline_with(
            Arc::new(ScriptedSigner::default()),
            Arc::new(MemoryLedger::new()),
        );
        let fee = pipeline.recommended_fee().await.unwrap();
        assert_eq!(fee.floor, 100);
        assert_eq!(fee.priority, 0);
    }
}
