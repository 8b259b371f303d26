//! The onboarding flow driver.
//!
//! One [`OnboardingFlow`] owns the machine state behind an async mutex and
//! advances it one step per [`drive`](OnboardingFlow::drive) call. Steps are
//! at-most-once: each side-effecting step flips its idempotency flag before
//! running, so a crashed-and-redriven flow never re-registers a contract or
//! re-probes an account. The drip claim is the one recoverable step; every
//! other failure parks the machine in [`OnboardingStatus::Error`] until a
//! reset.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use common::{normalize_backend_message, OnboardingFlowError};
use connect::SessionManager;

use crate::state::{step_info, OnboardingState, OnboardingStatus, ProbeResult, StepInfo};

/// Registers the application's contract state with the connected signer.
///
/// Registration is only needed for external signers; the embedded signer is
/// pre-provisioned.
#[async_trait]
pub trait ContractRegistrar: Send + Sync {
    /// Register the base contract state.
    async fn register_base(&self) -> anyhow::Result<()>;

    /// Register the faucet contract ahead of a drip claim.
    async fn register_drip(&self) -> anyhow::Result<()>;
}

/// Runs the initial balance/rate probe against the connected account.
#[async_trait]
pub trait BalanceProber: Send + Sync {
    async fn probe(&self) -> anyhow::Result<ProbeResult>;
}

/// Executes a faucet drip claim. Implementations drive the transaction
/// pipeline; the flow only cares about success or failure.
#[async_trait]
pub trait DripExecutor: Send + Sync {
    async fn claim(&self, secret: &str) -> anyhow::Result<()>;
}

/// Internal state: the observable snapshot plus fields that must not leak
/// into it.
struct FlowState {
    public: OnboardingState,
    /// Connect step settled (session confirmed or embedded accepted).
    session_settled: bool,
    /// Drip secret held for the next claim attempt. Consumed on use.
    secret: Option<String>,
    has_registered_base: bool,
    has_simulated: bool,
}

impl FlowState {
    fn idle() -> Self {
        Self {
            public: OnboardingState::idle(),
            session_settled: false,
            secret: None,
            has_registered_base: false,
            has_simulated: false,
        }
    }
}

/// Drives onboarding from [`OnboardingStatus::Idle`] to
/// [`OnboardingStatus::Completed`].
pub struct OnboardingFlow {
    manager: Arc<SessionManager>,
    registrar: Arc<dyn ContractRegistrar>,
    prober: Arc<dyn BalanceProber>,
    drip: Arc<dyn DripExecutor>,
    state: Mutex<FlowState>,
}

impl OnboardingFlow {
    pub fn new(
        manager: Arc<SessionManager>,
        registrar: Arc<dyn ContractRegistrar>,
        prober: Arc<dyn BalanceProber>,
        drip: Arc<dyn DripExecutor>,
    ) -> Self {
        Self {
            manager,
            registrar,
            prober,
            drip,
            state: Mutex::new(FlowState::idle()),
        }
    }

    /// Begin a run. `resume_pending_action` records that the application has
    /// a deferred action to replay once onboarding completes.
    ///
    /// Starting is only valid from [`OnboardingStatus::Idle`]; an errored
    /// machine must be reset first, and a run already in progress is left
    /// alone.
    pub async fn start(&self, resume_pending_action: bool) -> Result<(), OnboardingFlowError> {
        let mut state = self.state.lock().await;
        match state.public.status {
            OnboardingStatus::Idle => {
                state.public.status = OnboardingStatus::Connecting;
                state.public.resume_pending_action = resume_pending_action;
                info!(resume_pending_action, "onboarding started");
                Ok(())
            }
            OnboardingStatus::Error => Err(OnboardingFlowError::RequiresReset),
            status => {
                debug!(?status, "onboarding already running; start ignored");
                Ok(())
            }
        }
    }

    /// Signal that the connect step has settled: a session (embedded or
    /// external) is active and should be used for the rest of the run.
    pub async fn session_ready(&self) {
        let mut state = self.state.lock().await;
        state.session_settled = true;
        debug!("session settled for onboarding");
    }

    /// Advance the machine by at most one step.
    ///
    /// Safe to call repeatedly from any status; statuses that are waiting on
    /// outside input (a session, a secret) simply report themselves. A step
    /// failure is returned *and* recorded in the observable state.
    pub async fn drive(&self) -> Result<OnboardingStatus, OnboardingFlowError> {
        let mut state = self.state.lock().await;
        match state.public.status {
            OnboardingStatus::Idle
            | OnboardingStatus::AwaitingDrip
            | OnboardingStatus::DripFailed
            | OnboardingStatus::Completed
            | OnboardingStatus::Error => Ok(state.public.status),

            OnboardingStatus::Connecting => {
                if !state.session_settled {
                    return Ok(OnboardingStatus::Connecting);
                }
                if self.manager.active().is_external() {
                    state.public.status = OnboardingStatus::Registering;
                } else {
                    // The embedded signer needs no registration.
                    state.has_registered_base = true;
                    state.public.status = OnboardingStatus::Simulating;
                }
                Ok(state.public.status)
            }

            OnboardingStatus::Registering => {
                if state.has_registered_base {
                    state.public.status = OnboardingStatus::Simulating;
                    return Ok(OnboardingStatus::Simulating);
                }
                // Flag first: a redriven flow must not register twice.
                state.has_registered_base = true;
                match self.registrar.register_base().await {
                    Ok(()) => {
                        state.public.status = OnboardingStatus::Simulating;
                        Ok(OnboardingStatus::Simulating)
                    }
                    Err(err) => Err(self.fail(&mut state, "registering", &err)),
                }
            }

            OnboardingStatus::Simulating => {
                if state.has_simulated {
                    return Ok(OnboardingStatus::Simulating);
                }
                state.has_simulated = true;
                match self.prober.probe().await {
                    Ok(probe) => {
                        let needs_drip = probe.balance == 0;
                        state.public.last_probe = Some(probe);
                        state.public.needs_drip = needs_drip;
                        state.public.status = if needs_drip {
                            info!("zero balance; routing through the drip detour");
                            OnboardingStatus::RegisteringDrip
                        } else {
                            OnboardingStatus::Completed
                        };
                        Ok(state.public.status)
                    }
                    Err(err) => Err(self.fail(&mut state, "simulating", &err)),
                }
            }

            OnboardingStatus::RegisteringDrip => {
                match self.registrar.register_drip().await {
                    Ok(()) => {
                        state.public.status = OnboardingStatus::AwaitingDrip;
                        Ok(OnboardingStatus::AwaitingDrip)
                    }
                    Err(err) => Err(self.fail(&mut state, "registering_drip", &err)),
                }
            }

            OnboardingStatus::ExecutingDrip => {
                let Some(secret) = state.secret.take() else {
                    state.public.status = OnboardingStatus::DripFailed;
                    return Err(OnboardingFlowError::MissingSecret);
                };
                match self.drip.claim(&secret).await {
                    Ok(()) => {
                        state.public.status = OnboardingStatus::Completed;
                        state.public.error = None;
                        info!("drip claim succeeded; onboarding complete");
                        Ok(OnboardingStatus::Completed)
                    }
                    Err(err) => {
                        // Recoverable: the user can supply another secret.
                        let message = normalize_backend_message(&err.to_string());
                        warn!(error = %err, "drip claim failed");
                        state.public.status = OnboardingStatus::DripFailed;
                        state.public.error = Some(message.clone());
                        Err(OnboardingFlowError::Step {
                            step: "executing_drip",
                            message,
                        })
                    }
                }
            }
        }
    }

    /// Supply the drip secret phrase. Accepted while awaiting the first
    /// claim and after a failed one; ignored in any other status.
    pub async fn supply_secret(&self, secret: impl Into<String>) {
        let mut state = self.state.lock().await;
        if !state.public.status.accepts_secret() {
            warn!(status = ?state.public.status, "drip secret ignored in this status");
            return;
        }
        state.secret = Some(secret.into());
        state.public.status = OnboardingStatus::ExecutingDrip;
        state.public.error = None;
    }

    /// Return the machine to [`OnboardingStatus::Idle`], clearing all flags
    /// and the held secret.
    pub async fn reset(&self) {
        let mut state = self.state.lock().await;
        *state = FlowState::idle();
        info!("onboarding reset");
    }

    pub async fn status(&self) -> OnboardingStatus {
        self.state.lock().await.public.status
    }

    /// Observable snapshot of the flow (never includes the secret).
    pub async fn state(&self) -> OnboardingState {
        self.state.lock().await.public.clone()
    }

    /// Step counter for the current run.
    pub async fn step_info(&self) -> StepInfo {
        let state = self.state.lock().await;
        step_info(state.public.status, state.public.needs_drip)
    }

    /// Whether a deferred application action should now be replayed.
    pub async fn should_resume_action(&self) -> bool {
        let state = self.state.lock().await;
        state.public.status.is_complete() && state.public.resume_pending_action
    }

    /// Terminal failure path for non-drip steps. Idempotency flags are left
    /// as they are; only a reset restarts the flow.
    fn fail(
        &self,
        state: &mut FlowState,
        step: &'static str,
        err: &anyhow::Error,
    ) -> OnboardingFlowError {
        let message = normalize_backend_message(&err.to_string());
        warn!(step, error = %err, "onboarding step failed");
        state.public.status = OnboardingStatus::Error;
        state.public.error = Some(message.clone());
        OnboardingFlowError::Step { step, message }
    }
}

impl std::fmt::Debug for OnboardingFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingFlow").finish_non_exhaustive()
    }
}
