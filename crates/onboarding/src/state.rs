//! Onboarding status, observable state and step accounting.

use serde::{Deserialize, Serialize};

/// Where the onboarding machine currently sits.
///
/// Transitions are driven by [`crate::OnboardingFlow`]; every status is
/// stable under repeated driving until its step's work actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Not started, or freshly reset.
    Idle,
    /// Waiting for a session to be settled (embedded or external).
    Connecting,
    /// Registering the base contract state for an external signer.
    Registering,
    /// Running the initial balance/rate probe.
    Simulating,
    /// Registering the faucet contract before the drip detour.
    RegisteringDrip,
    /// Waiting for the user to supply the drip secret phrase.
    AwaitingDrip,
    /// Executing the drip claim with the supplied secret.
    ExecutingDrip,
    /// The drip claim failed; a new secret can be supplied.
    DripFailed,
    /// Onboarding finished.
    Completed,
    /// A non-drip step failed; only a reset restarts the flow.
    Error,
}

impl OnboardingStatus {
    /// Statuses from which [`crate::OnboardingFlow::supply_secret`] is
    /// accepted.
    pub fn accepts_secret(&self) -> bool {
        matches!(self, Self::AwaitingDrip | Self::DripFailed)
    }

    /// Terminal for the happy path.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Result of the initial probe of the connected account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// Spendable balance of the primary account, in base units.
    pub balance: u128,
    /// Advertised reward rate, when the backend reports one.
    pub rate: Option<f64>,
}

/// Observable snapshot of the flow. The drip secret is deliberately not
/// part of this view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnboardingState {
    pub status: OnboardingStatus,
    /// Last probe outcome, kept across the drip detour.
    pub last_probe: Option<ProbeResult>,
    /// Whether the zero-balance probe routed the flow through the drip.
    pub needs_drip: bool,
    /// A deferred action should resume once onboarding completes.
    pub resume_pending_action: bool,
    /// User-facing message for the most recent failure.
    pub error: Option<String>,
}

impl OnboardingState {
    pub(crate) fn idle() -> Self {
        Self {
            status: OnboardingStatus::Idle,
            last_probe: None,
            needs_drip: false,
            resume_pending_action: false,
            error: None,
        }
    }
}

/// Progress indicator for UI surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepInfo {
    /// 1-based current step; 0 while idle or errored.
    pub current: u8,
    /// Total steps for this run; grows when the drip detour is taken.
    pub total: u8,
}

/// Pure mapping from status to a step counter.
///
/// The base flow has three steps (connect, register, probe); the drip
/// detour adds two more (register drip, claim drip).
pub fn step_info(status: OnboardingStatus, needs_drip: bool) -> StepInfo {
    let total = if needs_drip { 5 } else { 3 };
    let current = match status {
        OnboardingStatus::Idle | OnboardingStatus::Error => 0,
        OnboardingStatus::Connecting => 1,
        OnboardingStatus::Registering => 2,
        OnboardingStatus::Simulating => 3,
        OnboardingStatus::RegisteringDrip | OnboardingStatus::AwaitingDrip => 4,
        OnboardingStatus::ExecutingDrip | OnboardingStatus::DripFailed => 5,
        OnboardingStatus::Completed => total,
    };
    StepInfo { current, total }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_totals_grow_with_the_drip_detour() {
        assert_eq!(step_info(OnboardingStatus::Simulating, false).total, 3);
        assert_eq!(step_info(OnboardingStatus::Simulating, true).total, 5);
    }

    #[test]
    fn completed_reports_the_final_step() {
        let base = step_info(OnboardingStatus::Completed, false);
        assert_eq!((base.current, base.total), (3, 3));

        let dripped = step_info(OnboardingStatus::Completed, true);
        assert_eq!((dripped.current, dripped.total), (5, 5));
    }

    #[test]
    fn idle_and_error_show_no_progress() {
        assert_eq!(step_info(OnboardingStatus::Idle, false).current, 0);
        assert_eq!(step_info(OnboardingStatus::Error, true).current, 0);
    }

    #[test]
    fn drip_statuses_map_to_the_detour_steps() {
        assert_eq!(step_info(OnboardingStatus::RegisteringDrip, true).current, 4);
        assert_eq!(step_info(OnboardingStatus::AwaitingDrip, true).current, 4);
        assert_eq!(step_info(OnboardingStatus::ExecutingDrip, true).current, 5);
        assert_eq!(step_info(OnboardingStatus::DripFailed, true).current, 5);
    }
}
