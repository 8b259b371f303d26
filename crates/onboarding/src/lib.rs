//! Onboarding orchestration state machine.
//!
//! Sequences session acquisition, contract registration, the initial
//! balance/rate probe and the optional faucet ("drip") detour, driving the
//! connect and pipeline crates as primitives. The machine is safe under
//! at-least-once scheduling: re-invoking the driving step in the same status
//! never repeats a side effect, thanks to per-flow idempotency flags.

pub mod flow;
pub mod state;

pub use flow::{BalanceProber, ContractRegistrar, DripExecutor, OnboardingFlow};
pub use state::{step_info, OnboardingState, OnboardingStatus, ProbeResult, StepInfo};
