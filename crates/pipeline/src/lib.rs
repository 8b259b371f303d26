//! Transaction submission pipeline.
//!
//! One submission runs four strictly ordered phases (simulate, prove, send,
//! mine) against the active signer session and the network ledger client.
//! Every phase completion broadcasts a [`events::TxProgressEvent`] carrying a
//! full snapshot of timings so far, so a late subscriber still sees complete
//! history in the final event. Failures emit one `error` event and are then
//! re-raised, never swallowed.

pub mod broadcast;
pub mod events;
pub mod ledger;
pub mod pipeline;

pub use broadcast::{ProgressBroadcaster, ProgressSubscription};
pub use events::{PhaseBreakdown, SubStep, TxPhase, TxProgressEvent};
pub use ledger::{InclusionResult, LedgerClient, LedgerError, TxStatus, TxWait};
pub use pipeline::{TransactionPipeline, TxOutcome};
