//! Rent reclaim pipeline
//!
//! ```text
//! AccountScanner → Candidates → ReclaimOrchestrator → OutcomeSink
//!  (owner scan)    (empty only)  (close one by one)    (progress lines)
//! ```
//!
//! [`run::reclaim_rent`] ties the pipeline to a wallet session.

pub mod instruction;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod run;
pub mod scanner;

pub use instruction::{build_close_instruction, CLOSE_ACCOUNT_OPCODE};
pub use orchestrator::ReclaimOrchestrator;
pub use outcome::{CandidateOutcome, ReclaimFailure, TransactionOutcome};
pub use report::{lamports_to_sol, ConsoleSink, OutcomeSink};
pub use run::{reclaim_rent, RunSummary};
pub use scanner::{AccountScanner, Candidates, CustodyAccountSnapshot};
