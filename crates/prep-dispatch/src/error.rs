//! Error types for assembly and submission.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Prep(#[from] prep_engine::PrepError),

    /// A calendar store call failed; `call` names the originating
    /// operation so the caller can tell which read broke the run.
    #[error("Calendar store call {call} failed: {source}")]
    Store {
        call: &'static str,
        #[source]
        source: StoreError,
    },

    /// An internal attendee has no scheduling preferences in the store.
    #[error("No scheduling preferences found for internal attendee {0}")]
    MissingPreferences(String),

    #[error("Solver HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The solver answered with a non-2xx status. Logged, never retried
    /// automatically.
    #[error("Solver rejected the planning request with status {status}")]
    SolverRejected { status: u16 },

    #[error("Upstream call {call} timed out after {seconds}s")]
    Timeout { call: &'static str, seconds: u64 },

    /// The run was cancelled; partial results were discarded, nothing was
    /// submitted.
    #[error("Assembly run cancelled")]
    Cancelled,

    /// Assembly produced no event parts, no timeslots, or no users -- a
    /// request the solver would reject outright.
    #[error("Nothing to plan: {0}")]
    EmptyAssembly(&'static str),
}

pub type Result<T> = std::result::Result<T, DispatchError>;
