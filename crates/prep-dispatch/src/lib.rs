//! # prep-dispatch
//!
//! The async boundary of the scheduling preparation engine: calendar store
//! and classifier trait definitions, the multi-day break driver, the
//! planning request assembler, and the solver HTTP client.
//!
//! The pure interval/date computation lives in `prep-engine`; this crate
//! owns everything that can block, fail upstream, time out, or be
//! cancelled.
//!
//! ## Modules
//!
//! - [`store`] -- calendar store trait and typed store errors
//! - [`classifier`] -- best-effort category classification boundary
//! - [`breaks`] -- multi-day break generation driver
//! - [`assembler`] -- planning request assembly and ordering
//! - [`solver`] -- solver HTTP client (submit + callback contract)
//! - [`error`] -- error types

pub mod assembler;
pub mod breaks;
pub mod classifier;
pub mod error;
pub mod solver;
pub mod store;

pub use assembler::{Assembler, AssemblyInputs};
pub use breaks::generate_break_events_for_window;
pub use classifier::{best_match_category, ClassificationScores, Classifier, ClassifierError};
pub use error::DispatchError;
pub use solver::{SolverClient, SolverConfig};
pub use store::{CalendarStore, StoreError, StoreErrorCode};
