//! Deterministic execution tracer for short untrusted student programs.
//!
//! The engine runs a program written in a small teaching language and emits
//! a step-by-step trace: one [`Step`](trace::Step) per instrumented line,
//! each carrying variable snapshots and the output printed since the
//! previous step. A visualizer replays the trace like a film strip.
//!
//! # Architecture
//!
//! - [`io`] — virtual stdin/stdout: an in-memory output buffer and canned
//!   input replayed with echo, so traces look like terminal transcripts.
//! - [`governor`] — event-count and wall-clock caps checked at every
//!   instrumentation event.
//! - [`value`] / [`snapshot`] — runtime values and the textual serializer
//!   that turns scopes into JSON-safe maps.
//! - [`interp`] — the tracing interpreter: frame acceptance, line and
//!   return events, the step recorder.
//! - [`session`] — the run boundary: compile, execute, classify the ending,
//!   finalize the trace.
//!
//! Everything is single-threaded; one run owns one
//! [`ExecutionContext`](interp::ExecutionContext) and nothing outlives it.

pub mod error;
pub mod governor;
pub mod interp;
pub mod io;
pub mod session;
pub mod snapshot;
pub mod trace;
pub mod value;

pub use error::RuntimeError;
pub use governor::Limits;
pub use session::{compile_library, run, RunOutcome, RunReport, RunRequest, DEFAULT_SEED};
pub use trace::{EventKind, Step, Trace, MODULE_SCOPE};
