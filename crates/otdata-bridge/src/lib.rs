//! Process-isolation bridge into a hosted oTree deployment.
//!
//! Every query spawns one single-use worker process pinned to the deployment
//! directory. The worker boots the hosted application, runs exactly one
//! query, and reports one result envelope; the envelope travels back through
//! a one-shot [`ResultChannel`] and failures are re-raised caller-side with
//! their original kind and message. Workers are never reused: the hosted
//! application's bootstrap is not reentrant within one process.

mod bridge;
mod channel;
mod query;

pub use bridge::{ExecutionBridge, WorkerCommand};
pub use channel::ResultChannel;
pub use query::{Query, QueryEnvelope, ResultEnvelope, WorkerOptions};
