//! The node state machine (component E) and message/task taxonomy
//! (component F), plus the [`SimContext`] that threads the scheduler, PRNG,
//! network model, consensus algorithm and observer through every task.

mod context;
mod node;
mod protocol;
pub mod tasks;

#[cfg(test)]
mod tests;

pub use context::SimContext;
pub use node::{DownloadState, Node};
pub use protocol::ProtocolParams;
