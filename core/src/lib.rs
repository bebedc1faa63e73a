//! Infrastructure shared by every Blocksim crate: the discrete-event scheduler,
//! the single seeded source of randomness, logging bootstrap and the common
//! error type. Nothing in this crate knows about blocks, nodes or consensus —
//! those concerns live in the crates built on top of it.

pub mod error;
pub mod log;
pub mod rng;
pub mod scheduler;

pub use error::{SimError, SimResult};
pub use rng::SimRng;
pub use scheduler::{run_until, Cancel, Scheduler, Simulation};
