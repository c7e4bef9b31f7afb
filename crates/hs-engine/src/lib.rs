//! Sweep engine for the HMM aligner: runs the sample → invoke → aggregate →
//! cleanup pipeline sequentially, one aligner process at a time.

pub mod engine;
pub mod execution;

pub use engine::SweepEngine;
pub use execution::{ExecutionReport, ProcessInvoker, RunExecutor};
