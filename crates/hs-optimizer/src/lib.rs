//! # hs-optimizer
//!
//! Parameter space definitions, the seeded random sampler, sweep
//! configuration and run tracking for the HMM hyperparameter sweep.

mod config;
mod run;
mod search;

pub use config::{StderrMode, SweepConfig};
pub use run::{Run, RunStatus, SweepId, SweepState, SweepStatus};
pub use search::{
    round_to_decimals, seeded_rng, FieldSpec, ParameterRange, ParameterSchema, RandomSampler,
    RangeSpec, SchemaKind, RANGE_DECIMALS,
};
