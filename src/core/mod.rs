//! Core collection pipeline
//!
//! This module contains:
//! - The task records assembled during a run
//! - The retrying fetcher and the request correlator
//! - The collector that fans out one unit per distinct task
//! - The sink rendering the report and feeding the cache

mod collector;
mod correlator;
mod fetcher;
mod record;
pub mod report;
mod sink;

pub use collector::*;
pub use correlator::*;
pub use fetcher::*;
pub use record::*;
pub use sink::*;
