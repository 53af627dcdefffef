pub mod backup;
pub mod classify;
pub mod export;
pub mod fingerprint;
pub mod import;
pub mod normalize;
pub mod record;
pub mod service;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;
pub mod tracker;

#[cfg(test)]
mod tests;
#[cfg(test)]
mod testutil;

pub use beenhere_types::{MatchState, Result, TrackerError, VisitId};
pub use service::handle;
pub use tracker::{Tracker, TrackerOptions};
