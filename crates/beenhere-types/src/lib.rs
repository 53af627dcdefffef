pub mod digest;
pub mod error;
pub mod match_state;
pub mod visit_id;

pub use digest::UrlDigest;
pub use error::{Result, TrackerError};
pub use match_state::MatchState;
pub use visit_id::VisitId;
