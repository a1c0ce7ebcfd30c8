pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod score;
pub mod store;

pub use cache::{Clock, ManualClock, SystemClock, TtlCache};
pub use config::{Config, TextScorerKind};
pub use error::Error;
pub use model::{City, Location, ScoredCandidate, StateRecord};
pub use score::{ScoreWeights, TextScorer};
pub use store::{CandidateFilter, CityStore};
