pub mod phase;
pub mod stimulus;
pub mod trial;

pub use phase::TrialPhase;
pub use stimulus::{AuditoryParams, ParseStimulusError, Presentation, StimulusId, VisualParams};
pub use trial::{BlockRecord, RewardKind, TrialRecord};
