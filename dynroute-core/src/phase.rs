use serde::{Deserialize, Serialize};

/// Lifecycle of the open trial, advanced only by the timing governor.
///
/// `Pending -> StimulusShown -> Responded | TimedOut -> Finalized`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrialPhase {
    #[default]
    Pending,
    StimulusShown,
    Responded,
    TimedOut,
    Finalized,
}

impl TrialPhase {
    /// Phases in which a lick can still become the trial's response.
    pub fn accepts_response(&self) -> bool {
        matches!(self, Self::StimulusShown)
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(&self, next: TrialPhase) -> bool {
        use TrialPhase::*;
        matches!(
            (self, next),
            (Pending, StimulusShown)
                | (StimulusShown, Responded)
                | (StimulusShown, TimedOut)
                | (Responded, Finalized)
                | (TimedOut, Finalized)
        )
    }
}
