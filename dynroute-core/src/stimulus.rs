use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifies what a trial presents: `vis1`, `sound2`, ... or `catch`.
///
/// Serialises as the bare string so it can key JSON maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StimulusId {
    Visual(u8),
    Auditory(u8),
    Catch,
}

impl StimulusId {
    pub fn is_visual(&self) -> bool {
        matches!(self, StimulusId::Visual(_))
    }

    pub fn is_auditory(&self) -> bool {
        matches!(self, StimulusId::Auditory(_))
    }

    pub fn is_catch(&self) -> bool {
        matches!(self, StimulusId::Catch)
    }
}

impl fmt::Display for StimulusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StimulusId::Visual(n) => write!(f, "vis{n}"),
            StimulusId::Auditory(n) => write!(f, "sound{n}"),
            StimulusId::Catch => f.write_str("catch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized stimulus identifier `{0}`")]
pub struct ParseStimulusError(pub String);

impl FromStr for StimulusId {
    type Err = ParseStimulusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "catch" {
            return Ok(StimulusId::Catch);
        }
        let invalid = || ParseStimulusError(s.to_string());
        if let Some(n) = s.strip_prefix("vis") {
            n.parse().map(StimulusId::Visual).map_err(|_| invalid())
        } else if let Some(n) = s.strip_prefix("sound") {
            n.parse().map(StimulusId::Auditory).map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for StimulusId {
    type Error = ParseStimulusError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StimulusId> for String {
    fn from(id: StimulusId) -> Self {
        id.to_string()
    }
}

/// Grating parameters handed to the renderer at onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualParams {
    pub stimulus: StimulusId,
    pub frames: u32,
    pub contrast: f32,
    /// Clockwise degrees from vertical.
    pub orientation: f32,
    /// Degrees of visual angle.
    pub size: f32,
}

/// Tone parameters handed to the sound collaborator at onset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditoryParams {
    pub stimulus: StimulusId,
    pub duration_s: f64,
    pub tone_freq_hz: Option<f64>,
}

/// What the trial will present once its pre-stimulus period elapses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Presentation {
    Visual(VisualParams),
    Auditory(AuditoryParams),
    Nothing,
}
