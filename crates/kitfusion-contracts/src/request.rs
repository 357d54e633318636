use crate::errors::GenerationFailure;
use crate::media::ImagePayload;

/// Lifecycle of the single generation this session may run at a time.
///
/// Result and error live inside the state so a stale result can never be
/// shown next to an in-flight request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Succeeded(ImagePayload),
    Failed(GenerationFailure),
}

impl RequestState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InFlight => "in_flight",
            Self::Succeeded(_) => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight)
    }

    pub fn result(&self) -> Option<&ImagePayload> {
        match self {
            Self::Succeeded(image) => Some(image),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&GenerationFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// Idle/Succeeded/Failed -> InFlight. Returns `None` when a request is
    /// already pending.
    pub fn begin(&self) -> Option<Self> {
        if self.is_in_flight() {
            return None;
        }
        Some(Self::InFlight)
    }

    /// InFlight -> Succeeded/Failed. Outcomes that arrive in any other
    /// state are dropped.
    pub fn complete(&self, outcome: Result<ImagePayload, GenerationFailure>) -> Option<Self> {
        if !self.is_in_flight() {
            return None;
        }
        Some(match outcome {
            Ok(image) => Self::Succeeded(image),
            Err(failure) => Self::Failed(failure),
        })
    }

    /// Closes the error banner. Only meaningful in `Failed`.
    pub fn dismiss(&self) -> Option<Self> {
        match self {
            Self::Failed(_) => Some(Self::Idle),
            _ => None,
        }
    }
}
