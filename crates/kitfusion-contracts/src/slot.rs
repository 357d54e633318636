use crate::errors::CaptureFailure;
use crate::media::ImagePayload;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotRole {
    Person,
    Garment,
}

impl SlotRole {
    pub const ALL: [SlotRole; 2] = [SlotRole::Person, SlotRole::Garment];

    pub fn key(&self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Garment => "garment",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Person => "1. Player Image",
            Self::Garment => "2. Jersey / Kit Image",
        }
    }

    pub fn hint(&self) -> &'static str {
        match self {
            Self::Person => "The person to dress up",
            Self::Garment => "The kit to apply",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "person" | "player" | "1" => Some(Self::Person),
            "garment" | "jersey" | "kit" | "2" => Some(Self::Garment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotMode {
    Empty {
        drag_over: bool,
        camera_error: Option<CaptureFailure>,
    },
    CameraActive,
    Filled(ImagePayload),
}

impl SlotMode {
    fn idle() -> Self {
        Self::Empty {
            drag_over: false,
            camera_error: None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty { .. } => "empty",
            Self::CameraActive => "camera_active",
            Self::Filled(_) => "filled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    DragEnter,
    DragLeave,
    /// A file was picked or dropped and decoded.
    FileLoaded(ImagePayload),
    CameraStarted,
    CameraFailed(CaptureFailure),
    Captured(ImagePayload),
    Cancel,
    Clear,
}

/// What the owner hears about: every fill and every clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotChange {
    Filled(ImagePayload),
    Cleared,
}

/// Pure transition function. Events that make no sense in the current
/// mode leave it unchanged and report nothing.
pub fn transition(mode: &SlotMode, event: SlotEvent) -> (SlotMode, Option<SlotChange>) {
    match (mode, event) {
        (SlotMode::Empty { camera_error, .. }, SlotEvent::DragEnter) => (
            SlotMode::Empty {
                drag_over: true,
                camera_error: camera_error.clone(),
            },
            None,
        ),
        (SlotMode::Empty { camera_error, .. }, SlotEvent::DragLeave) => (
            SlotMode::Empty {
                drag_over: false,
                camera_error: camera_error.clone(),
            },
            None,
        ),
        (SlotMode::Empty { .. }, SlotEvent::FileLoaded(payload)) => (
            SlotMode::Filled(payload.clone()),
            Some(SlotChange::Filled(payload)),
        ),
        (SlotMode::Empty { .. }, SlotEvent::CameraStarted) => (SlotMode::CameraActive, None),
        (SlotMode::Empty { drag_over, .. }, SlotEvent::CameraFailed(failure)) => (
            SlotMode::Empty {
                drag_over: *drag_over,
                camera_error: Some(failure),
            },
            None,
        ),
        (SlotMode::CameraActive, SlotEvent::CameraFailed(failure)) => (
            SlotMode::Empty {
                drag_over: false,
                camera_error: Some(failure),
            },
            None,
        ),
        (SlotMode::CameraActive, SlotEvent::Captured(payload)) => (
            SlotMode::Filled(payload.clone()),
            Some(SlotChange::Filled(payload)),
        ),
        (SlotMode::CameraActive, SlotEvent::Cancel) => (SlotMode::idle(), None),
        (SlotMode::Filled(_), SlotEvent::Clear) => (SlotMode::idle(), Some(SlotChange::Cleared)),
        (current, _) => (current.clone(), None),
    }
}

/// One of the two required inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    role: SlotRole,
    mode: SlotMode,
}

impl ImageSlot {
    pub fn new(role: SlotRole) -> Self {
        Self {
            role,
            mode: SlotMode::idle(),
        }
    }

    pub fn role(&self) -> SlotRole {
        self.role
    }

    pub fn mode(&self) -> &SlotMode {
        &self.mode
    }

    pub fn image(&self) -> Option<&ImagePayload> {
        match &self.mode {
            SlotMode::Filled(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self.mode, SlotMode::Filled(_))
    }

    pub fn is_camera_active(&self) -> bool {
        matches!(self.mode, SlotMode::CameraActive)
    }

    pub fn camera_error(&self) -> Option<&CaptureFailure> {
        match &self.mode {
            SlotMode::Empty { camera_error, .. } => camera_error.as_ref(),
            _ => None,
        }
    }

    pub fn apply(&mut self, event: SlotEvent) -> Option<SlotChange> {
        let (next, change) = transition(&self.mode, event);
        self.mode = next;
        change
    }

    /// One-line rendering for terminal status output.
    pub fn describe(&self) -> String {
        match &self.mode {
            SlotMode::Empty {
                drag_over: true, ..
            } => "drop to load".to_string(),
            SlotMode::Empty {
                camera_error: Some(failure),
                ..
            } => format!("empty - {} (retry with /camera {})", failure, self.role.key()),
            SlotMode::Empty { .. } => "empty".to_string(),
            SlotMode::CameraActive => "camera live (/capture or /cancel)".to_string(),
            SlotMode::Filled(payload) => {
                format!("{} ({} bytes)", payload.mime(), payload.approx_bytes())
            }
        }
    }
}
