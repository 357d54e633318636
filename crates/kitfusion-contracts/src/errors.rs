use thiserror::Error;

pub const CAMERA_PERMISSION_DENIED_MESSAGE: &str =
    "Camera permission denied. Please allow access in your system settings.";
pub const CAMERA_NOT_FOUND_MESSAGE: &str = "No camera device found.";
pub const CAMERA_UNKNOWN_MESSAGE: &str = "Could not access camera.";

pub const GENERIC_REFUSAL_MESSAGE: &str =
    "No image generated. The model may have refused the request due to safety filters.";

/// Camera acquisition or capture failure.
///
/// Recovered inside the image slot: the slot falls back to empty, shows the
/// message and offers a retry. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureFailure {
    #[error("{0}")]
    PermissionDenied(String),
    #[error("{0}")]
    DeviceNotFound(String),
    #[error("{0}")]
    Unknown(String),
}

impl CaptureFailure {
    pub fn permission_denied() -> Self {
        Self::PermissionDenied(CAMERA_PERMISSION_DENIED_MESSAGE.to_string())
    }

    pub fn device_not_found() -> Self {
        Self::DeviceNotFound(CAMERA_NOT_FOUND_MESSAGE.to_string())
    }

    pub fn unknown(detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref().trim();
        if detail.is_empty() {
            return Self::Unknown(CAMERA_UNKNOWN_MESSAGE.to_string());
        }
        Self::Unknown(format!("{CAMERA_UNKNOWN_MESSAGE} ({detail})"))
    }

    /// Classifies a backend error message into a failure kind.
    pub fn classify(detail: &str) -> Self {
        let lowered = detail.to_ascii_lowercase();
        if lowered.contains("permission")
            || lowered.contains("denied")
            || lowered.contains("not allowed")
            || lowered.contains("notallowed")
        {
            return Self::permission_denied();
        }
        if lowered.contains("not found")
            || lowered.contains("notfound")
            || lowered.contains("no such device")
            || lowered.contains("no device")
        {
            return Self::device_not_found();
        }
        Self::unknown(detail)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::DeviceNotFound(_) => "device_not_found",
            Self::Unknown(_) => "unknown",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied(message)
            | Self::DeviceNotFound(message)
            | Self::Unknown(message) => message,
        }
    }
}

/// Terminal failure of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    /// The service answered but produced no image; carries its text or the
    /// generic refusal message.
    #[error("{0}")]
    ServiceRefusal(String),
    /// Network, auth, status or payload failure with the underlying message.
    #[error("{0}")]
    Transport(String),
}

impl GenerationFailure {
    pub fn refusal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.trim().is_empty() {
            return Self::ServiceRefusal(GENERIC_REFUSAL_MESSAGE.to_string());
        }
        Self::ServiceRefusal(text)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceRefusal(_) => "service_refusal",
            Self::Transport(_) => "transport",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::ServiceRefusal(message) | Self::Transport(message) => message,
        }
    }
}
