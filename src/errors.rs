use thiserror::Error;

/// Everything that can go wrong inside a single conversation's job.
///
/// All of these are recovered at the chat service boundary: reported to the
/// user, logged, and followed by a state reset. None of them take the process
/// down.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("probe failed: {0}")]
    Probe(String),

    #[error("could not determine video duration")]
    DurationUnknown,

    #[error("failed to launch encoder: {0}")]
    Spawn(std::io::Error),

    #[error("encoder exited with status {0:?}")]
    EncodeFailed(Option<i32>),

    #[error("no session for this conversation")]
    SessionNotFound,

    #[error("a job is already running for this conversation")]
    JobAlreadyRunning,

    #[error("unsupported upload: {0}")]
    UnsupportedInput(String),

    #[error("unknown option token: {0}")]
    UnknownOption(String),

    #[error("transport delivery failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Readable message for the conversation. Internal detail stays in the log.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Probe(_) => {
                "Could not read that video. Please try again with a valid video file.".to_string()
            }
            BotError::DurationUnknown => {
                "Could not determine the video duration. Please try another file.".to_string()
            }
            BotError::Spawn(_) | BotError::EncodeFailed(_) => {
                "Video processing failed. Please try again later.".to_string()
            }
            BotError::SessionNotFound => {
                "No video on file for this conversation. Please upload a video first.".to_string()
            }
            BotError::JobAlreadyRunning => {
                "A job is already running for this conversation. Please wait for it to finish."
                    .to_string()
            }
            BotError::UnsupportedInput(_) => {
                "Please send a video file only. Other file types are not supported.".to_string()
            }
            BotError::UnknownOption(token) => format!("Unknown option: {}", token),
            BotError::Transport(_) | BotError::Io(_) => {
                "An unexpected error occurred. Please try again later.".to_string()
            }
        }
    }
}
