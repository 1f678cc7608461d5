use crate::errors::BotError;
use crate::modules::session::model::Resolution;
use crate::transport::Choice;
use std::path::PathBuf;

/// The user-chosen output treatment. Immutable once resolved from a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeSpec {
    /// Fixed denoise+sharpen filter graph at a high-quality constant.
    Enhance,
    /// Downscale to exact target dimensions under a bitrate cap.
    Resize {
        width: u32,
        height: u32,
        bitrate: String,
    },
}

impl TranscodeSpec {
    /// Human label used in status messages ("Enhancing video... 42% complete").
    pub fn activity(&self) -> String {
        match self {
            TranscodeSpec::Enhance => "Enhancing video".to_string(),
            TranscodeSpec::Resize { height, .. } => format!("Converting to {}p", height),
        }
    }
}

pub const ENHANCE_TOKEN: &str = "enhance";

/// Resize rungs offered below the input's own height: (width, height, bitrate cap).
const RESIZE_LADDER: [(u32, u32, &str); 3] = [
    (1920, 1080, "4M"),
    (1280, 720, "2M"),
    (854, 480, "1M"),
];

/// Choice set for a probed input: quality enhancement always, plus each
/// ladder rung strictly below the current height.
pub fn available_choices(resolution: Resolution) -> Vec<Choice> {
    let mut choices = vec![Choice::new("Enhance Quality", ENHANCE_TOKEN)];
    for (width, height, _) in RESIZE_LADDER {
        if height < resolution.height {
            choices.push(Choice::new(
                format!("Convert to {}p", height),
                format!("{}x{}", width, height),
            ));
        }
    }
    choices
}

/// Resolve an option token back into a spec. Only tokens this bot could have
/// offered are accepted; anything else is `UnknownOption`.
pub fn spec_for_token(token: &str) -> Result<TranscodeSpec, BotError> {
    if token == ENHANCE_TOKEN {
        return Ok(TranscodeSpec::Enhance);
    }
    for (width, height, bitrate) in RESIZE_LADDER {
        if token == format!("{}x{}", width, height) {
            return Ok(TranscodeSpec::Resize {
                width,
                height,
                bitrate: bitrate.to_string(),
            });
        }
    }
    Err(BotError::UnknownOption(token.to_string()))
}

/// A file the transport staged on local disk for this conversation.
#[derive(Debug, Clone)]
pub struct UploadedVideo {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: Option<String>,
}

impl UploadedVideo {
    /// Video check: declared content type wins, filename extension as a
    /// fallback for transports that do not carry one.
    pub fn is_video(&self) -> bool {
        if let Some(ct) = &self.content_type {
            if let Ok(m) = ct.parse::<mime::Mime>() {
                return m.type_() == mime::VIDEO;
            }
        }
        mime_guess::from_path(&self.file_name)
            .first()
            .map(|m| m.type_() == mime::VIDEO)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn res(width: u32, height: u32) -> Resolution {
        Resolution { width, height }
    }

    #[test]
    fn choices_for_1080p_offer_enhance_and_lower_rungs_only() {
        let tokens: Vec<String> = available_choices(res(1920, 1080))
            .into_iter()
            .map(|c| c.token)
            .collect();
        assert_eq!(tokens, vec!["enhance", "1280x720", "854x480"]);
    }

    #[test]
    fn choices_for_480p_offer_enhance_only() {
        let tokens: Vec<String> = available_choices(res(854, 480))
            .into_iter()
            .map(|c| c.token)
            .collect();
        assert_eq!(tokens, vec!["enhance"]);
    }

    #[test]
    fn tokens_resolve_to_specs() {
        assert_eq!(spec_for_token("enhance").unwrap(), TranscodeSpec::Enhance);
        assert_eq!(
            spec_for_token("1280x720").unwrap(),
            TranscodeSpec::Resize {
                width: 1280,
                height: 720,
                bitrate: "2M".to_string(),
            }
        );
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(matches!(
            spec_for_token("999x999"),
            Err(BotError::UnknownOption(_))
        ));
        assert!(matches!(spec_for_token(""), Err(BotError::UnknownOption(_))));
    }

    #[test]
    fn video_detection_prefers_content_type() {
        let upload = UploadedVideo {
            path: PathBuf::from("/tmp/x"),
            file_name: "document.pdf".to_string(),
            content_type: Some("video/mp4".to_string()),
        };
        assert!(upload.is_video());
    }

    #[test]
    fn video_detection_falls_back_to_extension() {
        let upload = UploadedVideo {
            path: PathBuf::from("/tmp/x"),
            file_name: "holiday.mkv".to_string(),
            content_type: None,
        };
        assert!(upload.is_video());

        let upload = UploadedVideo {
            path: PathBuf::from("/tmp/x"),
            file_name: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
        };
        assert!(!upload.is_video());
    }
}
