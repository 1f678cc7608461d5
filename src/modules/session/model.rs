use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use time::OffsetDateTime;

/// Width and height of a video stream. Displays as `WxH`, the same shape
/// ffprobe reports with `-of csv=s=x:p=0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s.trim().split_once('x').ok_or(())?;
        Ok(Self {
            width: w.parse().map_err(|_| ())?,
            height: h.parse().map_err(|_| ())?,
        })
    }
}

/// Per-conversation state between an upload and the matching selection.
#[derive(Debug, Clone)]
pub struct Session {
    pub input_path: PathBuf,
    pub resolution: Resolution,
    pub created_at: OffsetDateTime,
}

impl Session {
    pub fn new(input_path: PathBuf, resolution: Resolution) -> Self {
        Self {
            input_path,
            resolution,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_roundtrips_through_display() {
        let res: Resolution = "1920x1080".parse().unwrap();
        assert_eq!(res.to_string(), "1920x1080");
    }

    #[test]
    fn resolution_rejects_malformed_input() {
        assert!("1920".parse::<Resolution>().is_err());
        assert!("x".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
    }
}
