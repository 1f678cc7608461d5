use crate::errors::BotError;
use crate::modules::session::model::Resolution;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Resolution of the first video stream, as reported by ffprobe.
pub async fn resolution(path: &Path) -> Result<Resolution, BotError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| BotError::Probe(format!("failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(BotError::Probe(format!(
            "ffprobe exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let resolution = parse_resolution(&stdout)?;
    debug!(path = %path.display(), %resolution, "probed resolution");
    Ok(resolution)
}

/// Container duration in seconds. Fails with `DurationUnknown` when ffprobe
/// reports nothing usable (zero-length or non-media input included); never
/// returns zero or a negative value.
pub async fn duration(path: &Path) -> Result<f64, BotError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|_| BotError::DurationUnknown)?;

    if !output.status.success() {
        return Err(BotError::DurationUnknown);
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let seconds = parse_duration(&stdout)?;
    debug!(path = %path.display(), seconds, "probed duration");
    Ok(seconds)
}

fn parse_resolution(stdout: &str) -> Result<Resolution, BotError> {
    let line = stdout.trim();
    if line.is_empty() {
        return Err(BotError::Probe(
            "invalid video format or resolution could not be detected".to_string(),
        ));
    }
    line.parse::<Resolution>()
        .map_err(|_| BotError::Probe(format!("unexpected ffprobe output: {}", line)))
}

fn parse_duration(stdout: &str) -> Result<f64, BotError> {
    let seconds = stdout
        .trim()
        .parse::<f64>()
        .map_err(|_| BotError::DurationUnknown)?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(BotError::DurationUnknown);
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_resolution_line() {
        let res = parse_resolution("1920x1080\n").unwrap();
        assert_eq!(res.width, 1920);
        assert_eq!(res.height, 1080);
    }

    #[test]
    fn empty_probe_output_is_an_error() {
        assert!(matches!(parse_resolution(""), Err(BotError::Probe(_))));
        assert!(matches!(parse_resolution("  \n"), Err(BotError::Probe(_))));
    }

    #[test]
    fn malformed_resolution_is_an_error() {
        assert!(matches!(parse_resolution("widexhigh"), Err(BotError::Probe(_))));
    }

    #[test]
    fn parses_positive_duration() {
        assert!((parse_duration("12.512000\n").unwrap() - 12.512).abs() < 1e-9);
    }

    #[test]
    fn rejects_non_positive_or_unparseable_duration() {
        assert!(matches!(parse_duration("0.000000"), Err(BotError::DurationUnknown)));
        assert!(matches!(parse_duration("-3.5"), Err(BotError::DurationUnknown)));
        assert!(matches!(parse_duration("N/A"), Err(BotError::DurationUnknown)));
        assert!(matches!(parse_duration(""), Err(BotError::DurationUnknown)));
        assert!(matches!(parse_duration("inf"), Err(BotError::DurationUnknown)));
    }
}
