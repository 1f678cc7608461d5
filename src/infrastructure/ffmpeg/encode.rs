use crate::errors::BotError;
use crate::infrastructure::ffmpeg::probe;
use crate::infrastructure::ffmpeg::progress::{self, ProgressEvent, ProgressTracker};
use crate::modules::chat::model::TranscodeSpec;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Run ffmpeg over `input` according to `spec`, writing to `output`.
///
/// Progress events (distinct percentages only) are pushed to `progress_tx`
/// while the encoder runs; the channel closes when the job ends. The duration
/// is probed up front because no percentage can be computed without it.
pub async fn run(
    input: &Path,
    output: &Path,
    spec: &TranscodeSpec,
    progress_tx: mpsc::UnboundedSender<ProgressEvent>,
) -> Result<(), BotError> {
    let total_seconds = probe::duration(input).await?;

    let args = build_args(input, output, spec);
    info!(
        input = %input.display(),
        output = %output.display(),
        total_seconds,
        "starting ffmpeg"
    );

    let mut child = Command::new("ffmpeg")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(BotError::Spawn)?;

    // ffmpeg writes its diagnostic stream, progress markers included, to
    // stderr. Reading it to EOF also keeps the pipe drained so the encoder
    // never blocks on a full buffer.
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| BotError::Spawn(std::io::Error::other("ffmpeg stderr was not captured")))?;
    let mut lines = BufReader::new(stderr).lines();

    let mut tracker = ProgressTracker::new(total_seconds);
    while let Some(line) = lines.next_line().await.map_err(BotError::Io)? {
        if let Some(elapsed) = progress::parse_time_marker(&line) {
            if let Some(event) = tracker.observe(elapsed) {
                // Receiver may have hung up; the encode still runs to completion.
                let _ = progress_tx.send(event);
            }
        }
    }

    let status = child.wait().await.map_err(BotError::Io)?;
    if status.success() {
        debug!(last_percent = ?tracker.last_percent(), "ffmpeg finished");
        Ok(())
    } else {
        Err(BotError::EncodeFailed(status.code()))
    }
}

/// Argument list for the chosen treatment. `-y` because the output path is
/// job-unique and freshly allocated.
pub fn build_args(input: &Path, output: &Path, spec: &TranscodeSpec) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.as_os_str().to_owned()];
    match spec {
        TranscodeSpec::Enhance => {
            args.extend::<[OsString; 8]>([
                "-vf".into(),
                "hqdn3d,unsharp".into(),
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                "medium".into(),
                "-crf".into(),
                "18".into(),
            ]);
        }
        TranscodeSpec::Resize {
            width,
            height,
            bitrate,
        } => {
            args.extend::<[OsString; 10]>([
                "-vf".into(),
                format!("scale={}:{}", width, height).into(),
                "-c:v".into(),
                "libx264".into(),
                "-preset".into(),
                "ultrafast".into(),
                "-b:v".into(),
                bitrate.as_str().into(),
                "-maxrate".into(),
                bitrate.as_str().into(),
            ]);
        }
    }
    args.push(output.as_os_str().to_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn enhance_args_use_denoise_sharpen_filter_graph() {
        let args = strings(&build_args(
            &PathBuf::from("/tmp/in.mp4"),
            &PathBuf::from("/tmp/out.mp4"),
            &TranscodeSpec::Enhance,
        ));
        assert_eq!(
            args,
            vec![
                "-y",
                "-i",
                "/tmp/in.mp4",
                "-vf",
                "hqdn3d,unsharp",
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "18",
                "/tmp/out.mp4",
            ]
        );
    }

    #[test]
    fn resize_args_scale_to_exact_target_and_cap_bitrate() {
        let spec = TranscodeSpec::Resize {
            width: 1280,
            height: 720,
            bitrate: "1M".to_string(),
        };
        let args = strings(&build_args(
            &PathBuf::from("in.mp4"),
            &PathBuf::from("out.mp4"),
            &spec,
        ));
        assert!(args.contains(&"scale=1280:720".to_string()));
        assert!(args.contains(&"ultrafast".to_string()));
        let b_v = args.iter().position(|a| a == "-b:v").unwrap();
        assert_eq!(args[b_v + 1], "1M");
        let maxrate = args.iter().position(|a| a == "-maxrate").unwrap();
        assert_eq!(args[maxrate + 1], "1M");
        assert_eq!(args.last().unwrap(), "out.mp4");
    }
}
