//! FFmpeg process management for storyreel.
//!
//! Audio and video assembly is delegated to a locally installed `ffmpeg`
//! binary (and `ffprobe` for duration probing). Every invocation here runs
//! to completion; long-lived streaming pipelines are not needed for
//! slideshow rendering.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

/// How many trailing stderr lines to keep in a process failure.
const STDERR_TAIL_LINES: usize = 15;

/// Errors that can occur while driving ffmpeg/ffprobe.
#[derive(Debug, thiserror::Error)]
pub enum FfmpegError {
    #[error("ffmpeg not found. Install it and make sure it is on PATH")]
    NotFound,

    #[error("{program} exited with code {exit_code:?}\n{stderr}")]
    ProcessFailed {
        program: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("could not parse {program} output: {message}")]
    Parse {
        program: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Check whether ffmpeg can be spawned at all.
pub fn ffmpeg_available() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run ffmpeg with the given arguments and wait for it to finish.
///
/// Stderr is captured; on a non-zero exit the trailing lines are attached
/// to the error so encode failures are diagnosable from the log alone.
pub async fn run_ffmpeg(args: &[String]) -> Result<(), FfmpegError> {
    run_tool("ffmpeg", args).await.map(|_| ())
}

/// Probe the duration of a media file in seconds using ffprobe.
pub async fn probe_duration(path: &Path) -> Result<f64, FfmpegError> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path.to_string_lossy().into_owned(),
    ];

    let stdout = run_tool("ffprobe", &args).await?;
    stdout
        .trim()
        .parse::<f64>()
        .map_err(|e| FfmpegError::Parse {
            program: "ffprobe",
            message: format!("duration '{}': {}", stdout.trim(), e),
        })
}

/// Build a concat-demuxer list file body for the given inputs.
///
/// Single quotes inside paths use the demuxer's `'\''` escape.
pub fn concat_list(paths: &[std::path::PathBuf]) -> String {
    let mut body = String::new();
    for path in paths {
        let escaped = path.to_string_lossy().replace('\'', "'\\''");
        body.push_str(&format!("file '{}'\n", escaped));
    }
    body
}

/// Spawn a tool, wait for exit, and return its stdout.
async fn run_tool(program: &'static str, args: &[String]) -> Result<String, FfmpegError> {
    log::debug!("{} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FfmpegError::NotFound
            } else {
                FfmpegError::Io(e)
            }
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !output.status.success() {
        let tail: Vec<&str> = stderr
            .lines()
            .rev()
            .take(STDERR_TAIL_LINES)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return Err(FfmpegError::ProcessFailed {
            program,
            exit_code: output.status.code(),
            stderr: tail.join("\n"),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_ffmpeg_version() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let result = run_ffmpeg(&["-version".to_string()]).await;
        assert!(result.is_ok(), "ffmpeg -version should succeed");
    }

    #[tokio::test]
    async fn test_run_ffmpeg_invalid_args_fails() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let result = run_ffmpeg(&["-invalid_nonexistent_flag_xyz".to_string()]).await;
        assert!(matches!(
            result,
            Err(FfmpegError::ProcessFailed { program: "ffmpeg", .. })
        ));
    }

    #[tokio::test]
    async fn test_probe_missing_file_fails() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let result = probe_duration(Path::new("/nonexistent/clip.mp3")).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_concat_list_format() {
        let paths = vec![
            std::path::PathBuf::from("/tmp/a.mp3"),
            std::path::PathBuf::from("/tmp/it's.mp3"),
        ];
        let body = concat_list(&paths);
        assert_eq!(body, "file '/tmp/a.mp3'\nfile '/tmp/it'\\''s.mp3'\n");
    }

    #[test]
    fn test_process_failed_error_display() {
        let err = FfmpegError::ProcessFailed {
            program: "ffmpeg",
            exit_code: Some(1),
            stderr: "boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("1"));
        assert!(msg.contains("boom"));
    }
}
