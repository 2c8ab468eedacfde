//! Video stage: render scene clips, join them, and mux the narration.
//!
//! Every scene becomes a fixed-duration clip of its still image animated
//! by the scene's effect (`zoompan` with linear keyframes across the clip).
//! Clips are joined in index order through an `xfade` chain when
//! cross-fades are enabled, or the concat demuxer otherwise, and the
//! combined narration is muxed from t=0, padded with silence and truncated
//! to the exact video duration.

use std::path::{Path, PathBuf};

use crate::ffmpeg::{concat_list, run_ffmpeg};
use crate::pipeline::{CancelToken, PipelineError};
use crate::project::Project;
use crate::scene::{EffectKind, Resolution};

/// Default cross-fade between adjacent scenes, in seconds.
pub const DEFAULT_CROSS_FADE: f64 = 0.5;

/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 30;

/// Encoding knobs for the video stage.
#[derive(Debug, Clone, Copy)]
pub struct VideoOptions {
    pub fps: u32,
    pub resolution: Resolution,
    /// Cross-fade duration between adjacent clips; 0 disables fades.
    pub cross_fade: f64,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            resolution: Resolution::default(),
            cross_fade: DEFAULT_CROSS_FADE,
        }
    }
}

/// Clamp the requested fade so every transition fits inside both of its
/// neighboring clips.
pub fn effective_fade(durations: &[f64], fade: f64) -> f64 {
    if fade <= 0.0 || durations.len() < 2 {
        return 0.0;
    }
    let shortest = durations.iter().copied().fold(f64::INFINITY, f64::min);
    fade.min(shortest / 2.0).max(0.0)
}

/// Start offset of each cross-fade on the output timeline.
///
/// Transition `t` (between clips `t` and `t+1`) starts at
/// `sum(durations[..=t]) - (t+1) * fade`.
pub fn xfade_offsets(durations: &[f64], fade: f64) -> Vec<f64> {
    let mut offsets = Vec::new();
    let mut elapsed = 0.0;
    for (t, duration) in durations.iter().enumerate().take(durations.len().saturating_sub(1)) {
        elapsed += duration;
        offsets.push(elapsed - (t as f64 + 1.0) * fade);
    }
    offsets
}

/// Total output duration: the clip sum minus the overlap consumed by the
/// cross-fades.
pub fn total_duration(durations: &[f64], fade: f64) -> f64 {
    let sum: f64 = durations.iter().sum();
    let overlaps = durations.len().saturating_sub(1) as f64;
    (sum - overlaps * fade).max(0.0)
}

/// Build the `xfade` filter graph joining `n` video inputs.
///
/// Returns the graph and the label of its final output stream.
pub fn xfade_filter(n: usize, fade: f64, offsets: &[f64]) -> (String, String) {
    let mut graph = String::new();
    let mut current = "[0:v]".to_string();
    for t in 0..n.saturating_sub(1) {
        let out = format!("[v{}]", t + 1);
        graph.push_str(&format!(
            "{}[{}:v]xfade=transition=fade:duration={:.3}:offset={:.3}{}",
            current,
            t + 1,
            fade,
            offsets[t],
            out
        ));
        if t + 2 < n {
            graph.push(';');
        }
        current = out;
    }
    (graph, current)
}

/// Build the ffmpeg arguments rendering one scene clip from its still.
pub fn segment_args(
    image: &Path,
    duration: f64,
    effect: EffectKind,
    options: &VideoOptions,
    output: &Path,
) -> Vec<String> {
    let (width, height) = options.resolution.dimensions();
    let frames = ((duration * options.fps as f64).round() as u32).max(1);

    let filter = match effect.to_filter(frames, width, height, options.fps) {
        Some(zoompan) => {
            // Upscale before zoompan so sub-pixel pans stay smooth.
            let (sw, sh) = (width * 2, height * 2);
            format!(
                "scale={sw}:{sh}:force_original_aspect_ratio=increase,crop={sw}:{sh},{zoompan},format=yuv420p",
            )
        }
        None => format!(
            "scale={width}:{height}:force_original_aspect_ratio=decrease,\
             pad={width}:{height}:(ow-iw)/2:(oh-ih)/2,format=yuv420p",
        ),
    };

    // The still is looped so the clip reaches its full duration even when
    // no zoompan filter is generating frames.
    vec![
        "-y".to_string(),
        "-loop".to_string(),
        "1".to_string(),
        "-framerate".to_string(),
        options.fps.to_string(),
        "-i".to_string(),
        image.to_string_lossy().into_owned(),
        "-vf".to_string(),
        filter,
        "-t".to_string(),
        format!("{:.3}", duration),
        "-r".to_string(),
        options.fps.to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        output.to_string_lossy().into_owned(),
    ]
}

/// Build the ffmpeg arguments joining segments through an xfade chain.
pub fn xfade_args(segments: &[PathBuf], fade: f64, offsets: &[f64], output: &Path) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    for segment in segments {
        args.push("-i".to_string());
        args.push(segment.to_string_lossy().into_owned());
    }
    let (graph, label) = xfade_filter(segments.len(), fade, offsets);
    args.push("-filter_complex".to_string());
    args.push(graph);
    args.push("-map".to_string());
    args.push(label);
    args.push("-c:v".to_string());
    args.push("libx264".to_string());
    args.push("-pix_fmt".to_string());
    args.push("yuv420p".to_string());
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Build the ffmpeg arguments muxing the narration under the video.
///
/// The audio is padded with silence and the output truncated, so the
/// result always runs exactly `total` seconds no matter how long the
/// narration track is.
pub fn mux_args(video: &Path, audio: &Path, total: f64, output: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        video.to_string_lossy().into_owned(),
        "-i".to_string(),
        audio.to_string_lossy().into_owned(),
        "-map".to_string(),
        "0:v".to_string(),
        "-map".to_string(),
        "1:a".to_string(),
        "-c:v".to_string(),
        "copy".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-af".to_string(),
        "apad".to_string(),
        "-t".to_string(),
        format!("{:.3}", total),
        output.to_string_lossy().into_owned(),
    ]
}

/// Render the final video for a project.
pub async fn render_video(
    project: &mut Project,
    options: &VideoOptions,
    cancel: &CancelToken,
) -> Result<(), PipelineError> {
    if project.scenes.is_empty() {
        return Err(PipelineError::NoScenes);
    }

    let video_dir = project.video_dir();
    std::fs::create_dir_all(&video_dir)?;

    let durations: Vec<f64> = project.scenes.iter().map(|s| s.duration_seconds).collect();
    let fade = effective_fade(&durations, options.cross_fade);

    // Render one clip per scene, in index order.
    let mut segments = Vec::with_capacity(project.scenes.len());
    for scene in &project.scenes {
        cancel.check()?;
        let image = scene
            .image_path
            .clone()
            .ok_or_else(|| PipelineError::Stage(format!("scene {} has no image", scene.index)))?;
        let segment = video_dir.join(format!("segment_{}.mp4", scene.index));
        run_ffmpeg(&segment_args(
            &image,
            scene.duration_seconds,
            scene.effect_kind,
            options,
            &segment,
        ))
        .await?;
        segments.push(segment);
    }

    cancel.check()?;

    // Join the clips.
    let joined = video_dir.join("joined.mp4");
    if segments.len() == 1 {
        std::fs::copy(&segments[0], &joined)?;
    } else if fade > 0.0 {
        let offsets = xfade_offsets(&durations, fade);
        run_ffmpeg(&xfade_args(&segments, fade, &offsets, &joined)).await?;
    } else {
        let list_path = video_dir.join("concat.txt");
        std::fs::write(&list_path, concat_list(&segments))?;
        let args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            list_path.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            joined.to_string_lossy().into_owned(),
        ];
        let result = run_ffmpeg(&args).await;
        let _ = std::fs::remove_file(&list_path);
        result?;
    }

    cancel.check()?;

    // Mux the narration, or promote the joined video as-is.
    let total = total_duration(&durations, fade);
    let final_path = project.final_video_path();
    match &project.combined_audio_path {
        Some(audio) if audio.exists() => {
            run_ffmpeg(&mux_args(&joined, audio, total, &final_path)).await?;
            let _ = std::fs::remove_file(&joined);
        }
        _ => {
            std::fs::rename(&joined, &final_path)?;
        }
    }

    for segment in &segments {
        let _ = std::fs::remove_file(segment);
    }

    log::info!("video written to {}", final_path.display());
    project.video_path = Some(final_path);
    Ok(())
}
