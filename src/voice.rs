//! Voice stage: per-scene narration clips and the combined track.
//!
//! Narration is synthesized through the speech provider chain; a scene
//! whose chain fails gets rendered silence of its target duration instead,
//! so the slideshow timing survives missing audio. Every clip's real
//! duration is probed back into its scene (the voice-over drives how long
//! each image stays on screen), then the clips are joined in index order
//! with hard cuts into `audio/combined.mp3`.

use std::path::Path;

use crate::ffmpeg::{concat_list, probe_duration, run_ffmpeg};
use crate::pipeline::{CancelToken, PipelineError};
use crate::project::Project;
use crate::provider::{try_chain, ProviderError, SpeechProvider, SpeechRequest};
use crate::scene::VoiceId;

/// Sample rate for rendered silence.
const SILENCE_SAMPLE_RATE: u32 = 44_100;

/// Generate narration for every scene and the combined track.
pub async fn generate_voice(
    project: &mut Project,
    voice: VoiceId,
    providers: &[SpeechProvider],
    concurrency: usize,
    cancel: &CancelToken,
) -> Result<(), PipelineError> {
    use futures_util::StreamExt;

    std::fs::create_dir_all(project.audio_dir())?;

    let requests: Vec<SpeechRequest> = project
        .scenes
        .iter()
        .map(|scene| SpeechRequest {
            text: scene.narration_text.clone(),
            voice,
        })
        .collect();

    let results: Vec<Option<Result<Vec<u8>, ProviderError>>> =
        futures_util::stream::iter(requests.iter().map(|request| async move {
            if cancel.is_cancelled() {
                return None;
            }
            Some(try_chain(providers, request).await)
        }))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    cancel.check()?;

    for (index, result) in results.into_iter().enumerate() {
        let path = project.scene_audio_path(index);
        match result.unwrap_or(Err(ProviderError::NoProviders)) {
            Ok(bytes) => {
                std::fs::write(&path, bytes)?;
                log::info!("scene {}: narration written to {}", index, path.display());
            }
            Err(e) => {
                project.warn(format!(
                    "scene {}: speech synthesis failed ({}), using silence",
                    index, e
                ));
                render_silence(&path, project.scenes[index].duration_seconds).await?;
            }
        }

        // The probed clip length overrides the requested scene duration so
        // images stay on screen exactly as long as their narration.
        let clip_duration = probe_duration(&path).await?;
        if clip_duration > 0.0 {
            project.scenes[index].duration_seconds = clip_duration;
        }
        project.scenes[index].audio_path = Some(path);
    }

    cancel.check()?;

    let combined = project.combined_audio_file();
    let clips: Vec<std::path::PathBuf> = (0..project.scenes.len())
        .map(|i| project.scene_audio_path(i))
        .collect();
    concat_clips(&clips, &combined, project.audio_dir().as_path()).await?;

    let durations: Vec<f64> = project.scenes.iter().map(|s| s.duration_seconds).collect();
    log::info!(
        "combined narration: {:.2}s over {} clips",
        combined_duration(&durations),
        clips.len()
    );
    project.combined_audio_path = Some(combined);

    Ok(())
}

/// Render silence of the given duration as an MP3 clip.
pub async fn render_silence(path: &Path, duration: f64) -> Result<(), PipelineError> {
    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "lavfi".to_string(),
        "-i".to_string(),
        format!("anullsrc=r={}:cl=mono", SILENCE_SAMPLE_RATE),
        "-t".to_string(),
        format!("{:.3}", duration.max(0.1)),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        "9".to_string(),
        path.to_string_lossy().into_owned(),
    ];
    run_ffmpeg(&args).await?;
    Ok(())
}

/// Join clips in order with hard cuts using the concat demuxer.
///
/// Re-encodes rather than stream-copying: the clips come from different
/// encoders (provider MP3s next to rendered silence) and may disagree on
/// sample rate or channel layout.
async fn concat_clips(
    clips: &[std::path::PathBuf],
    output: &Path,
    work_dir: &Path,
) -> Result<(), PipelineError> {
    let list_path = work_dir.join("concat.txt");
    std::fs::write(&list_path, concat_list(clips))?;

    let args = vec![
        "-y".to_string(),
        "-f".to_string(),
        "concat".to_string(),
        "-safe".to_string(),
        "0".to_string(),
        "-i".to_string(),
        list_path.to_string_lossy().into_owned(),
        "-ar".to_string(),
        SILENCE_SAMPLE_RATE.to_string(),
        "-c:a".to_string(),
        "libmp3lame".to_string(),
        "-q:a".to_string(),
        "4".to_string(),
        output.to_string_lossy().into_owned(),
    ];
    let result = run_ffmpeg(&args).await;
    let _ = std::fs::remove_file(&list_path);
    result?;
    Ok(())
}

/// Sum of per-clip durations; the combined track must match this exactly.
pub fn combined_duration(durations: &[f64]) -> f64 {
    durations.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffmpeg::ffmpeg_available;
    use crate::scene::{EffectKind, Scene, Style};

    fn project_with_scenes(dir: &Path, durations: &[f64]) -> Project {
        let mut project = Project::new(
            "a quiet village".to_string(),
            Style::Cinematic,
            dir.to_path_buf(),
        );
        project.scenes = durations
            .iter()
            .enumerate()
            .map(|(i, d)| {
                Scene::new(
                    i,
                    format!("Scene {}", i + 1),
                    format!("Narration {}", i + 1),
                    format!("prompt {}", i + 1),
                    *d,
                    EffectKind::KenBurns,
                )
            })
            .collect();
        project
    }

    #[test]
    fn test_combined_duration_is_the_sum() {
        assert_eq!(combined_duration(&[3.0, 4.5, 2.5]), 10.0);
        assert_eq!(combined_duration(&[]), 0.0);
    }

    #[tokio::test]
    async fn test_empty_chain_yields_silent_clips_per_scene() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), &[2.0, 3.0]);

        generate_voice(&mut project, VoiceId::Alloy, &[], 1, &CancelToken::new())
            .await
            .unwrap();

        for (i, scene) in project.scenes.iter().enumerate() {
            let path = scene.audio_path.as_ref().unwrap();
            assert!(path.ends_with(format!("scene_{}.mp3", i)));
            assert!(path.exists());
        }
        assert!(project.combined_audio_path.as_ref().unwrap().exists());
        assert_eq!(project.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_combined_track_duration_matches_clip_sum() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), &[1.0, 2.0]);

        generate_voice(&mut project, VoiceId::Alloy, &[], 1, &CancelToken::new())
            .await
            .unwrap();

        let clip_sum: f64 = project.scenes.iter().map(|s| s.duration_seconds).sum();
        let combined = probe_duration(project.combined_audio_path.as_ref().unwrap())
            .await
            .unwrap();
        // MP3 framing rounds each clip to whole frames; the concat of the
        // same clips stays within one frame (~26ms) per clip of the sum.
        assert!(
            (combined - clip_sum).abs() < 0.1,
            "combined {} vs sum {}",
            combined,
            clip_sum
        );
    }

    #[tokio::test]
    async fn test_probed_duration_overrides_requested() {
        if !ffmpeg_available() {
            eprintln!("ffmpeg not installed, skipping");
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), &[2.0]);

        generate_voice(&mut project, VoiceId::Alloy, &[], 1, &CancelToken::new())
            .await
            .unwrap();

        // Silence was rendered at the requested 2.0s; the probed value is
        // what the scene ends up with.
        let d = project.scenes[0].duration_seconds;
        assert!((d - 2.0).abs() < 0.1, "probed {}", d);
    }

    #[tokio::test]
    async fn test_cancelled_stage_stops_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), &[2.0]);

        let cancel = CancelToken::new();
        cancel.cancel();
        let result = generate_voice(&mut project, VoiceId::Alloy, &[], 1, &cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(project.combined_audio_path.is_none());
    }
}
