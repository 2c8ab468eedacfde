//! Image stage: one still per scene, in scene order.
//!
//! Each scene's `image_prompt` goes through the image provider chain; the
//! decoded result is re-encoded as PNG so the on-disk format is uniform no
//! matter which provider produced it. When the whole chain fails for a
//! scene the stage writes a synthesized placeholder and records a warning,
//! so one bad scene never aborts the run.

use image::{Rgb, RgbImage};

use crate::pipeline::{CancelToken, PipelineError};
use crate::project::Project;
use crate::provider::{try_chain, ImageProvider, ImageRequest, ProviderError};
use crate::scene::Resolution;

/// Muted tones cycled by scene index for placeholder stills.
const PLACEHOLDER_TONES: &[[u8; 3]] = &[
    [52, 58, 64],
    [73, 80, 87],
    [33, 37, 41],
    [95, 61, 84],
    [44, 62, 80],
    [60, 72, 88],
];

/// Generate one image per scene and attach the paths to the project.
///
/// Per-scene provider calls run on a bounded concurrent pool; results are
/// written back in scene index order regardless of completion order.
pub async fn generate_images(
    project: &mut Project,
    resolution: Resolution,
    providers: &[ImageProvider],
    concurrency: usize,
    cancel: &CancelToken,
) -> Result<(), PipelineError> {
    use futures_util::StreamExt;

    std::fs::create_dir_all(project.images_dir())?;

    let requests: Vec<ImageRequest> = project
        .scenes
        .iter()
        .map(|scene| ImageRequest {
            prompt: scene.image_prompt.clone(),
            resolution,
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
        let path = project.scene_image_path(index);
        match result.unwrap_or(Err(ProviderError::NoProviders)) {
            Ok(bytes) => match image::load_from_memory(&bytes) {
                Ok(decoded) => {
                    decoded
                        .save(&path)
                        .map_err(|e| PipelineError::Stage(format!("write {}: {}", path.display(), e)))?;
                    log::info!("scene {}: image written to {}", index, path.display());
                }
                Err(e) => {
                    project.warn(format!(
                        "scene {}: provider returned undecodable image ({}), using placeholder",
                        index, e
                    ));
                    write_placeholder(&path, resolution, index)?;
                }
            },
            Err(e) => {
                project.warn(format!(
                    "scene {}: image generation failed ({}), using placeholder",
                    index, e
                ));
                write_placeholder(&path, resolution, index)?;
            }
        }
        project.scenes[index].image_path = Some(path);
    }

    Ok(())
}

/// Write a solid-tone placeholder still for a scene.
pub fn write_placeholder(
    path: &std::path::Path,
    resolution: Resolution,
    index: usize,
) -> Result<(), PipelineError> {
    let (width, height) = resolution.dimensions();
    let tone = PLACEHOLDER_TONES[index % PLACEHOLDER_TONES.len()];
    let img = RgbImage::from_pixel(width, height, Rgb(tone));
    img.save(path)
        .map_err(|e| PipelineError::Stage(format!("write placeholder {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{EffectKind, Scene, Style};

    fn project_with_scenes(dir: &std::path::Path, count: usize) -> Project {
        let mut project = Project::new(
            "a quiet village".to_string(),
            Style::Cinematic,
            dir.to_path_buf(),
        );
        project.scenes = (0..count)
            .map(|i| {
                Scene::new(
                    i,
                    format!("Scene {}", i + 1),
                    format!("Narration {}", i + 1),
                    format!("prompt {}", i + 1),
                    3.0,
                    EffectKind::KenBurns,
                )
            })
            .collect();
        project
    }

    #[tokio::test]
    async fn test_empty_chain_yields_placeholders_for_all_scenes() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), 3);

        generate_images(&mut project, Resolution::Square, &[], 2, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(project.scenes.len(), 3);
        for (i, scene) in project.scenes.iter().enumerate() {
            let path = scene.image_path.as_ref().unwrap();
            assert!(path.ends_with(format!("scene_{}.png", i)), "{:?}", path);
            assert!(path.exists());
        }
        assert_eq!(project.warnings.len(), 3);
    }

    #[tokio::test]
    async fn test_placeholder_images_decode_at_target_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), 1);

        generate_images(&mut project, Resolution::Square, &[], 1, &CancelToken::new())
            .await
            .unwrap();

        let decoded = image::open(project.scenes[0].image_path.as_ref().unwrap()).unwrap();
        assert_eq!(decoded.width(), 1024);
        assert_eq!(decoded.height(), 1024);
    }

    #[tokio::test]
    async fn test_cancelled_stage_stops_before_writing() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = project_with_scenes(dir.path(), 2);

        let cancel = CancelToken::new();
        cancel.cancel();
        let result =
            generate_images(&mut project, Resolution::Square, &[], 1, &cancel).await;

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert!(project.scenes[0].image_path.is_none());
    }

    #[test]
    fn test_placeholder_tone_cycles_by_index() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        write_placeholder(&a, Resolution::Square, 0).unwrap();
        write_placeholder(&b, Resolution::Square, 1).unwrap();

        let pa = image::open(&a).unwrap().to_rgb8().get_pixel(0, 0).0;
        let pb = image::open(&b).unwrap().to_rgb8().get_pixel(0, 0).0;
        assert_ne!(pa, pb);
        assert_eq!(pa, PLACEHOLDER_TONES[0]);
    }
}
