//! Pipeline coordinator for storyreel.
//!
//! Sequences the four stages (script → images → audio → video), persists
//! the project at every state transition, and recovers per-scene failures
//! without aborting the run. Cancellation is cooperative: a shared flag is
//! checked between stages and between scenes, so a Ctrl+C never corrupts
//! artifacts that are already on disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::ffmpeg::FfmpegError;
use crate::images;
use crate::project::{Project, ProjectError, StageState};
use crate::provider::{
    ElevenLabs, GeminiText, ImageProvider, OpenAiImage, OpenAiSpeech, OpenAiText, Pollinations,
    SpeechProvider, TextProvider,
};
use crate::scene::{EffectKind, Resolution, Style, VoiceId, MAX_SCENES, MIN_SCENES};
use crate::script;
use crate::video::{self, VideoOptions, DEFAULT_CROSS_FADE, DEFAULT_FPS};
use crate::voice;

/// Default number of scenes per run.
pub const DEFAULT_NUM_SCENES: usize = 3;

/// Default per-scene concurrency for the image and voice stages.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Errors that abort a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("invalid scene count {0}: expected 1-10")]
    InvalidSceneCount(usize),

    #[error("script produced no scenes")]
    NoScenes,

    #[error("stage failed: {0}")]
    Stage(String),

    #[error(transparent)]
    Ffmpeg(#[from] FfmpegError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("run cancelled")]
    Cancelled,
}

/// Cooperative cancellation flag shared between the CLI and the pipeline.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Error out if cancellation was requested.
    pub fn check(&self) -> Result<(), PipelineError> {
        if self.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Trip this token on Ctrl+C. Call once at program startup.
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let flag = self.clone();
        ctrlc::set_handler(move || {
            eprintln!("\nReceived Ctrl+C, finishing current scene and stopping...");
            flag.cancel();
        })
    }
}

/// Knobs for one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub num_scenes: usize,
    pub style: Style,
    pub resolution: Resolution,
    pub fps: u32,
    pub voice: VoiceId,
    /// Force one effect onto every scene instead of the script's choice.
    pub effect: Option<EffectKind>,
    /// Cross-fade between adjacent scenes; 0 disables fades.
    pub cross_fade: f64,
    /// Bounded per-scene concurrency for the image and voice stages.
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            num_scenes: DEFAULT_NUM_SCENES,
            style: Style::default(),
            resolution: Resolution::default(),
            fps: DEFAULT_FPS,
            voice: VoiceId::default(),
            effect: None,
            cross_fade: DEFAULT_CROSS_FADE,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// First stage to execute when entering the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartStage {
    Script,
    Images,
    Audio,
    Video,
}

/// Build the text provider chain from the configured credentials.
///
/// Order is fixed: OpenAI first, Gemini second. Providers without a key
/// are left out entirely.
pub fn text_chain(config: &ProviderConfig) -> Vec<TextProvider> {
    let mut chain = Vec::new();
    if let Some(key) = &config.openai.api_key {
        if let Ok(client) = OpenAiText::new(key.clone(), config.openai.model.clone()) {
            chain.push(TextProvider::OpenAi(client));
        }
    }
    if let Some(key) = &config.gemini.api_key {
        if let Ok(client) = GeminiText::new(key.clone(), config.gemini.model.clone()) {
            chain.push(TextProvider::Gemini(client));
        }
    }
    chain
}

/// Build the image provider chain: OpenAI when configured, with keyless
/// Pollinations as the tail unless disabled.
pub fn image_chain(config: &ProviderConfig) -> Vec<ImageProvider> {
    let mut chain = Vec::new();
    if let Some(key) = &config.openai.api_key {
        if let Ok(client) = OpenAiImage::new(key.clone(), config.openai.image_model.clone()) {
            chain.push(ImageProvider::OpenAi(client));
        }
    }
    if config.pollinations.enabled {
        if let Ok(client) = Pollinations::new(config.pollinations.model.clone()) {
            chain.push(ImageProvider::Pollinations(client));
        }
    }
    chain
}

/// Build the speech provider chain: OpenAI first, ElevenLabs second.
pub fn speech_chain(config: &ProviderConfig) -> Vec<SpeechProvider> {
    let mut chain = Vec::new();
    if let Some(key) = &config.openai.api_key {
        if let Ok(client) = OpenAiSpeech::new(key.clone(), config.openai.tts_model.clone()) {
            chain.push(SpeechProvider::OpenAi(client));
        }
    }
    if let Some(key) = &config.elevenlabs.api_key {
        if let Ok(client) = ElevenLabs::new(key.clone(), config.elevenlabs.voice_id.clone()) {
            chain.push(SpeechProvider::ElevenLabs(client));
        }
    }
    chain
}

/// Run the full pipeline for a prompt, rooted at `project_root`.
///
/// The project is persisted at every stage boundary; on a fatal error the
/// state moves to `Failed` with all prior artifacts intact. A cancelled
/// run keeps its last persisted state instead of `Failed`.
pub async fn run_pipeline(
    prompt: &str,
    options: &PipelineOptions,
    config: &ProviderConfig,
    project_root: PathBuf,
    cancel: &CancelToken,
) -> Result<Project, PipelineError> {
    if prompt.trim().is_empty() {
        return Err(PipelineError::EmptyPrompt);
    }
    if !(MIN_SCENES..=MAX_SCENES).contains(&options.num_scenes) {
        return Err(PipelineError::InvalidSceneCount(options.num_scenes));
    }

    let mut project = Project::new(prompt.trim().to_string(), options.style, project_root);
    project.save()?;

    match run_from(&mut project, StartStage::Script, options, config, cancel).await {
        Ok(()) => Ok(project),
        Err(e) => Err(fail_project(&mut project, e)),
    }
}

/// Re-run a persisted project from a chosen stage (or the next one its
/// state implies). Resuming from [`StartStage::Video`] touches no provider.
pub async fn resume(
    project_root: &Path,
    from: Option<StartStage>,
    options: &PipelineOptions,
    config: &ProviderConfig,
    cancel: &CancelToken,
) -> Result<Project, PipelineError> {
    let mut project = Project::load(project_root)?;

    let start = match from {
        Some(stage) => stage,
        None => match next_stage(&project) {
            Some(stage) => stage,
            None => {
                log::info!("project is already done, nothing to resume");
                return Ok(project);
            }
        },
    };
    log::info!("resuming project from {:?}", start);

    match run_from(&mut project, start, options, config, cancel).await {
        Ok(()) => Ok(project),
        Err(e) => Err(fail_project(&mut project, e)),
    }
}

/// Mark the project failed (unless the run was cancelled) and hand the
/// error back.
fn fail_project(project: &mut Project, error: PipelineError) -> PipelineError {
    if matches!(error, PipelineError::Cancelled) {
        // Cancelled runs keep their last persisted state.
        let _ = project.save();
    } else {
        let _ = project.transition(StageState::Failed);
    }
    error
}

/// Decide where a loaded project should pick up.
fn next_stage(project: &Project) -> Option<StartStage> {
    match project.state {
        StageState::Idle => Some(StartStage::Script),
        StageState::ScriptReady => Some(StartStage::Images),
        StageState::ImagesReady => Some(StartStage::Audio),
        StageState::AudioReady | StageState::VideoReady => Some(StartStage::Video),
        StageState::Done => None,
        // A failed run restarts at the first stage whose artifacts are
        // missing.
        StageState::Failed => {
            if project.scenes.is_empty() {
                Some(StartStage::Script)
            } else if project.scenes.iter().any(|s| s.image_path.is_none()) {
                Some(StartStage::Images)
            } else if project.combined_audio_path.is_none() {
                Some(StartStage::Audio)
            } else {
                Some(StartStage::Video)
            }
        }
    }
}

/// Execute the pipeline tail beginning at `start`.
async fn run_from(
    project: &mut Project,
    start: StartStage,
    options: &PipelineOptions,
    config: &ProviderConfig,
    cancel: &CancelToken,
) -> Result<(), PipelineError> {
    if start <= StartStage::Script {
        cancel.check()?;
        let mut scenes = script::generate_scenes(
            &project.prompt,
            options.num_scenes,
            project.style,
            &text_chain(config),
        )
        .await;
        if let Some(effect) = options.effect {
            for scene in &mut scenes {
                scene.effect_kind = effect;
            }
        }
        if scenes.is_empty() {
            return Err(PipelineError::NoScenes);
        }
        project.scenes = scenes;
        project.transition(StageState::ScriptReady)?;
    }

    if project.scenes.is_empty() {
        return Err(PipelineError::NoScenes);
    }

    if start <= StartStage::Images {
        cancel.check()?;
        images::generate_images(
            project,
            options.resolution,
            &image_chain(config),
            options.concurrency,
            cancel,
        )
        .await?;
        project.transition(StageState::ImagesReady)?;
    }

    if start <= StartStage::Audio {
        cancel.check()?;
        voice::generate_voice(
            project,
            options.voice,
            &speech_chain(config),
            options.concurrency,
            cancel,
        )
        .await?;
        project.transition(StageState::AudioReady)?;
    }

    cancel.check()?;
    let video_options = VideoOptions {
        fps: options.fps,
        resolution: options.resolution,
        cross_fade: options.cross_fade,
    };
    video::render_video(project, &video_options, cancel).await?;
    project.transition(StageState::VideoReady)?;
    project.transition(StageState::Done)?;

    Ok(())
}
