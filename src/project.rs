//! Project state: the persisted, resumable record of one generation run.
//!
//! A project owns a directory with a fixed layout:
//!
//! ```text
//! <root>/project.json          state, warnings, scene records
//! <root>/script.json           script artifact (ordered scenes)
//! <root>/images/scene_<i>.png
//! <root>/audio/scene_<i>.mp3
//! <root>/audio/combined.mp3
//! <root>/video/final.mp4
//! ```
//!
//! The coordinator persists the project at every stage boundary so any
//! later stage can be re-run against already-produced artifacts without
//! repeating earlier (possibly paid) provider calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::scene::{Scene, Style};

/// Project metadata file name.
pub const PROJECT_FILE: &str = "project.json";

/// Script artifact file name.
pub const SCRIPT_FILE: &str = "script.json";

/// Images directory name.
pub const IMAGES_DIR: &str = "images";

/// Audio directory name.
pub const AUDIO_DIR: &str = "audio";

/// Video directory name.
pub const VIDEO_DIR: &str = "video";

/// Combined narration track file name.
pub const COMBINED_AUDIO_FILE: &str = "combined.mp3";

/// Final video file name.
pub const FINAL_VIDEO_FILE: &str = "final.mp4";

/// Pipeline progress, persisted with the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    #[default]
    Idle,
    ScriptReady,
    ImagesReady,
    AudioReady,
    VideoReady,
    Done,
    Failed,
}

impl StageState {
    /// Whether the pipeline can make further progress from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, StageState::Done | StageState::Failed)
    }

    /// Ordering rank used to decide which stages still need to run.
    pub fn rank(self) -> u8 {
        match self {
            StageState::Idle => 0,
            StageState::ScriptReady => 1,
            StageState::ImagesReady => 2,
            StageState::AudioReady => 3,
            StageState::VideoReady => 4,
            StageState::Done => 5,
            StageState::Failed => 6,
        }
    }
}

/// The persisted, resumable state of one end-to-end generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// The original user prompt.
    pub prompt: String,
    /// Narrative style for the run.
    pub style: Style,
    /// Ordered scene records; indices are contiguous from 0.
    pub scenes: Vec<Scene>,
    /// Pipeline progress.
    pub state: StageState,
    /// Per-scene recoveries (placeholder image, silent audio) and other
    /// non-fatal events.
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Script artifact, once written.
    #[serde(default)]
    pub script_path: Option<PathBuf>,
    /// Combined narration track, once written.
    #[serde(default)]
    pub combined_audio_path: Option<PathBuf>,
    /// Final video, once written.
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    /// When the run was created.
    pub created_at: DateTime<Utc>,
    /// Project directory; derived from where the project was loaded from,
    /// never persisted inside the file itself.
    #[serde(skip)]
    root: PathBuf,
}

/// Script artifact written alongside the project metadata.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScriptArtifact {
    pub generated_at: DateTime<Utc>,
    pub total_scenes: usize,
    pub scenes: Vec<Scene>,
}

impl Project {
    /// Create a fresh project rooted at `root`.
    pub fn new(prompt: String, style: Style, root: PathBuf) -> Self {
        Self {
            prompt,
            style,
            scenes: Vec::new(),
            state: StageState::Idle,
            warnings: Vec::new(),
            script_path: None,
            combined_audio_path: None,
            video_path: None,
            created_at: Utc::now(),
            root,
        }
    }

    /// Project directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR)
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.root.join(AUDIO_DIR)
    }

    pub fn video_dir(&self) -> PathBuf {
        self.root.join(VIDEO_DIR)
    }

    /// Image path for a scene index; named by index so ordering survives
    /// any directory listing.
    pub fn scene_image_path(&self, index: usize) -> PathBuf {
        self.images_dir().join(format!("scene_{}.png", index))
    }

    /// Audio clip path for a scene index.
    pub fn scene_audio_path(&self, index: usize) -> PathBuf {
        self.audio_dir().join(format!("scene_{}.mp3", index))
    }

    /// Where the combined narration track lives for this project.
    pub fn combined_audio_file(&self) -> PathBuf {
        self.audio_dir().join(COMBINED_AUDIO_FILE)
    }

    pub fn final_video_path(&self) -> PathBuf {
        self.video_dir().join(FINAL_VIDEO_FILE)
    }

    /// Record a non-fatal recovery.
    pub fn warn(&mut self, message: String) {
        log::warn!("{}", message);
        self.warnings.push(message);
    }

    /// Move to a new state and persist the project.
    pub fn transition(&mut self, state: StageState) -> Result<(), ProjectError> {
        log::info!("project state: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.save()
    }

    /// Persist `project.json` (and `script.json` once scenes exist).
    pub fn save(&self) -> Result<(), ProjectError> {
        std::fs::create_dir_all(&self.root).map_err(|e| ProjectError::Io {
            path: self.root.clone(),
            source: e,
        })?;

        let path = self.root.join(PROJECT_FILE);
        let content = serde_json::to_string_pretty(self).map_err(|e| ProjectError::Parse {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, content).map_err(|e| ProjectError::Io { path, source: e })?;

        if !self.scenes.is_empty() {
            self.save_script()?;
        }
        Ok(())
    }

    /// Write the script artifact.
    fn save_script(&self) -> Result<(), ProjectError> {
        let artifact = ScriptArtifact {
            generated_at: self.created_at,
            total_scenes: self.scenes.len(),
            scenes: self.scenes.clone(),
        };
        let path = self.root.join(SCRIPT_FILE);
        let content = serde_json::to_string_pretty(&artifact).map_err(|e| ProjectError::Parse {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, content).map_err(|e| ProjectError::Io { path, source: e })
    }

    /// Load a persisted project from its directory.
    pub fn load(root: &Path) -> Result<Self, ProjectError> {
        let path = root.join(PROJECT_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| ProjectError::Io {
            path: path.clone(),
            source: e,
        })?;
        let mut project: Project =
            serde_json::from_str(&content).map_err(|e| ProjectError::Parse { path, source: e })?;
        project.root = root.to_path_buf();
        Ok(project)
    }

    /// Check the scene index invariant: contiguous from 0.
    pub fn scenes_are_ordered(&self) -> bool {
        self.scenes
            .iter()
            .enumerate()
            .all(|(i, scene)| scene.index == i)
    }
}

/// Errors that can occur while persisting or loading a project.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
