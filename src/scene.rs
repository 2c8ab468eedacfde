//! Core data model: scenes and the enumerated knobs that shape them.
//!
//! A [`Scene`] is one narrated beat of the output video. Scenes are created
//! by the script stage with contiguous indices starting at 0; later stages
//! attach artifact paths in place but never reorder or renumber them.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default duration of a scene in seconds when neither the style nor the
/// provider suggests one.
pub const DEFAULT_SCENE_DURATION: f64 = 3.0;

/// Minimum number of scenes per run.
pub const MIN_SCENES: usize = 1;

/// Maximum number of scenes per run.
pub const MAX_SCENES: usize = 10;

/// One narrated beat of the output video.
///
/// `image_path` and `audio_path` start out as `None` and are filled in by
/// the image and voice stages. `duration_seconds` starts as the style
/// default (or the provider's suggestion) and is overridden by the probed
/// narration length once audio exists, so the slideshow stays in sync with
/// the voice-over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    /// Position in the video, 0-based and contiguous.
    pub index: usize,
    /// Short display title for the scene.
    pub title: String,
    /// Narration text spoken over the scene.
    pub narration_text: String,
    /// Prompt handed to the image providers.
    pub image_prompt: String,
    /// How long the scene stays on screen, in seconds.
    pub duration_seconds: f64,
    /// Pan/zoom effect applied while the scene is on screen.
    pub effect_kind: EffectKind,
    /// Rendered image, attached by the image stage.
    #[serde(default)]
    pub image_path: Option<PathBuf>,
    /// Narration clip, attached by the voice stage.
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
}

impl Scene {
    /// Create a scene with no artifacts attached yet.
    pub fn new(
        index: usize,
        title: String,
        narration_text: String,
        image_prompt: String,
        duration_seconds: f64,
        effect_kind: EffectKind,
    ) -> Self {
        Self {
            index,
            title,
            narration_text,
            image_prompt,
            duration_seconds,
            effect_kind,
            image_path: None,
            audio_path: None,
        }
    }
}

/// Narrative style of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    #[default]
    Cinematic,
    Documentary,
    Educational,
    Animation,
    /// Unrestricted free-form style.
    Free,
}

impl Style {
    /// Default per-scene duration for this style, in seconds.
    pub fn default_duration(self) -> f64 {
        match self {
            Style::Cinematic => DEFAULT_SCENE_DURATION,
            Style::Documentary => 4.0,
            Style::Educational => 4.0,
            Style::Animation => DEFAULT_SCENE_DURATION,
            Style::Free => DEFAULT_SCENE_DURATION,
        }
    }

    /// Narration lead-in used by the template fallback.
    pub fn narration_lead(self) -> &'static str {
        match self {
            Style::Cinematic => "In this scene,",
            Style::Documentary => "We see",
            Style::Educational => "Observe how",
            Style::Animation => "And then,",
            Style::Free => "",
        }
    }

    /// Style name as sent to text providers in the prompt.
    pub fn as_str(self) -> &'static str {
        match self {
            Style::Cinematic => "cinematic",
            Style::Documentary => "documentary",
            Style::Educational => "educational",
            Style::Animation => "animation",
            Style::Free => "free",
        }
    }
}

/// Pan/zoom effect applied to a scene's still image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    /// Slow simultaneous zoom and diagonal pan.
    #[default]
    KenBurns,
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    None,
}

impl EffectKind {
    /// Build the ffmpeg `zoompan` filter expression for this effect.
    ///
    /// `frames` is the total frame count of the clip; all keyframes are
    /// linear in `on/frames` so the motion spans exactly the clip duration.
    /// Returns `None` for [`EffectKind::None`] (the image is only scaled).
    pub fn to_filter(self, frames: u32, width: u32, height: u32, fps: u32) -> Option<String> {
        let d = frames.max(1);
        match self {
            EffectKind::KenBurns => Some(format!(
                "zoompan=z='1+0.20*on/{d}':x='(iw-iw/zoom)*on/{d}/2':y='(ih-ih/zoom)*on/{d}/2':d={d}:s={width}x{height}:fps={fps}",
            )),
            EffectKind::ZoomIn => Some(format!(
                "zoompan=z='1+0.25*on/{d}':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={d}:s={width}x{height}:fps={fps}",
            )),
            EffectKind::ZoomOut => Some(format!(
                "zoompan=z='1.25-0.25*on/{d}':x='iw/2-(iw/zoom/2)':y='ih/2-(ih/zoom/2)':d={d}:s={width}x{height}:fps={fps}",
            )),
            EffectKind::PanLeft => Some(format!(
                "zoompan=z='1.2':x='(iw-iw/zoom)*(1-on/{d})':y='(ih-ih/zoom)/2':d={d}:s={width}x{height}:fps={fps}",
            )),
            EffectKind::PanRight => Some(format!(
                "zoompan=z='1.2':x='(iw-iw/zoom)*on/{d}':y='(ih-ih/zoom)/2':d={d}:s={width}x{height}:fps={fps}",
            )),
            EffectKind::None => None,
        }
    }

    /// Check if this effect applies any motion.
    pub fn is_active(&self) -> bool {
        *self != EffectKind::None
    }
}

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// 1024x1024
    Square,
    /// 1280x720
    #[default]
    Landscape,
    /// 1920x1080
    Wide,
    /// 1080x1920
    Portrait,
}

impl Resolution {
    /// Pixel dimensions as (width, height).
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Resolution::Square => (1024, 1024),
            Resolution::Landscape => (1280, 720),
            Resolution::Wide => (1920, 1080),
            Resolution::Portrait => (1080, 1920),
        }
    }
}

/// Narration voice identifier.
///
/// The set mirrors the OpenAI TTS voices; other speech providers map these
/// onto their own voice identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceId {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl VoiceId {
    /// Voice name as sent to the OpenAI speech API.
    pub fn as_str(self) -> &'static str {
        match self {
            VoiceId::Alloy => "alloy",
            VoiceId::Echo => "echo",
            VoiceId::Fable => "fable",
            VoiceId::Onyx => "onyx",
            VoiceId::Nova => "nova",
            VoiceId::Shimmer => "shimmer",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_new_has_no_artifacts() {
        let scene = Scene::new(
            0,
            "Opening".to_string(),
            "A quiet street at dawn.".to_string(),
            "quiet street at dawn, cinematic".to_string(),
            3.0,
            EffectKind::KenBurns,
        );
        assert_eq!(scene.index, 0);
        assert!(scene.image_path.is_none());
        assert!(scene.audio_path.is_none());
    }

    #[test]
    fn test_scene_roundtrips_through_json() {
        let mut scene = Scene::new(
            2,
            "Scene 3".to_string(),
            "Narration".to_string(),
            "prompt".to_string(),
            4.5,
            EffectKind::PanLeft,
        );
        scene.image_path = Some(PathBuf::from("images/scene_2.png"));

        let json = serde_json::to_string(&scene).unwrap();
        let back: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(back.index, 2);
        assert_eq!(back.duration_seconds, 4.5);
        assert_eq!(back.effect_kind, EffectKind::PanLeft);
        assert_eq!(back.image_path, Some(PathBuf::from("images/scene_2.png")));
        assert!(back.audio_path.is_none());
    }

    #[test]
    fn test_effect_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EffectKind::KenBurns).unwrap();
        assert_eq!(json, "\"ken_burns\"");
        let back: EffectKind = serde_json::from_str("\"pan_right\"").unwrap();
        assert_eq!(back, EffectKind::PanRight);
    }

    #[test]
    fn test_effect_none_has_no_filter() {
        assert!(EffectKind::None.to_filter(90, 1280, 720, 30).is_none());
        assert!(!EffectKind::None.is_active());
    }

    #[test]
    fn test_effect_filters_reference_frame_count() {
        for effect in [
            EffectKind::KenBurns,
            EffectKind::ZoomIn,
            EffectKind::ZoomOut,
            EffectKind::PanLeft,
            EffectKind::PanRight,
        ] {
            let filter = effect.to_filter(90, 1280, 720, 30).unwrap();
            assert!(filter.contains("d=90"), "{:?}: {}", effect, filter);
            assert!(filter.contains("s=1280x720"), "{:?}: {}", effect, filter);
            assert!(filter.contains("fps=30"), "{:?}: {}", effect, filter);
        }
    }

    #[test]
    fn test_effect_filter_clamps_zero_frames() {
        // Degenerate clip lengths must not produce a division by zero.
        let filter = EffectKind::ZoomIn.to_filter(0, 1280, 720, 24).unwrap();
        assert!(filter.contains("d=1"));
    }

    #[test]
    fn test_style_default_durations_positive() {
        for style in [
            Style::Cinematic,
            Style::Documentary,
            Style::Educational,
            Style::Animation,
            Style::Free,
        ] {
            assert!(style.default_duration() > 0.0);
        }
    }

    #[test]
    fn test_resolution_dimensions() {
        assert_eq!(Resolution::Square.dimensions(), (1024, 1024));
        assert_eq!(Resolution::Landscape.dimensions(), (1280, 720));
        assert_eq!(Resolution::Wide.dimensions(), (1920, 1080));
        assert_eq!(Resolution::Portrait.dimensions(), (1080, 1920));
    }

    #[test]
    fn test_voice_id_names() {
        assert_eq!(VoiceId::Alloy.as_str(), "alloy");
        assert_eq!(VoiceId::Shimmer.as_str(), "shimmer");
    }
}
