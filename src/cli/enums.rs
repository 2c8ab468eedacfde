//! CLI enum types for style, resolution, effect, voice, and stage options.

use clap::ValueEnum;

use crate::pipeline::StartStage;
use crate::scene;

/// Narrative style of the generated script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Style {
    #[default]
    Cinematic,
    Documentary,
    Educational,
    Animation,
    Free,
}

impl From<Style> for scene::Style {
    fn from(s: Style) -> Self {
        match s {
            Style::Cinematic => scene::Style::Cinematic,
            Style::Documentary => scene::Style::Documentary,
            Style::Educational => scene::Style::Educational,
            Style::Animation => scene::Style::Animation,
            Style::Free => scene::Style::Free,
        }
    }
}

/// Target output resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Resolution {
    Square,
    #[default]
    Landscape,
    Wide,
    Portrait,
}

impl From<Resolution> for scene::Resolution {
    fn from(r: Resolution) -> Self {
        match r {
            Resolution::Square => scene::Resolution::Square,
            Resolution::Landscape => scene::Resolution::Landscape,
            Resolution::Wide => scene::Resolution::Wide,
            Resolution::Portrait => scene::Resolution::Portrait,
        }
    }
}

/// Pan/zoom effect forced onto every scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Effect {
    KenBurns,
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    None,
}

impl From<Effect> for scene::EffectKind {
    fn from(e: Effect) -> Self {
        match e {
            Effect::KenBurns => scene::EffectKind::KenBurns,
            Effect::ZoomIn => scene::EffectKind::ZoomIn,
            Effect::ZoomOut => scene::EffectKind::ZoomOut,
            Effect::PanLeft => scene::EffectKind::PanLeft,
            Effect::PanRight => scene::EffectKind::PanRight,
            Effect::None => scene::EffectKind::None,
        }
    }
}

/// Narration voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Voice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl From<Voice> for scene::VoiceId {
    fn from(v: Voice) -> Self {
        match v {
            Voice::Alloy => scene::VoiceId::Alloy,
            Voice::Echo => scene::VoiceId::Echo,
            Voice::Fable => scene::VoiceId::Fable,
            Voice::Onyx => scene::VoiceId::Onyx,
            Voice::Nova => scene::VoiceId::Nova,
            Voice::Shimmer => scene::VoiceId::Shimmer,
        }
    }
}

/// Stage to resume a persisted project from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Script,
    Images,
    Audio,
    Video,
}

impl From<Stage> for StartStage {
    fn from(s: Stage) -> Self {
        match s {
            Stage::Script => StartStage::Script,
            Stage::Images => StartStage::Images,
            Stage::Audio => StartStage::Audio,
            Stage::Video => StartStage::Video,
        }
    }
}
