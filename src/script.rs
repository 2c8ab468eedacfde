//! Script stage: turn a prompt into an ordered sequence of scenes.
//!
//! When a text provider is configured the chain is asked for the script;
//! otherwise (or when every provider fails) a deterministic local template
//! slices the prompt into roughly equal narrative beats. The fallback path
//! never fails, so script generation is available with zero credentials.

use crate::provider::{try_chain, SceneDraft, ScriptRequest, TextProvider};
use crate::scene::{Scene, Style};

/// Suffix appended to template image prompts, mirroring what the text
/// providers are asked to produce.
const IMAGE_PROMPT_SUFFIX: &str = "professional photography, high quality";

/// Generate the scene list for a prompt.
///
/// `num_scenes` is assumed to be validated by the caller (the coordinator
/// rejects out-of-range counts before this stage runs). The returned list
/// always has exactly `num_scenes` entries with contiguous indices.
pub async fn generate_scenes(
    prompt: &str,
    num_scenes: usize,
    style: Style,
    providers: &[TextProvider],
) -> Vec<Scene> {
    if providers.is_empty() {
        log::info!("no text providers configured, using template script");
        return template_scenes(prompt, num_scenes, style);
    }

    let request = ScriptRequest {
        prompt: prompt.to_string(),
        num_scenes,
        style,
    };

    match try_chain(providers, &request).await {
        Ok(drafts) => {
            log::info!("script generated by provider chain ({} scenes)", drafts.len());
            scenes_from_drafts(drafts, prompt, num_scenes, style)
        }
        Err(e) => {
            log::warn!("all text providers failed ({}), using template script", e);
            template_scenes(prompt, num_scenes, style)
        }
    }
}

/// Turn provider drafts into scenes, padding with template beats when the
/// provider under-delivered and defaulting any missing fields.
pub fn scenes_from_drafts(
    drafts: Vec<SceneDraft>,
    prompt: &str,
    num_scenes: usize,
    style: Style,
) -> Vec<Scene> {
    let template = template_scenes(prompt, num_scenes, style);
    let mut scenes = Vec::with_capacity(num_scenes);

    for (index, fallback) in template.into_iter().enumerate() {
        let scene = match drafts.get(index) {
            Some(draft) => {
                let title = if draft.title.trim().is_empty() {
                    fallback.title.clone()
                } else {
                    draft.title.trim().to_string()
                };
                let narration = if draft.description.trim().is_empty() {
                    fallback.narration_text.clone()
                } else {
                    draft.description.trim().to_string()
                };
                let image_prompt = if draft.image_prompt.trim().is_empty() {
                    fallback.image_prompt.clone()
                } else {
                    draft.image_prompt.trim().to_string()
                };
                let duration = draft
                    .duration
                    .filter(|d| *d > 0.0)
                    .unwrap_or_else(|| style.default_duration());
                Scene::new(index, title, narration, image_prompt, duration, fallback.effect_kind)
            }
            None => fallback,
        };
        scenes.push(scene);
    }

    scenes
}

/// Deterministic template script: slice the prompt into `num_scenes`
/// roughly equal word-beats.
pub fn template_scenes(prompt: &str, num_scenes: usize, style: Style) -> Vec<Scene> {
    let beats = split_into_beats(prompt, num_scenes);
    let lead = style.narration_lead();

    beats
        .into_iter()
        .enumerate()
        .map(|(index, beat)| {
            let narration = if lead.is_empty() {
                format!("{}.", capitalize(&beat))
            } else {
                format!("{} {}.", lead, beat)
            };
            let image_prompt = format!("{}, {} scene, {}", beat, style.as_str(), IMAGE_PROMPT_SUFFIX);
            Scene::new(
                index,
                format!("Scene {}", index + 1),
                narration,
                image_prompt,
                style.default_duration(),
                Default::default(),
            )
        })
        .collect()
}

/// Split a prompt into `n` roughly equal word groups.
///
/// Short prompts repeat in full rather than producing empty beats, so the
/// output is always `n` non-empty strings.
fn split_into_beats(prompt: &str, n: usize) -> Vec<String> {
    let words: Vec<&str> = prompt.split_whitespace().collect();
    let n = n.max(1);

    if words.is_empty() {
        return vec!["an unfolding story".to_string(); n];
    }
    if words.len() < n {
        return vec![words.join(" "); n];
    }

    let chunk = words.len().div_ceil(n);
    let mut beats = Vec::with_capacity(n);
    for i in 0..n {
        let start = (i * chunk).min(words.len());
        let end = ((i + 1) * chunk).min(words.len());
        if start < end {
            beats.push(words[start..end].join(" "));
        } else {
            // Trailing chunks exhausted the words; reuse the full prompt.
            beats.push(words.join(" "));
        }
    }
    beats
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
