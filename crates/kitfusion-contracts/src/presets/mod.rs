mod filters;
mod framing;

pub use filters::{find_filter, FilterOp, FilterPreset, FILTERS, IDENTITY_FILTER};
pub use framing::{
    find_scene, find_shot, PromptPreset, DEFAULT_SCENE, DEFAULT_SHOT, SCENES, SHOTS,
};

/// Lists the display rows of every catalog, for `/presets` and the CLI.
pub fn catalog_lines() -> Vec<String> {
    let mut lines = Vec::new();
    lines.push("Framing / Shot:".to_string());
    for shot in SHOTS {
        lines.push(format!("  {:<18} {}", shot.id, shot.name));
    }
    lines.push("Scene / Background:".to_string());
    for scene in SCENES {
        lines.push(format!("  {:<18} {}", scene.id, scene.name));
    }
    lines.push("Filters:".to_string());
    for filter in FILTERS {
        lines.push(format!("  {:<18} {}", filter.name, filter.css()));
    }
    lines
}
