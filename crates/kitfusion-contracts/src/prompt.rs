use crate::presets::PromptPreset;

pub const DEFAULT_INSTRUCTION: &str = "Make the player in the first image wear the jersey from the second image. The jersey is the orange Ivory Coast kit. Ensure the fit is realistic with wrinkles and lighting matching the player's scene. Also, change the player's shorts to be white.";

const SHOT_HEADING: &str = " \n\nFraming/Shot Instruction: ";
const SCENE_HEADING: &str = " \n\nBackground/Scene Instruction: ";

/// Free text, then the framing fragment, then the background fragment.
pub fn assemble_instruction(text: &str, shot: &PromptPreset, scene: &PromptPreset) -> String {
    let mut out =
        String::with_capacity(text.len() + shot.prompt.len() + scene.prompt.len() + 64);
    out.push_str(text);
    out.push_str(SHOT_HEADING);
    out.push_str(shot.prompt);
    out.push_str(SCENE_HEADING);
    out.push_str(scene.prompt);
    out
}
