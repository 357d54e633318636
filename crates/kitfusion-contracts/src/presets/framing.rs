/// A named instruction fragment appended to the generation prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub prompt: &'static str,
}

pub const SHOTS: &[PromptPreset] = &[
    PromptPreset {
        id: "original",
        name: "Original Framing",
        prompt: "Maintain the exact framing and composition of the original player image.",
    },
    PromptPreset {
        id: "extreme_close_up",
        name: "Extreme Close-Up",
        prompt: "An extreme close-up focusing intensely on the jersey fabric texture, the badge, and the player's face.",
    },
    PromptPreset {
        id: "close_up",
        name: "Close-Up",
        prompt: "A close-up shot focusing on the chest, shoulders and head, highlighting the jersey details and player expression.",
    },
    PromptPreset {
        id: "portrait",
        name: "Portrait (Head & Shoulders)",
        prompt: "Standard portrait shot, focusing on the head and upper shoulders. High detail on the face and collar.",
    },
    PromptPreset {
        id: "waist",
        name: "Waist-Up (Medium Shot)",
        prompt: "Medium shot, framing the player from the waist up to show the jersey clearly.",
    },
    PromptPreset {
        id: "knee",
        name: "Knee-Up (American Shot)",
        prompt: "American shot (plan américain), framing the player from the knees up.",
    },
    PromptPreset {
        id: "full",
        name: "Full Body",
        prompt: "Wide shot showing the full body of the player including legs and feet.",
    },
    PromptPreset {
        id: "wide",
        name: "Wide / Long Shot",
        prompt: "A wide angle long shot capturing the player and a significant amount of the surrounding environment.",
    },
    PromptPreset {
        id: "low_angle",
        name: "Low Angle (Heroic)",
        prompt: "Camera placed low looking up at the player, creating a heroic and imposing stature.",
    },
    PromptPreset {
        id: "high_angle",
        name: "High Angle",
        prompt: "Camera placed high looking down, providing a unique perspective on the player and kit.",
    },
    PromptPreset {
        id: "three_quarter",
        name: "3/4 Angle",
        prompt: "A 3/4 angle view of the player, adding depth to the stance.",
    },
    PromptPreset {
        id: "action",
        name: "Dynamic Action",
        prompt: "Dynamic action shot with motion blur, tilted angle, and an athletic pose.",
    },
];

pub const SCENES: &[PromptPreset] = &[
    PromptPreset {
        id: "original",
        name: "Original Background",
        prompt: "Keep the background exactly as it is in the player image.",
    },
    PromptPreset {
        id: "stadium",
        name: "Stadium Night",
        prompt: "Blurred soccer stadium background at night with floodlights, lens flare, and atmospheric crowd.",
    },
    PromptPreset {
        id: "training",
        name: "Training Pitch",
        prompt: "Sunny professional training ground, green natural grass, blue sky, depth of field.",
    },
    PromptPreset {
        id: "street",
        name: "Urban Street",
        prompt: "Urban street football court, concrete surface, chain-link fence, graffiti, dramatic daylight.",
    },
    PromptPreset {
        id: "locker",
        name: "Locker Room",
        prompt: "Professional stadium locker room context, benches, jerseys hanging, artificial indoor lighting.",
    },
    PromptPreset {
        id: "studio_backlight",
        name: "Studio Dark Mode",
        prompt: "Professional photo studio setting with dramatic backlight and rim lighting. Dark moody atmosphere.",
    },
    PromptPreset {
        id: "studio_neon",
        name: "Neon / Cyberpunk",
        prompt: "Futuristic studio lighting with vibrant pink and blue neon rim lights, high contrast.",
    },
    PromptPreset {
        id: "studio_soft",
        name: "Soft Studio White",
        prompt: "High-key fashion photography style, soft even lighting, clean white or light grey background.",
    },
    PromptPreset {
        id: "golden_hour",
        name: "Golden Hour",
        prompt: "Outdoor setting, warm sunset light (golden hour), artistic lens flare, soft background bokeh.",
    },
];

pub const DEFAULT_SHOT: &PromptPreset = &SHOTS[0];
pub const DEFAULT_SCENE: &PromptPreset = &SCENES[0];

fn find_in(catalog: &'static [PromptPreset], id: &str) -> Option<&'static PromptPreset> {
    let wanted = id.trim().to_ascii_lowercase();
    catalog.iter().find(|preset| preset.id == wanted)
}

pub fn find_shot(id: &str) -> Option<&'static PromptPreset> {
    find_in(SHOTS, id)
}

pub fn find_scene(id: &str) -> Option<&'static PromptPreset> {
    find_in(SCENES, id)
}
