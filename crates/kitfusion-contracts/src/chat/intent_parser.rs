use std::collections::BTreeMap;

use serde_json::Value;

use super::command_registry::{
    CommandSpec, EXPORT_COMMAND, NO_ARG_COMMANDS, RAW_ARG_COMMANDS, SLOT_ARG_COMMANDS,
    SLOT_PATH_COMMANDS,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub command_args: BTreeMap<String, Value>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            command_args: BTreeMap::new(),
        }
    }

    fn with_arg(mut self, key: &str, value: impl Into<String>) -> Self {
        self.command_args
            .insert(key.to_string(), Value::String(value.into()));
        self
    }

    /// String argument, `None` when absent or blank.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.command_args
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn find_action(command: &str, specs: &[CommandSpec]) -> Option<&'static str> {
    specs
        .iter()
        .find(|entry| entry.command == command)
        .map(|entry| entry.action)
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn slot_key_for_command(command: &str) -> &'static str {
    match command {
        "person" | "player" => "person",
        _ => "garment",
    }
}

pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(action) = find_action(&command, SLOT_PATH_COMMANDS) {
                return Intent::new(action, text)
                    .with_arg("slot", slot_key_for_command(&command))
                    .with_arg("path", parse_single_path_arg(arg));
            }

            if let Some(action) = find_action(&command, SLOT_ARG_COMMANDS) {
                return Intent::new(action, text).with_arg("slot", arg.to_ascii_lowercase());
            }

            if let Some(action) = find_action(&command, RAW_ARG_COMMANDS) {
                return Intent::new(action, text).with_arg("value", arg);
            }

            if let Some(action) = find_action(&command, NO_ARG_COMMANDS) {
                return Intent::new(action, text);
            }

            if command == EXPORT_COMMAND.command {
                return Intent::new(EXPORT_COMMAND.action, text)
                    .with_arg("dir", parse_single_path_arg(arg));
            }

            return Intent::new("unknown", text)
                .with_arg("command", command)
                .with_arg("arg", arg);
        }
    }

    Intent::new("set_instruction", text).with_arg("value", raw_trimmed)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse_intent;

    #[test]
    fn parse_slot_path_commands() {
        let person = parse_intent("/person \"/tmp/my player.jpg\"");
        assert_eq!(person.action, "load_image");
        assert_eq!(person.command_args["slot"], json!("person"));
        assert_eq!(person.command_args["path"], json!("/tmp/my player.jpg"));

        let jersey = parse_intent("/jersey kit.png");
        assert_eq!(jersey.action, "load_image");
        assert_eq!(jersey.arg("slot"), Some("garment"));
        assert_eq!(jersey.arg("path"), Some("kit.png"));
    }

    #[test]
    fn parse_slot_arg_commands() {
        let camera = parse_intent("/camera Garment");
        assert_eq!(camera.action, "start_camera");
        assert_eq!(camera.arg("slot"), Some("garment"));

        let clear = parse_intent("/clear");
        assert_eq!(clear.action, "clear_slot");
        assert_eq!(clear.arg("slot"), None);

        assert_eq!(parse_intent("/drag person").action, "drag_enter");
        assert_eq!(parse_intent("/leave person").action, "drag_leave");
    }

    #[test]
    fn parse_preset_commands_keep_raw_value() {
        let shot = parse_intent("/shot low_angle");
        assert_eq!(shot.action, "set_shot");
        assert_eq!(shot.arg("value"), Some("low_angle"));

        let filter = parse_intent("/filter Vivid");
        assert_eq!(filter.action, "set_filter");
        assert_eq!(filter.arg("value"), Some("Vivid"));

        let prompt = parse_intent("/prompt make it blue");
        assert_eq!(prompt.action, "set_instruction");
        assert_eq!(prompt.arg("value"), Some("make it blue"));
    }

    #[test]
    fn parse_no_arg_commands() {
        assert_eq!(parse_intent("/capture").action, "capture");
        assert_eq!(parse_intent("/cancel").action, "cancel_camera");
        assert_eq!(parse_intent("/GENERATE").action, "generate");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn parse_export_with_optional_dir() {
        let bare = parse_intent("/export");
        assert_eq!(bare.action, "export");
        assert_eq!(bare.arg("dir"), None);

        let dir = parse_intent("/export \"/tmp/out dir\"");
        assert_eq!(dir.arg("dir"), Some("/tmp/out dir"));
    }

    #[test]
    fn plain_text_sets_instruction() {
        let intent = parse_intent("  Put the player in the away kit.  ");
        assert_eq!(intent.action, "set_instruction");
        assert_eq!(intent.arg("value"), Some("Put the player in the away kit."));
        assert_eq!(parse_intent("   ").action, "noop");
    }

    #[test]
    fn parse_unknown_command() {
        let intent = parse_intent("/magic foo bar");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.command_args["command"], json!("magic"));
        assert_eq!(intent.command_args["arg"], json!("foo bar"));
    }
}
