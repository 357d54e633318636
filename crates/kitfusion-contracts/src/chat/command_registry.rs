#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// `/person <path>` style: the command names the slot, the argument is a path.
pub(crate) const SLOT_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "person",
        action: "load_image",
    },
    CommandSpec {
        command: "player",
        action: "load_image",
    },
    CommandSpec {
        command: "garment",
        action: "load_image",
    },
    CommandSpec {
        command: "jersey",
        action: "load_image",
    },
];

/// The argument names a slot.
pub(crate) const SLOT_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "camera",
        action: "start_camera",
    },
    CommandSpec {
        command: "clear",
        action: "clear_slot",
    },
    CommandSpec {
        command: "drag",
        action: "drag_enter",
    },
    CommandSpec {
        command: "leave",
        action: "drag_leave",
    },
];

/// The argument is taken verbatim.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "shot",
        action: "set_shot",
    },
    CommandSpec {
        command: "scene",
        action: "set_scene",
    },
    CommandSpec {
        command: "filter",
        action: "set_filter",
    },
    CommandSpec {
        command: "prompt",
        action: "set_instruction",
    },
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "capture",
        action: "capture",
    },
    CommandSpec {
        command: "cancel",
        action: "cancel_camera",
    },
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "dismiss",
        action: "dismiss",
    },
    CommandSpec {
        command: "presets",
        action: "presets",
    },
    CommandSpec {
        command: "status",
        action: "status",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const EXPORT_COMMAND: CommandSpec = CommandSpec {
    command: "export",
    action: "export",
};

pub const CHAT_HELP_COMMANDS: &[&str] = &[
    "/person <path>",
    "/garment <path>",
    "/drag <slot>",
    "/leave <slot>",
    "/camera <slot>",
    "/capture",
    "/cancel",
    "/clear <slot>",
    "/shot <id>",
    "/scene <id>",
    "/filter <name>",
    "/prompt <text>",
    "/generate",
    "/export [dir]",
    "/dismiss",
    "/presets",
    "/status",
    "/help",
    "/quit",
];
