use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use kitfusion_contracts::chat::{parse_intent, Intent, CHAT_HELP_COMMANDS};
use kitfusion_contracts::presets::catalog_lines;
use kitfusion_contracts::slot::{SlotEvent, SlotRole};
use kitfusion_engine::camera::{default_camera_backend, CameraBackend, CameraSession};
use kitfusion_engine::media::decode_payload_bytes;
use kitfusion_engine::{
    default_client_registry, CaptureOutcome, FusionSession, GeminiConfig, GenerationClient,
    SessionOptions,
};

#[derive(Debug, Parser)]
#[command(
    name = "kitfusion",
    version,
    about = "Dress a player photo in a reference jersey with an image-fusion model"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session: load images, pick presets, generate, export.
    Chat(ChatArgs),
    /// One generation and one export, then exit.
    Fuse(FuseArgs),
    /// List shot, scene and filter presets.
    Presets,
    /// Take one still from the camera.
    Capture(CaptureArgs),
}

#[derive(Debug, Args)]
struct ClientArgs {
    #[arg(long, env = "KITFUSION_CLIENT", default_value = "gemini")]
    client: String,
    #[arg(long, env = "KITFUSION_MODEL")]
    model: Option<String>,
    /// Request timeout in seconds (clamped to 15-300).
    #[arg(long)]
    timeout: Option<f64>,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    client: ClientArgs,
    #[arg(long, default_value_t = 0)]
    device: u32,
}

#[derive(Debug, Parser)]
struct FuseArgs {
    #[arg(long)]
    person: PathBuf,
    #[arg(long)]
    garment: PathBuf,
    #[arg(long)]
    prompt: Option<String>,
    #[arg(long, default_value = "original")]
    shot: String,
    #[arg(long, default_value = "original")]
    scene: String,
    #[arg(long, default_value = "Original")]
    filter: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    #[command(flatten)]
    client: ClientArgs,
}

#[derive(Debug, Parser)]
struct CaptureArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = 0)]
    device: u32,
    /// Seconds to wait for the first decodable frame.
    #[arg(long, default_value_t = 5.0)]
    ready_timeout: f64,
}

const CAPTURE_READY_TIMEOUT: Duration = Duration::from_secs(3);

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("kitfusion error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Fuse(args) => run_fuse(args),
        Command::Presets => {
            for line in catalog_lines() {
                println!("{line}");
            }
            Ok(0)
        }
        Command::Capture(args) => run_capture(args),
    }
}

fn build_client(args: &ClientArgs) -> Result<Arc<dyn GenerationClient>> {
    let config = GeminiConfig::from_env()
        .with_model(args.model.as_deref())
        .with_timeout(args.timeout);
    let registry = default_client_registry(config);
    log::debug!("clients available: {}", registry.names().join(", "));
    registry.get(&args.client).with_context(|| {
        format!(
            "unknown client '{}' (available: {})",
            args.client.trim(),
            registry.names().join(", ")
        )
    })
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let client = build_client(&args.client)?;
    let model = client.model().unwrap_or("offline").to_string();
    let mut session = FusionSession::new(SessionOptions {
        out_dir: args.out.clone(),
        events_path: args.events.clone(),
        client,
    })?;
    let camera = default_camera_backend(args.device);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();

    println!(
        "JerseyFusion session started ({} client, {}). Type /help for commands.",
        session.client_name(),
        model
    );

    let outcome = loop {
        print!("> ");
        if let Err(err) = stdout.flush() {
            break Err(err.into());
        }

        line.clear();
        let read = match stdin.read_line(&mut line) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => break Err(err.into()),
        };
        if read == 0 {
            break Ok(());
        }

        let intent = parse_intent(line.trim_end_matches(['\n', '\r']));
        match handle_intent(&mut session, camera.as_ref(), &intent, &mut stdout) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    session.finish();
    outcome
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

fn handle_intent(
    session: &mut FusionSession,
    camera: &dyn CameraBackend,
    intent: &Intent,
    out: &mut dyn Write,
) -> Result<Flow> {
    match intent.action.as_str() {
        "noop" => {}
        "quit" => return Ok(Flow::Quit),
        "help" => {
            writeln!(out, "Commands: {}", CHAT_HELP_COMMANDS.join(" "))?;
            writeln!(out, "Any other text replaces the instruction.")?;
        }
        "presets" => {
            for line in catalog_lines() {
                writeln!(out, "{line}")?;
            }
        }
        "status" => write_status(session, out)?,
        "set_instruction" => match intent.arg("value") {
            Some(value) => {
                session.set_instruction(value);
                writeln!(out, "Instruction updated.")?;
            }
            None => writeln!(out, "Instruction: {}", session.instruction())?,
        },
        "load_image" => {
            let Some(role) = slot_arg(intent) else {
                writeln!(out, "Unknown slot.")?;
                return Ok(Flow::Continue);
            };
            let Some(path) = intent.arg("path") else {
                writeln!(out, "/{} requires a path", role.key())?;
                return Ok(Flow::Continue);
            };
            match session.load_file(role, Path::new(path)) {
                Ok(Some(_)) => {
                    writeln!(out, "{}: {}", role.label(), session.slot(role).describe())?
                }
                Ok(None) => writeln!(
                    out,
                    "{} has a live camera. Use /capture or /cancel first.",
                    role.label()
                )?,
                Err(err) => writeln!(out, "Could not load {path}: {err:#}")?,
            }
        }
        "drag_enter" | "drag_leave" | "clear_slot" => {
            let Some(role) = slot_arg(intent) else {
                writeln!(out, "Usage: /{} <person|garment>", command_name(intent))?;
                return Ok(Flow::Continue);
            };
            let event = match intent.action.as_str() {
                "drag_enter" => SlotEvent::DragEnter,
                "drag_leave" => SlotEvent::DragLeave,
                _ => SlotEvent::Clear,
            };
            session.apply_slot_event(role, event);
            writeln!(out, "{}: {}", role.label(), session.slot(role).describe())?;
        }
        "start_camera" => {
            let Some(role) = slot_arg(intent) else {
                writeln!(out, "Usage: /camera <person|garment>")?;
                return Ok(Flow::Continue);
            };
            if session.start_camera(role, camera) {
                writeln!(out, "Camera live for {}. /capture or /cancel.", role.label())?;
            } else if let Some(failure) = session.slot(role).camera_error() {
                writeln!(out, "{failure} Retry with /camera {}.", role.key())?;
            } else {
                writeln!(
                    out,
                    "{} already holds an image. /clear {} first.",
                    role.label(),
                    role.key()
                )?;
            }
        }
        "capture" => match session.capture(CAPTURE_READY_TIMEOUT) {
            CaptureOutcome::Captured(role) => {
                writeln!(out, "{}: {}", role.label(), session.slot(role).describe())?
            }
            CaptureOutcome::NotReady => {
                writeln!(out, "Camera is not ready yet. Try /capture again.")?
            }
            CaptureOutcome::NoCamera => {
                writeln!(out, "No live camera. Start one with /camera <slot>.")?
            }
            CaptureOutcome::Failed(role, failure) => {
                writeln!(out, "{failure} Retry with /camera {}.", role.key())?
            }
        },
        "cancel_camera" => {
            if session.cancel_camera() {
                writeln!(out, "Camera closed.")?;
            } else {
                writeln!(out, "No live camera.")?;
            }
        }
        "set_shot" => match session.select_shot(intent.arg("value").unwrap_or_default()) {
            Ok(shot) => writeln!(out, "Shot: {}", shot.name)?,
            Err(err) => writeln!(out, "{err}. See /presets.")?,
        },
        "set_scene" => match session.select_scene(intent.arg("value").unwrap_or_default()) {
            Ok(scene) => writeln!(out, "Scene: {}", scene.name)?,
            Err(err) => writeln!(out, "{err}. See /presets.")?,
        },
        "set_filter" => match session.select_filter(intent.arg("value").unwrap_or_default()) {
            Ok(filter) => writeln!(out, "Filter: {} ({})", filter.name, filter.css())?,
            Err(err) => writeln!(out, "{err}. See /presets.")?,
        },
        "generate" => run_generate(session, out)?,
        "dismiss" => {
            if session.dismiss_error() {
                writeln!(out, "Error dismissed.")?;
            }
        }
        "export" => {
            let dir = intent.arg("dir").map(Path::new);
            match session.export(dir) {
                Ok(Some(path)) => writeln!(out, "Exported {}", path.display())?,
                Ok(None) => writeln!(out, "Nothing to export yet. Run /generate first.")?,
                Err(err) => writeln!(out, "Could not export: {err:#}")?,
            }
        }
        _ => {
            writeln!(
                out,
                "Unknown command /{}. Type /help.",
                intent.arg("command").unwrap_or_default()
            )?;
        }
    }
    Ok(Flow::Continue)
}

fn run_generate(session: &mut FusionSession, out: &mut dyn Write) -> Result<()> {
    if !session.generate() {
        let missing = missing_inputs(session);
        if missing.is_empty() {
            writeln!(out, "A generation is already running.")?;
        } else {
            writeln!(out, "Cannot generate yet: missing {}.", missing.join(", "))?;
        }
        return Ok(());
    }
    writeln!(out, "Fusing...")?;
    out.flush()?;
    session.wait();
    if let Some(result) = session.result() {
        writeln!(
            out,
            "Result ready ({}, {} bytes). Try /filter <name> or /export [dir].",
            result.mime(),
            result.approx_bytes()
        )?;
    } else if let Some(failure) = session.error() {
        writeln!(out, "Generation failed: {failure} (/dismiss to close)")?;
    }
    Ok(())
}

fn missing_inputs(session: &FusionSession) -> Vec<&'static str> {
    let mut missing = Vec::new();
    for role in SlotRole::ALL {
        if !session.slot(role).is_filled() {
            missing.push(role.key());
        }
    }
    if session.instruction().trim().is_empty() {
        missing.push("instruction");
    }
    missing
}

fn write_status(session: &FusionSession, out: &mut dyn Write) -> Result<()> {
    for role in SlotRole::ALL {
        writeln!(out, "{}: {}", role.label(), session.slot(role).describe())?;
    }
    writeln!(out, "Instruction: {}", session.instruction())?;
    writeln!(out, "Shot: {}", session.shot().name)?;
    writeln!(out, "Scene: {}", session.scene().name)?;
    writeln!(out, "Filter: {}", session.filter().name)?;
    writeln!(out, "State: {}", session.request_state().name())?;
    if let Some(failure) = session.error() {
        writeln!(out, "Error: {failure}")?;
    }
    Ok(())
}

fn slot_arg(intent: &Intent) -> Option<SlotRole> {
    intent.arg("slot").and_then(SlotRole::parse)
}

fn command_name(intent: &Intent) -> &'static str {
    match intent.action.as_str() {
        "drag_enter" => "drag",
        "drag_leave" => "leave",
        _ => "clear",
    }
}

fn run_fuse(args: FuseArgs) -> Result<i32> {
    let client = build_client(&args.client)?;
    let mut session = FusionSession::new(SessionOptions {
        out_dir: args.out.clone(),
        events_path: args.events.clone(),
        client,
    })?;
    session.load_file(SlotRole::Person, &args.person)?;
    session.load_file(SlotRole::Garment, &args.garment)?;
    if let Some(prompt) = args.prompt.as_deref() {
        session.set_instruction(prompt);
    }
    session.select_shot(&args.shot)?;
    session.select_scene(&args.scene)?;

    if !session.generate() {
        session.finish();
        bail!("instruction text is empty");
    }
    session.wait();
    if let Some(failure) = session.error() {
        println!("Generation failed: {failure}");
        session.finish();
        return Ok(1);
    }

    session.select_filter(&args.filter)?;
    let exported = session.export(None);
    session.finish();
    match exported? {
        Some(path) => {
            println!("Exported {}", path.display());
            Ok(0)
        }
        None => Ok(1),
    }
}

fn run_capture(args: CaptureArgs) -> Result<i32> {
    let backend = default_camera_backend(args.device);
    let mut camera = match CameraSession::open(backend.as_ref()) {
        Ok(camera) => camera,
        Err(failure) => {
            println!("{failure}");
            return Ok(1);
        }
    };
    let timeout = Duration::from_secs_f64(args.ready_timeout.max(0.0));
    if !camera.wait_ready(timeout) {
        println!("Camera did not become ready.");
        return Ok(1);
    }
    let Some(still) = camera.capture()? else {
        println!("Camera did not become ready.");
        return Ok(1);
    };
    let bytes = decode_payload_bytes(&still)?;
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(&args.out, &bytes)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!("Saved {} ({})", args.out.display(), still.mime());
    Ok(0)
}
