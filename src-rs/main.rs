use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use image::DynamicImage;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use snapmark::export::{self, ExportFormat};
use snapmark::{Editor, EditorConfig, LayerKind, Point, PointerDown};
use std::collections::VecDeque;
use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCRIPT_HELP: &str = r##"Session script JSON schema:
{
  "prompts": ["Replacement text", null],
  "steps": [
    {"op": "tool", "tool": "highlight"},
    {"op": "drag", "from": [10, 10], "to": [120, 80], "steps": 4},
    {"op": "down", "x": 40, "y": 30, "clicks": 2},
    {"op": "up"},
    {"op": "color", "color": "#0a84ff"},
    {"op": "tool", "tool": "crop"},
    {"op": "drag", "from": [5, 5], "to": [300, 200]},
    {"op": "undo"}
  ]
}

Ops:
- tool {tool: crop|blur|highlight|line|text|null}   arm (or disarm with null) a creation tool
- down {x, y, clicks=1}, move {x, y}, up             raw pointer events in canvas logical pixels
- drag {from: [x, y], to: [x, y], steps=1}           down + interpolated moves + up
- escape, delete, undo                               keyboard actions
- blur_radius {radius}, color {color}, text_color {color}, font_size {size}
                                                     tool panel edits; applied to the active layer when it matches
- select {index}, reorder {from, to}                 layers panel, index 0 is the bottom layer

Notes:
- a bare array is accepted as the step list.
- "prompts" answers double-click text prompts in order; null (or running out) cancels.
- coordinates are logical pixels: natural size divided by --dpr.
"##;

#[derive(Parser, Debug)]
#[command(
    name = "snapmark",
    version,
    about = "Layered screenshot annotation editor: crop, blur, highlight, arrow and text layers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print supported commands in JSON
    Commands,
    /// Replay an editing session on an image and export the result
    Edit(EditArgs),
    /// Replay an editing session and print the resulting layer panel JSON
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Input image path
    input: PathBuf,
    /// Session script JSON path (or - for stdin)
    #[arg(long)]
    script: Option<String>,
    /// Device pixel ratio of the input bitmap
    #[arg(long, default_value_t = 1.0)]
    dpr: f64,
    /// Editor config JSON path
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print script schema and exit
    #[arg(long, action = ArgAction::SetTrue)]
    script_help: bool,
}

#[derive(Args, Debug)]
struct EditArgs {
    #[command(flatten)]
    session: SessionArgs,
    /// Output image path (default: $SNAPMARK_OUT_DIR/edited_<timestamp>.<ext>)
    output: Option<PathBuf>,
    /// Export encoding
    #[arg(long, value_enum, default_value_t = FormatArg::Png)]
    format: FormatArg,
    /// Lossy export quality in 0..1
    #[arg(long, default_value_t = 0.92)]
    quality: f32,
    /// Also write the live preview canvas (crop mask and handles included)
    #[arg(long)]
    preview_out: Option<PathBuf>,
    /// Path to write edit metadata sidecar (default: <output>.json)
    #[arg(long)]
    meta_out: Option<PathBuf>,
    /// Disable metadata sidecar output
    #[arg(long, action = ArgAction::SetTrue)]
    no_meta: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatArg {
    Png,
    Jpeg,
}

impl FormatArg {
    fn with_quality(self, quality: f32) -> ExportFormat {
        match self {
            FormatArg::Png => ExportFormat::Png,
            FormatArg::Jpeg => ExportFormat::Jpeg { quality },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct Script {
    #[serde(default)]
    prompts: Vec<Option<String>>,
    #[serde(default)]
    steps: Vec<ScriptStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum ScriptStep {
    Tool {
        #[serde(default)]
        tool: Option<LayerKind>,
    },
    Down {
        x: f64,
        y: f64,
        #[serde(default = "one")]
        clicks: u32,
    },
    Move {
        x: f64,
        y: f64,
    },
    Up,
    Drag {
        from: [f64; 2],
        to: [f64; 2],
        #[serde(default = "one")]
        steps: u32,
    },
    Escape,
    Delete,
    Undo,
    BlurRadius {
        radius: f64,
    },
    Color {
        color: String,
    },
    TextColor {
        color: String,
    },
    FontSize {
        size: f64,
    },
    Select {
        index: usize,
    },
    Reorder {
        from: usize,
        to: usize,
    },
}

fn one() -> u32 {
    1
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Commands => print_commands(),
        Commands::Edit(args) => command_edit(args),
        Commands::Inspect(args) => command_inspect(args),
    }
}

fn print_commands() -> Result<()> {
    let rows = vec![
        json!({
            "name": "edit",
            "description": "Replay a session script on an image and export the composited result.",
        }),
        json!({
            "name": "inspect",
            "description": "Replay a session script and print layers, selection and export region.",
        }),
    ];

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({ "commands": rows }))?
    );
    Ok(())
}

fn command_edit(args: EditArgs) -> Result<()> {
    if args.session.script_help {
        println!("{}", SCRIPT_HELP.trim());
        return Ok(());
    }

    let (mut editor, script) = open_session(&args.session)?;
    let events = run_script(&mut editor, script);

    let format = args.format.with_quality(args.quality);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&out_root(), format));
    let exported = editor.export();
    let encoded = export::encode(&exported, format)?;
    ensure_parent_dir(&output)?;
    fs::write(&output, encoded)
        .with_context(|| format!("failed to save output image: {}", output.display()))?;

    if let Some(preview) = &args.preview_out {
        ensure_parent_dir(preview)?;
        DynamicImage::ImageRgba8(editor.canvas().clone())
            .save(preview)
            .with_context(|| format!("failed to save preview image: {}", preview.display()))?;
    }

    if !args.no_meta {
        let meta_path = args
            .meta_out
            .clone()
            .unwrap_or_else(|| default_sidecar_for(&output));
        let preview_path = args
            .preview_out
            .as_deref()
            .map(|p| abs_path(p).display().to_string());
        let quality = match format {
            ExportFormat::Jpeg { quality } => json!(quality),
            ExportFormat::Png => Value::Null,
        };

        let payload = json!({
            "edit_meta_version": 1,
            "input_path": abs_path(&args.session.input).display().to_string(),
            "output_path": abs_path(&output).display().to_string(),
            "preview_path": preview_path,
            "meta_path": abs_path(&meta_path).display().to_string(),
            "generated_at": timestamp_iso(),
            "canvas": canvas_json(&editor, args.session.dpr),
            "export": {
                "format": format.extension(),
                "quality": quality,
                "region": editor.export_region(),
                "width": exported.width(),
                "height": exported.height(),
            },
            "layers": editor.layers(),
            "panel": editor.layer_panel(),
            "events": events,
        });

        write_json_pretty(&meta_path, &payload)?;
    }

    println!("{}", abs_path(&output).display());
    Ok(())
}

fn command_inspect(args: InspectArgs) -> Result<()> {
    if args.session.script_help {
        println!("{}", SCRIPT_HELP.trim());
        return Ok(());
    }

    let (mut editor, script) = open_session(&args.session)?;
    let events = run_script(&mut editor, script);

    let payload = json!({
        "canvas": canvas_json(&editor, args.session.dpr),
        "state": editor.interaction().name(),
        "tool": editor.tool(),
        "cursor": editor.cursor(),
        "active": editor.active_id(),
        "history": editor.history_len(),
        "export_region": editor.export_region(),
        "panel": editor.layer_panel(),
        "layers": editor.layers(),
        "events": events,
    });
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn open_session(args: &SessionArgs) -> Result<(Editor, Script)> {
    let Some(script_path) = args.script.as_deref() else {
        bail!("--script is required (use - for stdin, --script-help for the schema)");
    };
    if !args.input.exists() {
        bail!("input not found: {}", args.input.display());
    }
    if !(args.dpr.is_finite() && args.dpr > 0.0) {
        bail!("--dpr must be a positive number, got {}", args.dpr);
    }

    let config = match &args.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config: {}", path.display()))?,
        None => EditorConfig::default(),
    };
    let script = load_script(script_path)?;

    let bytes = fs::read(&args.input)
        .with_context(|| format!("failed to read input image: {}", args.input.display()))?;
    let editor = Editor::open_encoded(&bytes, args.dpr, config)
        .with_context(|| format!("failed to open input image: {}", args.input.display()))?;
    Ok((editor, script))
}

fn load_script(path: &str) -> Result<Script> {
    let raw = if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read script from stdin")?;
        buf
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read script file: {path}"))?
    };

    let value: Value = serde_json::from_str(&raw).context("invalid script JSON")?;
    match value {
        Value::Array(_) => Ok(Script {
            prompts: Vec::new(),
            steps: serde_json::from_value(value).context("invalid script steps")?,
        }),
        Value::Object(_) => serde_json::from_value(value).context("invalid script"),
        _ => bail!("script must be a list of steps or an object with 'steps'"),
    }
}

/// Replay `script` against `editor`, returning one JSON event per step.
fn run_script(editor: &mut Editor, script: Script) -> Vec<Value> {
    let mut answers: VecDeque<Option<String>> = script.prompts.into();
    let mut prompt = move |_current: &str| answers.pop_front().flatten();
    let mut events = Vec::with_capacity(script.steps.len());

    for (index, step) in script.steps.into_iter().enumerate() {
        let result = match step {
            ScriptStep::Tool { tool: Some(kind) } => {
                editor.arm_tool(kind);
                json!({"tool": kind})
            }
            ScriptStep::Tool { tool: None } => {
                editor.disarm_tool();
                json!({"tool": Value::Null})
            }
            ScriptStep::Down { x, y, clicks } => {
                let outcome = editor.pointer_down(
                    PointerDown {
                        point: Point::new(x, y),
                        clicks,
                    },
                    &mut prompt,
                );
                json!({"outcome": outcome})
            }
            ScriptStep::Move { x, y } => {
                editor.pointer_move(Point::new(x, y));
                json!({"cursor": editor.cursor()})
            }
            ScriptStep::Up => json!({"ended": editor.pointer_up()}),
            ScriptStep::Drag { from, to, steps } => {
                let outcome = editor.pointer_down(PointerDown::single(from[0], from[1]), &mut prompt);
                let steps = steps.max(1);
                for i in 1..=steps {
                    let t = f64::from(i) / f64::from(steps);
                    editor.pointer_move(Point::new(
                        from[0] + (to[0] - from[0]) * t,
                        from[1] + (to[1] - from[1]) * t,
                    ));
                }
                editor.pointer_up();
                json!({"outcome": outcome})
            }
            ScriptStep::Escape => {
                editor.escape();
                json!({})
            }
            ScriptStep::Delete => json!({"applied": editor.delete_active()}),
            ScriptStep::Undo => json!({"applied": editor.undo()}),
            ScriptStep::BlurRadius { radius } => json!({"applied": editor.set_blur_radius(radius)}),
            ScriptStep::Color { color } => json!({"applied": editor.set_stroke_color(&color)}),
            ScriptStep::TextColor { color } => json!({"applied": editor.set_text_color(&color)}),
            ScriptStep::FontSize { size } => json!({"applied": editor.set_font_size(size)}),
            ScriptStep::Select { index } => json!({"applied": editor.select_layer(index)}),
            ScriptStep::Reorder { from, to } => json!({"applied": editor.reorder_layer(from, to)}),
        };
        events.push(json!({
            "index": index,
            "result": result,
            "state": editor.interaction().name(),
            "layers": editor.layers().len(),
        }));
    }

    // A script that ends mid-gesture commits it.
    editor.pointer_up();
    events
}

fn canvas_json(editor: &Editor, dpr: f64) -> Value {
    let (width, height) = editor.canvas().dimensions();
    json!({"width": width, "height": height, "units": "px", "dpr": dpr})
}

fn default_output_path(root: &Path, format: ExportFormat) -> PathBuf {
    let candidate = root.join(export::default_file_name(Utc::now(), format));
    if !candidate.exists() {
        return candidate;
    }
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("edited")
        .to_string();
    let rand = rand::thread_rng().gen_range(1000..9999);
    root.join(format!("{stem}-{rand}.{}", format.extension()))
}

fn write_json_pretty(path: &Path, value: &Value) -> Result<()> {
    ensure_parent_dir(path)?;
    let raw = serde_json::to_string_pretty(value)?;
    fs::write(path, raw).with_context(|| format!("failed to write JSON: {}", path.display()))?;
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create parent directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn default_sidecar_for(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.json"))
}

fn out_root() -> PathBuf {
    env::var("SNAPMARK_OUT_DIR")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(".snapmark"))
}

fn abs_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(path)
}

fn timestamp_iso() -> String {
    Utc::now().to_rfc3339()
}
