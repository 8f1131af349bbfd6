//! Clap derive structures for the `geekmagic` CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// geekmagic -- control GeekMagic / SmallTV picture frames
#[derive(Debug, Parser)]
#[command(
    name = "geekmagic",
    version,
    about = "Control GeekMagic / SmallTV picture-frame devices",
    long_about = "Query and drive GeekMagic / SmallTV WiFi picture frames over their\n\
        local HTTP API: themes, brightness, photo album, custom firmware screens,\n\
        and image delivery to several devices at once.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configured device to use
    #[arg(long, short = 'd', env = "GEEKMAGIC_DEVICE", global = true)]
    pub device: Option<String>,

    /// Device address (overrides --device)
    #[arg(long, short = 'H', env = "GEEKMAGIC_HOST", global = true)]
    pub host: Option<String>,

    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "GEEKMAGIC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "GEEKMAGIC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the device once and show its state
    #[command(alias = "st")]
    Status,

    /// Poll every configured device and print changes until Ctrl-C
    Watch(WatchArgs),

    /// Switch the display theme by id or name
    Theme {
        /// Theme id (e.g. 3) or catalogue name (e.g. "Photo Album")
        theme: String,
    },

    /// Set backlight brightness (0-100)
    #[command(alias = "brt")]
    Brightness {
        #[arg(allow_negative_numbers = true)]
        value: i64,
    },

    /// Manage images stored on the device
    #[command(alias = "img")]
    Images(ImagesArgs),

    /// Show a message screen (custom firmware)
    Message {
        text: String,
        /// Message title
        #[arg(long, short = 's', default_value = "")]
        subject: String,
        /// Firmware style keyword
        #[arg(long, default_value = "")]
        style: String,
        /// Seconds before returning to the previous screen
        #[arg(long, short = 't')]
        timeout: Option<u32>,
    },

    /// Show a countdown screen (custom firmware)
    Countdown {
        /// Target date/time, in the format the firmware accepts
        datetime: String,
        #[arg(long, short = 's', default_value = "")]
        subject: String,
        #[arg(long, short = 't')]
        timeout: Option<u32>,
    },

    /// Show a note screen (custom firmware)
    Note {
        text: String,
        /// Scroll speed
        #[arg(long)]
        rpm: Option<u32>,
        /// Show even if another screen is active
        #[arg(long)]
        force: bool,
        #[arg(long, short = 't')]
        timeout: Option<u32>,
    },

    /// Upload a JPEG to devices and show it
    SendImage(SendImageArgs),

    /// Render HTML to an image and show it on devices
    SendHtml(SendHtmlArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Override every device's polling interval (e.g. "10s", "2m")
    #[arg(long, short = 'i', value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,
}

// ── Images ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ImagesArgs {
    #[command(subcommand)]
    pub command: ImagesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ImagesCommand {
    /// List stored images
    #[command(alias = "ls")]
    List {
        /// List the small weather-theme images (/gif) instead
        #[arg(long)]
        small: bool,
    },

    /// Show an image from /image
    Set {
        file: String,
        /// Seconds to show the image
        #[arg(long, short = 't')]
        timeout: Option<u32>,
        /// Do not switch to the photo-album theme
        #[arg(long)]
        no_switch: bool,
    },

    /// Show a small image from /gif (SmallTV firmware)
    Small { file: String },

    /// Delete an image from /image
    #[command(alias = "rm")]
    Delete { file: String },

    /// Upload a local file into /image
    Upload {
        path: PathBuf,
        /// Name on the device (defaults to the local file name)
        #[arg(long)]
        name: Option<String>,
    },
}

// ── Batch delivery ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendImageArgs {
    /// Local JPEG file or http(s) URL
    pub source: String,

    /// Target devices (repeatable; defaults to every configured device)
    #[arg(long = "to", short = 't')]
    pub targets: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SendHtmlArgs {
    /// File with the HTML to render
    pub file: PathBuf,

    /// Target devices (repeatable; defaults to every configured device)
    #[arg(long = "to", short = 't')]
    pub targets: Vec<String>,

    /// Render service URL (defaults to the first target's render_url)
    #[arg(long)]
    pub render_url: Option<String>,
}

// ── Config & completions ─────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path
    Path,
    /// Print the effective configuration
    Show,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    pub shell: Shell,
}
