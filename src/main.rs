use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use cchub::{
    commands::{self, CreateOptions},
    hub::HubItemType,
    manifest::DataItemType,
    paths::Paths,
    ui::{ColorMode, Ui},
};

/// Environment variable holding the log filter, e.g. `CCHUB_LOG=cchub=debug`
const LOG_ENV: &str = "CCHUB_LOG";

#[derive(Parser)]
#[command(name = "cchub")]
#[command(about = "Claude Code hub & profiles - link shared items into switchable profiles")]
#[command(version)]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// When to use colors: always, auto, never
    #[arg(long, global = true, value_enum, value_name = "WHEN", default_value = "auto")]
    color: ColorMode,

    /// Use this directory instead of the real home directory
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all available profiles
    List,

    /// Show the active profile and the ~/.claude link status
    Current,

    /// Show detailed information about a profile
    Inspect {
        /// Name of the profile to inspect
        name: String,
    },

    /// List items in the hub
    Hub {
        /// Only show this item type (skills, agents, hooks, rules, commands, setting-fragments)
        item_type: Option<HubItemType>,
    },

    /// Create a new profile
    Create {
        /// Name of the profile to create
        name: String,

        /// Short description stored in the manifest
        #[arg(long, short)]
        description: Option<String>,

        /// Hub item to link, as <type>/<name> (repeatable)
        #[arg(long = "item", short = 'i', value_name = "TYPE/NAME")]
        items: Vec<String>,

        /// Share this data type with other profiles (repeatable)
        #[arg(long, value_name = "DATA")]
        share: Vec<DataItemType>,

        /// Keep this data type private to the profile (repeatable)
        #[arg(long, value_name = "DATA")]
        isolate: Vec<DataItemType>,
    },

    /// Delete a profile
    Delete {
        /// Name of the profile to delete
        name: String,

        /// Delete even if it is the active profile
        #[arg(long)]
        force: bool,
    },

    /// Rename a profile
    Rename {
        old_name: String,
        new_name: String,
    },

    /// Link a hub item into a profile
    Link {
        /// Profile name
        profile: String,
        /// Item as <type>/<name>, e.g. skills/my-skill
        item: String,
    },

    /// Unlink a hub item from a profile
    Unlink {
        /// Profile name
        profile: String,
        /// Item as <type>/<name>
        item: String,
    },

    /// Switch to a profile (activate it)
    Use {
        /// Name of the profile to activate
        name: String,
    },

    /// Compare a profile's links with its manifest (defaults to the active profile)
    Drift { name: Option<String> },

    /// Repair drift (defaults to the active profile)
    Fix {
        name: Option<String>,

        /// Show what would change without touching anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Regenerate settings.json (defaults to the active profile)
    Settings {
        name: Option<String>,

        /// Print the generated document instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Rewrite a legacy manifest in the current format
    Migrate { name: String },

    /// Run diagnostics on the cchub setup
    Doctor,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli, ui: &Ui) -> anyhow::Result<()> {
    let paths = match cli.home {
        Some(home) => Paths::from_home(home),
        None => Paths::new()?,
    };

    match cli.command {
        Commands::List => commands::list(&paths, ui),
        Commands::Current => commands::current(&paths, ui),
        Commands::Inspect { name } => commands::inspect(&paths, &name, ui),
        Commands::Hub { item_type } => commands::hub(&paths, item_type, ui),
        Commands::Create {
            name,
            description,
            items,
            share,
            isolate,
        } => {
            let options = CreateOptions {
                description,
                items,
                share,
                isolate,
            };
            commands::create(&paths, &name, options, ui)
        }
        Commands::Delete { name, force } => commands::delete(&paths, &name, force, ui),
        Commands::Rename { old_name, new_name } => {
            commands::rename(&paths, &old_name, &new_name, ui)
        }
        Commands::Link { profile, item } => commands::link(&paths, &profile, &item, ui),
        Commands::Unlink { profile, item } => commands::unlink(&paths, &profile, &item, ui),
        Commands::Use { name } => commands::use_profile(&paths, &name, ui),
        Commands::Drift { name } => commands::drift(&paths, name.as_deref(), ui),
        Commands::Fix { name, dry_run } => commands::fix(&paths, name.as_deref(), dry_run, ui),
        Commands::Settings { name, dry_run } => {
            commands::settings(&paths, name.as_deref(), dry_run, ui)
        }
        Commands::Migrate { name } => commands::migrate(&paths, &name, ui),
        Commands::Doctor => commands::doctor(&paths, ui),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();
    let ui = Ui::new(cli.color, cli.no_color);

    match run(cli, &ui) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui.err(format!("{:#}", e));
            let code = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<cchub::Error>())
                .map(|err| err.exit_code())
                .unwrap_or(1);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
