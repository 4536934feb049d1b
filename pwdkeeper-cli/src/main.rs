//! pwdkeeper CLI
//!
//! Command-line shell for encrypted pwdkeeper documents.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pwdkeeper_core::{DropPosition, GeneratorOptions, PasteMode};

mod commands;
mod output;
mod settings;

use commands::Session;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "pwdkeeper")]
#[command(about = "pwdkeeper - hierarchical password and notes keeper")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Document to operate on (defaults to the configured defaultDocument)
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Document passphrase; empty means plain XML
    #[arg(long, global = true, env = "PWDKEEPER_PASSPHRASE", default_value = "", hide_env_values = true)]
    passphrase: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty document
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the record tree
    #[command(alias = "ls")]
    Tree,
    /// Show one record
    Show {
        /// Record ID (full UUID, prefix, or / for the root)
        id: String,
        /// Print hidden field values in clear text
        #[arg(long)]
        reveal: bool,
    },
    /// Search record names
    Search {
        /// Case-insensitive substring; empty shows the whole tree
        query: String,
        /// Match card field values instead of names
        #[arg(long)]
        fields: bool,
    },
    /// Add a record
    Add {
        #[command(subcommand)]
        command: AddCommands,
    },
    /// Move a record
    Mv {
        id: String,
        target: String,
        #[arg(short, long, value_enum)]
        position: Option<PositionArg>,
    },
    /// Copy a record and its subtree
    Cp {
        id: String,
        target: String,
        #[arg(short, long, value_enum)]
        position: Option<PositionArg>,
    },
    /// Place a link to a record
    Ln {
        id: String,
        target: String,
        #[arg(short, long, value_enum)]
        position: Option<PositionArg>,
    },
    /// Remove a record, its subtree, and links pointing into it
    Rm { id: String },
    /// Expand or collapse a category
    Expand {
        id: String,
        #[arg(long)]
        collapse: bool,
    },
    /// Build a new document from a legacy wallet text export
    ImportLegacy {
        source: PathBuf,
        #[arg(long)]
        force: bool,
    },
    /// Write the decrypted XML document
    ExportXml {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Change the document passphrase
    Passwd {
        #[arg(env = "PWDKEEPER_NEW_PASSPHRASE", hide_env_values = true)]
        new_passphrase: String,
    },
    /// Generate a random password
    Generate {
        #[arg(short, long, default_value_t = 16)]
        length: usize,
        #[arg(long)]
        no_upper: bool,
        #[arg(long)]
        no_lower: bool,
        #[arg(long)]
        no_digits: bool,
        #[arg(long)]
        no_symbols: bool,
    },
    /// Show or set preferences
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum AddCommands {
    /// Add a category
    Category {
        name: String,
        #[arg(short, long)]
        parent: Option<String>,
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(long)]
        picture: Option<String>,
    },
    /// Add a card; fields are NAME=VALUE or NAME:TYPE=VALUE
    Card {
        name: String,
        #[arg(short, long)]
        parent: Option<String>,
        #[arg(short, long)]
        kind: Option<String>,
        #[arg(long)]
        picture: Option<String>,
        #[arg(short = 'F', long = "field")]
        fields: Vec<String>,
        #[arg(short, long)]
        note: Option<String>,
    },
    /// Add a free-text note
    Note {
        name: String,
        #[arg(short, long)]
        parent: Option<String>,
        #[arg(short, long, default_value = "")]
        text: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current settings
    Show,
    /// Set a settings value
    Set { key: String, value: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum PositionArg {
    Into,
    Above,
    Below,
}

impl From<PositionArg> for DropPosition {
    fn from(arg: PositionArg) -> Self {
        match arg {
            PositionArg::Into => DropPosition::Into,
            PositionArg::Above => DropPosition::Above,
            PositionArg::Below => DropPosition::Below,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pwdkeeper_core={level},pwdkeeper={level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let settings_path = settings::settings_file_path();

    // Commands that need no document
    match &cli.command {
        Commands::Config { command } => {
            return match command {
                Some(ConfigCommands::Set { key, value }) => {
                    commands::config::set(key, value, &settings_path, &output)
                }
                Some(ConfigCommands::Show) | None => commands::config::show(&settings_path, &output),
            };
        }
        Commands::Generate {
            length,
            no_upper,
            no_lower,
            no_digits,
            no_symbols,
        } => {
            let options = GeneratorOptions {
                upper_case: !no_upper,
                lower_case: !no_lower,
                digits: !no_digits,
                symbols: !no_symbols,
                length: *length,
            };
            return commands::records::generate_password(&options, &output);
        }
        _ => {}
    }

    let settings = settings::load_settings(&settings_path);
    let Some(path) = cli.file.or(settings.default_document) else {
        bail!("No document given. Pass --file or run `pwdkeeper config set defaultDocument <path>`.");
    };
    tracing::debug!(path = %path.display(), kdf = settings.kdf_profile.as_str(), "using document");
    let session = Session {
        path,
        passphrase: cli.passphrase,
        kdf: settings.kdf_profile.params(),
    };

    match cli.command {
        Commands::Init { force } => commands::document::init(&session, force, &output),
        Commands::Tree => commands::records::tree(&session, &output),
        Commands::Show { id, reveal } => commands::records::show(&session, &id, reveal, &output),
        Commands::Search { query, fields } => {
            commands::records::find(&session, &query, fields, &output)
        }
        Commands::Add { command } => handle_add_command(command, &session, &output),
        Commands::Mv { id, target, position } => commands::records::place(
            &session,
            &id,
            &target,
            PasteMode::Cut,
            position.map(Into::into),
            &output,
        ),
        Commands::Cp { id, target, position } => commands::records::place(
            &session,
            &id,
            &target,
            PasteMode::Copy,
            position.map(Into::into),
            &output,
        ),
        Commands::Ln { id, target, position } => commands::records::place(
            &session,
            &id,
            &target,
            PasteMode::Link,
            position.map(Into::into),
            &output,
        ),
        Commands::Rm { id } => commands::records::remove(&session, &id, &output),
        Commands::Expand { id, collapse } => {
            commands::records::expand(&session, &id, !collapse, &output)
        }
        Commands::ImportLegacy { source, force } => {
            commands::document::import_legacy(&session, &source, force, &output)
        }
        Commands::ExportXml { output: target } => {
            commands::document::export_xml(&session, target.as_deref(), &output)
        }
        Commands::Passwd { new_passphrase } => {
            commands::document::passwd(&session, &new_passphrase, &output)
        }
        Commands::Config { .. } | Commands::Generate { .. } => unreachable!(), // Handled above
    }
}

fn handle_add_command(command: AddCommands, session: &Session, output: &Output) -> Result<()> {
    match command {
        AddCommands::Category {
            name,
            parent,
            kind,
            picture,
        } => commands::records::add_category(
            session,
            &name,
            parent.as_deref(),
            kind.as_deref(),
            picture.as_deref(),
            output,
        ),
        AddCommands::Card {
            name,
            parent,
            kind,
            picture,
            fields,
            note,
        } => commands::records::add_card(
            session,
            &name,
            parent.as_deref(),
            kind.as_deref(),
            picture.as_deref(),
            &fields,
            note.as_deref(),
            output,
        ),
        AddCommands::Note { name, parent, text } => {
            commands::records::add_note(session, &name, parent.as_deref(), &text, output)
        }
    }
}
