use anima_core::AnimaConfig;
use anima_directive::ParseOptions;
use anima_memory::{seed_workspace, FsStore, PersonaPipeline};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

mod logging;

#[derive(Parser, Debug)]
#[command(name = "anima", author, version, about = "Persona directive pipeline", long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "ANIMA_CONFIG", default_value = "anima.toml")]
    config: PathBuf,

    /// Directory holding the persisted state documents
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// Directory the canvas snapshot is written to
    #[arg(long)]
    canvas_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse assistant text, apply its directives and refresh the canvas
    Process {
        /// Id of the message being answered
        #[arg(long)]
        message_id: Option<String>,

        /// Print the full parse result as JSON instead of the cleaned text
        #[arg(long)]
        json: bool,

        /// Text to process; read from stdin when omitted
        text: Option<String>,
    },
    /// Parse only and print the result as JSON; no state is touched
    Parse {
        #[arg(long)]
        message_id: Option<String>,

        text: Option<String>,
    },
    /// Create the emotion, presence and rooms documents
    Init {
        /// Overwrite documents that already exist
        #[arg(long)]
        force: bool,
    },
    /// Rebuild the canvas snapshot from the current documents
    Snapshot,
}

fn read_text(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(t) => Ok(t),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read text from stdin")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // Logging depends on the config, so a fallback is only reported once it is up.
    let (mut config, fallback) = AnimaConfig::try_load_or_default(&args.config);
    if let Some(dir) = args.workspace {
        config.workspace.root = dir;
    }
    if let Some(dir) = args.canvas_root {
        config.canvas.root = dir;
    }

    let _log_guard = logging::init(&config.logging);
    if let Some(e) = fallback {
        info!("Config file not found or invalid ({}), using defaults", e);
    }

    match args.command {
        Command::Process {
            message_id,
            json,
            text,
        } => {
            let text = read_text(text)?;
            let pipeline = Arc::new(PersonaPipeline::from_config(&config));
            let (parsed, handle) = pipeline.spawn(&text, message_id.as_deref());

            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                println!("{}", parsed.cleaned_text);
            }

            let report = handle.await.context("Pipeline task failed")?;
            info!("{}", report);
        }
        Command::Parse { message_id, text } => {
            let text = read_text(text)?;
            let mut options = ParseOptions::from(&config.parser);
            if let Some(id) = message_id {
                options = options.with_message_id(id);
            }
            let parsed = anima_directive::parse(&text, &options);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Command::Init { force } => {
            let store = FsStore::new(config.workspace.root.clone());
            let written = seed_workspace(&store, &config.workspace, force)
                .await
                .context("Failed to seed workspace")?;
            if written.is_empty() {
                println!(
                    "Workspace {} already initialised (use --force to overwrite)",
                    config.workspace.root.display()
                );
            }
            for path in written {
                println!("{}", config.workspace.root.join(path).display());
            }
        }
        Command::Snapshot => {
            let pipeline = PersonaPipeline::from_config(&config);
            let path = config.canvas.root.join(&config.canvas.file);
            if pipeline.aggregator().refresh(&[]).await {
                println!("{}", path.display());
            } else {
                anyhow::bail!("Failed to write canvas snapshot to {}", path.display());
            }
        }
    }

    Ok(())
}
