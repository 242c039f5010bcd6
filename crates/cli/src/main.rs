//! Command-line interface for editing text entries of ZIP archives.
//!
//! Lists an archive's entries, prints or replaces one entry's text, or opens
//! it in `$VISUAL`/`$EDITOR` and writes the result back.

use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};
use zipedit::commands::{self, user_message};
use zipedit::scratch::{find_leftovers, remove_leftovers};
use zipedit::{ArchiveSlot, ContentPipeline, EntrySession, SessionError, Settings};

#[derive(Parser)]
#[command(name = "zipedit")]
#[command(version, about = "Edit text files inside ZIP archives", long_about = None)]
struct Cli {
    /// Settings file (defaults to <config dir>/zipedit/settings.json)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the file entries of an archive
    List {
        /// Archive file
        archive: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the text of an entry
    Show {
        /// Archive file
        archive: PathBuf,

        /// Entry path inside the archive
        entry: String,

        /// Password for encrypted entries
        #[arg(long)]
        password: Option<String>,
    },

    /// Replace the text of an entry
    Update {
        /// Archive file
        archive: PathBuf,

        /// Entry path inside the archive
        entry: String,

        /// Read the new text from this file instead of stdin
        #[arg(long)]
        file: Option<PathBuf>,

        /// Password for encrypted entries
        #[arg(long)]
        password: Option<String>,
    },

    /// Open an entry in $VISUAL or $EDITOR and save it back
    Edit {
        /// Archive file
        archive: PathBuf,

        /// Entry path inside the archive
        entry: String,

        /// Password for encrypted entries
        #[arg(long)]
        password: Option<String>,
    },

    /// Remove scratch directories left behind by earlier runs
    Clean,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.as_deref()).await;
    report_leftovers(&settings.scratch_root());

    let result = match cli.command {
        Commands::List { archive, json } => handle_list(&settings, archive, json).await,
        Commands::Show {
            archive,
            entry,
            password,
        } => handle_show(&settings, archive, entry, password).await,
        Commands::Update {
            archive,
            entry,
            file,
            password,
        } => handle_update(&settings, archive, entry, file, password).await,
        Commands::Edit {
            archive,
            entry,
            password,
        } => handle_edit(&settings, archive, entry, password).await,
        Commands::Clean => handle_clean(&settings),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path.map(Path::to_path_buf).or_else(zipedit::settings_path) {
        Some(path) => path,
        None => return Settings::default(),
    };

    match zipedit::load_settings(&path).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not read settings, using defaults");
            Settings::default()
        }
    }
}

/// Log scratch directories an earlier run failed to remove.
fn report_leftovers(scratch_root: &Path) {
    let leftovers = match find_leftovers(scratch_root) {
        Ok(leftovers) => leftovers,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!(root = %scratch_root.display(), error = %e, "Could not scan for leftover scratch directories");
            return;
        }
    };

    for leftover in &leftovers {
        let age = leftover
            .modified
            .and_then(|m| SystemTime::now().duration_since(m).ok())
            .map(|d| format!("{}s", d.as_secs()))
            .unwrap_or_else(|| "unknown".to_string());
        info!(path = %leftover.path.display(), age = %age, "Leftover scratch directory");
    }
    if !leftovers.is_empty() {
        info!(count = leftovers.len(), "Run `zipedit clean` to remove leftover scratch directories");
    }
}

/// Pipeline with `archive` registered as the open archive.
fn open_pipeline(settings: &Settings, archive: PathBuf) -> Result<ContentPipeline, String> {
    let pipeline = ContentPipeline::from_settings(settings, Arc::new(ArchiveSlot::new()));
    commands::open_archive(&pipeline, archive.to_string_lossy().into_owned())?;
    Ok(pipeline)
}

async fn handle_list(settings: &Settings, archive: PathBuf, json: bool) -> Result<(), String> {
    // Listing itself never fails, so report an unreadable file here
    tokio::fs::metadata(&archive)
        .await
        .map_err(|e| format!("Cannot read {}: {}", archive.display(), e))?;

    let pipeline = open_pipeline(settings, archive)?;
    let entries = commands::list_zip_entries(&pipeline).await;

    if json {
        let out = serde_json::to_string_pretty(&entries)
            .map_err(|e| format!("Failed to serialize entries: {}", e))?;
        println!("{}", out);
        return Ok(());
    }

    for entry in &entries {
        let editable = if pipeline.is_editable(&entry.path) { "*" } else { " " };
        let locked = if entry.is_encrypted { " [encrypted]" } else { "" };
        println!("{} {}{}", editable, entry.path, locked);
    }
    println!("{} entries (* = editable)", entries.len());
    Ok(())
}

async fn handle_show(
    settings: &Settings,
    archive: PathBuf,
    entry: String,
    password: Option<String>,
) -> Result<(), String> {
    let pipeline = open_pipeline(settings, archive)?;
    let text = commands::get_file_content(&pipeline, entry, password).await?;

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.flush())
        .map_err(|e| format!("Failed to write output: {}", e))
}

async fn handle_update(
    settings: &Settings,
    archive: PathBuf,
    entry: String,
    file: Option<PathBuf>,
    password: Option<String>,
) -> Result<(), String> {
    let text = match file {
        Some(path) => tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?,
        None => {
            let mut text = String::new();
            tokio::io::stdin()
                .read_to_string(&mut text)
                .await
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            text
        }
    };

    let pipeline = open_pipeline(settings, archive)?;
    commands::update_file_content(&pipeline, entry.clone(), text, password).await?;
    println!("Updated {}", entry);
    Ok(())
}

async fn handle_edit(
    settings: &Settings,
    archive: PathBuf,
    entry: String,
    password: Option<String>,
) -> Result<(), String> {
    let pipeline = open_pipeline(settings, archive)?;
    let mut session = EntrySession::new(entry.clone(), password);
    let original = session
        .open(&pipeline)
        .await
        .map_err(|e| session_message(&e))?
        .to_string();

    // Keep the entry's extension so the editor picks a sensible mode
    let suffix = Path::new(&entry)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let mut draft = tempfile::Builder::new()
        .prefix("zipedit-draft-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|e| format!("Failed to create draft file: {}", e))?;
    draft
        .write_all(original.as_bytes())
        .and_then(|_| draft.flush())
        .map_err(|e| format!("Failed to write draft file: {}", e))?;

    run_editor(draft.path()).await?;

    let edited = tokio::fs::read_to_string(draft.path())
        .await
        .map_err(|e| format!("Failed to read draft file: {}", e))?;
    if edited == original {
        println!("No changes to {}", entry);
        return Ok(());
    }

    session.edit(edited).map_err(|e| session_message(&e))?;
    if let Err(e) = session.save(&pipeline).await {
        let message = session_message(&e);
        return match draft.keep() {
            Ok((_, path)) => Err(format!("{}\nDraft kept at {}", message, path.display())),
            Err(keep_err) => Err(format!("{}\nDraft could not be kept: {}", message, keep_err)),
        };
    }

    println!("Updated {}", entry);
    Ok(())
}

fn handle_clean(settings: &Settings) -> Result<(), String> {
    let root = settings.scratch_root();
    let removed = remove_leftovers(&root)
        .map_err(|e| format!("Failed to scan {}: {}", root.display(), e))?;
    println!("Removed {} leftover scratch director{}", removed, if removed == 1 { "y" } else { "ies" });
    Ok(())
}

/// `$VISUAL`, then `$EDITOR`, then `vi`. The variable may carry arguments.
async fn run_editor(path: &Path) -> Result<(), String> {
    let editor = ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string());

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi");

    let status = tokio::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .await
        .map_err(|e| format!("Failed to start editor '{}': {}", program, e))?;

    if !status.success() {
        return Err(format!("Editor '{}' exited with {}", program, status));
    }
    Ok(())
}

fn session_message(err: &SessionError) -> String {
    match err {
        SessionError::Pipeline(e) => user_message(e),
        other => other.to_string(),
    }
}
