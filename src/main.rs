use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};
use simplelog::{Config, LevelFilter, WriteLogger};

use bookpreview::panic_handler::initialize_panic_handler;
use bookpreview::pdf::is_valid_scale;
use bookpreview::session::{ProjectMetadata, SessionStore};
use bookpreview::settings::{Settings, load_settings};
use bookpreview::shell::{ShellAction, ShellOutcome, ShellView, SlotView, dispatch};
use bookpreview::{EngineProvider, Entry, Navigation, PreviewError, PreviewSession, enter_preview};

#[derive(Parser)]
#[command(name = "bookpreview", version, about = "Preview a book PDF two pages at a time")]
struct Cli {
    /// Settings file (defaults to the per-user config file)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session store shared by upload and preview
    #[arg(long, global = true)]
    session: Option<PathBuf>,

    #[arg(long, global = true, default_value = "bookpreview.log")]
    log_file: PathBuf,

    #[arg(long, global = true, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a PDF for preview
    Upload {
        pdf: PathBuf,
        /// JSON file with the project's form data
        #[arg(long)]
        project: Option<PathBuf>,
    },
    /// Page through the stored PDF
    Preview {
        /// Override the zoom applied to pages
        #[arg(long, value_parser = parse_scale)]
        scale: Option<f32>,
        /// Write the visible spread as PNG files into this directory
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Forget the stored PDF
    Clear,
}

fn parse_scale(value: &str) -> Result<f32, String> {
    let scale: f32 = value.parse().map_err(|e| format!("{e}"))?;
    if is_valid_scale(scale) {
        Ok(scale)
    } else {
        Err(format!("{value} is not a positive zoom"))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    WriteLogger::init(cli.log_level, Config::default(), File::create(&cli.log_file)?)?;
    initialize_panic_handler();
    info!("Starting bookpreview");

    let settings = load_settings(cli.config.as_deref());
    let session_path = cli.session.clone().unwrap_or_else(|| settings.session_path());
    let mut store = SessionStore::load_from_file(&session_path)?;

    let result = match cli.command {
        Commands::Upload { pdf, project } => upload(&mut store, &pdf, project.as_deref()),
        Commands::Preview { scale, export } => preview(&store, &settings, scale, export.as_deref()),
        Commands::Clear => store.clear(),
    };

    if let Err(err) = &result {
        error!("Application error: {err:?}");
    }
    info!("Shutting down bookpreview");
    result
}

fn upload(store: &mut SessionStore, pdf: &Path, project: Option<&Path>) -> Result<()> {
    let bytes = fs::read(pdf).with_context(|| format!("reading {}", pdf.display()))?;
    let project = project
        .map(|path| -> Result<ProjectMetadata> {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            Ok(serde_json::from_str(&json)?)
        })
        .transpose()?;

    store.store_document(&bytes, project.as_ref())?;
    info!("Stored {} ({} bytes) for preview", pdf.display(), bytes.len());
    println!("Stored {} for preview.", pdf.display());
    Ok(())
}

fn preview(
    store: &SessionStore,
    settings: &Settings,
    scale: Option<f32>,
    export: Option<&Path>,
) -> Result<()> {
    let mut config = settings.preview_config();
    if let Some(scale) = scale {
        config.scale = scale;
    }
    let provider = engine_provider();

    let mut session = match enter_preview(store, &provider, config) {
        Ok(Entry::Ready(session)) => session,
        Ok(Entry::Redirect { route, message }) => {
            println!("{message}");
            println!("-> {}", route.path());
            return Ok(());
        }
        Err(err) => {
            print!("{}", ShellView::failed(&err));
            return Err(err.into());
        }
    };

    settle(&mut session)?;
    run_shell(&mut session, export)
}

#[cfg(feature = "pdf")]
fn engine_provider() -> EngineProvider {
    EngineProvider::mupdf()
}

#[cfg(not(feature = "pdf"))]
fn engine_provider() -> EngineProvider {
    EngineProvider::new(|| {
        Err(bookpreview::pdf::EngineFault::generic(
            "built without the `pdf` feature",
        ))
    })
}

/// Wait for the pending spread and report per-page failures
fn settle(session: &mut PreviewSession) -> Result<()> {
    match session.previewer.wait() {
        Ok(()) => {}
        Err(err @ PreviewError::Timeout(_)) => println!("{}", err.user_message()),
        Err(err) => return Err(err.into()),
    }
    for err in session.previewer.take_page_errors() {
        println!("{}", err.user_message());
    }
    Ok(())
}

fn run_shell(session: &mut PreviewSession, export: Option<&Path>) -> Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let view = ShellView::from_previewer(&session.previewer);
        print!("{view}");
        if let Some(dir) = export {
            export_spread(&view, dir)?;
        }
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            return Ok(());
        };
        let action = match line.trim() {
            "p" | "prev" | "previous" => ShellAction::Previous,
            "n" | "next" => ShellAction::Next,
            "s" | "submit" => ShellAction::Submit,
            "q" | "quit" => return Ok(()),
            "" => continue,
            other => {
                println!("Unknown command {other:?}: use n, p, s or q");
                continue;
            }
        };

        match dispatch(session, action) {
            ShellOutcome::Leave(route) => {
                println!("-> {}", route.path());
                return Ok(());
            }
            ShellOutcome::Navigated(Navigation::Started(window)) => {
                info!("Navigating to {window}");
                settle(session)?;
            }
            ShellOutcome::Navigated(Navigation::Busy) => {
                warn!("Navigation ignored while rendering");
                settle(session)?;
            }
            ShellOutcome::Navigated(Navigation::Ignored) => {}
        }
    }
}

fn export_spread(view: &ShellView, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for slot in &view.slots {
        if let SlotView::Page(page) = slot {
            let path = dir.join(format!("page-{:04}.png", page.page));
            fs::write(&path, &page.png).with_context(|| format!("writing {}", path.display()))?;
        }
    }
    Ok(())
}
