//! Main module for the Repaso CLI application.
//!
//! Parses the command line, loads `config.yaml` and `texts.yaml`, records which
//! optional capabilities are available, and runs the requested command.
//!
//! # Examples
//!
//! Writing the default configuration:
//!
//! ```sh
//! repaso init
//! ```
//!
//! Practicing interactively with a PDF:
//!
//! ```sh
//! repaso study --file tema1.pdf --mode guided
//! ```
//!
//! Exporting a concept map:
//!
//! ```sh
//! repaso map --file apuntes.docx --out mapa.html
//! ```

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use once_cell::sync::OnceCell;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use repaso::capabilities::{self, CAPABILITIES};
use repaso::commands::{Cli, Commands, SourceArgs};
use repaso::config::{self, RepasoConfig};
use repaso::error::{ErrorKind, StudyError};
use repaso::ingest::{self, IngestOutcome};
use repaso::orchestrator::{CopyItem, Orchestrator};
use repaso::texts::{self, UiTexts};
use repaso::{config_dir, render, shell};

static TRACING: OnceCell<()> = OnceCell::new();

fn main() -> ExitCode {
    TRACING.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .init();
    });
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

/// Main asynchronous function of the Repaso CLI application.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded, the study material cannot be
/// read, or the requested operation fails.
async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => config_dir()?.join("config.yaml"),
    };
    let texts_path = texts_path_for(&config_path);

    debug!("Loading config from: {}", config_path.display());
    let config = config::load_or_default(&config_path)?;
    let texts = texts::load_or_default(&texts_path)?;
    if CAPABILITIES.init(capabilities::probe(&config)).is_err() {
        debug!("Capabilities were already initialized");
    }

    match cli.command {
        Commands::Init => init(&config_path, &texts_path)?,
        Commands::Ingest { file } => {
            let outcome = IngestOutcome::from(ingest::ingest_file(&file, &CAPABILITIES).await);
            match outcome.error {
                Some(message) => return Err(message.into()),
                None => println!("{}", outcome.text),
            }
        }
        Commands::Study {
            source,
            question_type,
            mode,
        } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            if let Some(question_type) = question_type {
                orch.set_question_type(question_type);
            }
            if let Some(mode) = mode {
                orch.set_study_mode(mode);
            }
            shell::run(&mut orch).await?;
        }
        Commands::Question {
            source,
            question_type,
            mode,
        } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            if let Some(question_type) = question_type {
                orch.set_question_type(question_type);
            }
            if let Some(mode) = mode {
                orch.set_study_mode(mode);
            }
            let result =
                render::with_spinner("Generando pregunta...", orch.generate_question()).await;
            finish(&mut orch, result)?;
            render::write_practice(&mut std::io::stdout(), orch.practice(), orch.texts())?;
        }
        Commands::Summary { source, copy } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result = render::with_spinner("Resumiendo...", orch.generate_summary()).await;
            finish(&mut orch, result)?;
            render::print_markdown(&orch.texts().summary_title, orch.summary())?;
            copy_if(&mut orch, copy, CopyItem::Summary)?;
        }
        Commands::Faq { source, copy } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result = render::with_spinner("Generando FAQs...", orch.generate_faq()).await;
            finish(&mut orch, result)?;
            render::print_markdown(&orch.texts().faq_title, orch.faq())?;
            copy_if(&mut orch, copy, CopyItem::Faq)?;
        }
        Commands::Flashcards { source } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result =
                render::with_spinner("Generando flashcards...", orch.generate_flashcards()).await;
            finish(&mut orch, result)?;
            shell::browse_flashcards(&mut orch)?;
        }
        Commands::Map { source, out } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result = render::with_spinner(
                "Construyendo mapa conceptual...",
                orch.generate_semantic_map(),
            )
            .await;
            finish(&mut orch, result)?;
            let result = orch.export_semantic_map(out.as_deref()).await.map(|_| ());
            finish(&mut orch, result)?;
        }
        Commands::Elaborate {
            concept,
            source,
            copy,
        } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result =
                render::with_spinner("Ampliando explicación...", orch.elaborate(concept)).await;
            finish(&mut orch, result)?;
            render::print_markdown(&orch.texts().elaboration_title, orch.elaboration())?;
            copy_if(&mut orch, copy, CopyItem::Elaboration)?;
        }
        Commands::Analogies {
            concept,
            source,
            copy,
        } => {
            let mut orch = connect(config, texts)?;
            load_source(&mut orch, &source).await?;
            let result =
                render::with_spinner("Buscando analogías...", orch.analogies_for(concept)).await;
            finish(&mut orch, result)?;
            render::print_markdown(&orch.texts().analogies_title, orch.analogies())?;
            copy_if(&mut orch, copy, CopyItem::Analogies)?;
        }
    }

    Ok(())
}

/// `texts.yaml` lives next to `config.yaml`.
fn texts_path_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join("texts.yaml"))
        .unwrap_or_else(|| PathBuf::from("texts.yaml"))
}

/// Builds the orchestrator, taking over the screen when the credential is missing.
fn connect(config: RepasoConfig, texts: UiTexts) -> Result<Orchestrator, Box<dyn Error>> {
    let fallback_texts = texts.clone();
    match Orchestrator::connect(config, texts, &CAPABILITIES) {
        Ok(orch) => Ok(orch),
        Err(err) => {
            if err.kind() == ErrorKind::Configuration {
                render::configuration_error_screen(&fallback_texts, &err.to_string())?;
            }
            Err(err.into())
        }
    }
}

/// Loads the study material and course given on the command line.
async fn load_source(orch: &mut Orchestrator, source: &SourceArgs) -> Result<(), Box<dyn Error>> {
    if let Some(course) = &source.course {
        orch.set_course(Some(course.clone()));
    }
    if let Some(file) = &source.file {
        let result = orch.load_document(file).await;
        finish(orch, result)?;
    } else if let Some(text) = &source.text {
        orch.set_text(text.clone());
    }
    if let Some(image) = &source.image {
        let result = orch.load_image(image).await;
        finish(orch, result)?;
    }
    Ok(())
}

/// Prints pending notices and forwards the outcome.
fn finish<T>(orch: &mut Orchestrator, result: Result<T, StudyError>) -> Result<T, Box<dyn Error>> {
    render::print_notices(&orch.drain_notices())?;
    result.map_err(Into::into)
}

fn copy_if(orch: &mut Orchestrator, copy: bool, item: CopyItem) -> Result<(), Box<dyn Error>> {
    if copy {
        orch.copy(item);
        render::print_notices(&orch.drain_notices())?;
    }
    Ok(())
}

/// Writes the default `config.yaml` and `texts.yaml`, leaving existing files alone.
///
/// # Errors
///
/// Returns an error if the directory or files cannot be created.
fn init(config_path: &Path, texts_path: &Path) -> Result<(), Box<dyn Error>> {
    if config_path.exists() {
        info!("Keeping existing config: {}", config_path.display());
    } else {
        config::write_default_config(config_path)?;
    }

    if texts_path.exists() {
        info!("Keeping existing texts: {}", texts_path.display());
    } else {
        if let Some(parent) = texts_path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!("Creating texts file: {}", texts_path.display());
        fs::write(texts_path, serde_yaml::to_string(&UiTexts::default())?)?;
    }

    println!("Configuración en {}", config_path.display());
    Ok(())
}
