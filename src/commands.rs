//! This module defines the command-line interface for the application using `clap`.
//!
//! It provides a `Cli` struct that represents the parsed command-line arguments,
//! and a `Commands` enum with the available subcommands and their options.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use repaso::commands::{Cli, Commands};
//!
//! let cli = Cli::parse();
//! if let Commands::Summary { source, copy } = cli.command {
//!     println!("{:?} {}", source.file, copy);
//! }
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::{QuestionType, StudyMode};

/// Represents the parsed command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, propagate_version = true, color = clap::ColorChoice::Always)]
pub struct Cli {
    /// Path to `config.yaml`. Defaults to the per-platform config directory.
    #[arg(long, global = true, env = "REPASO_CONFIG")]
    pub config: Option<PathBuf>,

    /// The parsed subcommand and its options.
    #[command(subcommand)]
    pub command: Commands,
}

/// Study material given on the command line.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Document to study (.pdf, .txt, .md or .docx).
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Study text given inline. Ignored when `--file` is present.
    #[arg(short, long)]
    pub text: Option<String>,

    /// Image to study alongside (or instead of) the text.
    #[arg(short, long)]
    pub image: Option<PathBuf>,

    /// Course/level the explanations are calibrated to.
    #[arg(short, long)]
    pub course: Option<String>,
}

/// Represents the available subcommands and their options.
#[derive(Subcommand, Debug)]
#[command(about, long_about = None, color = clap::ColorChoice::Always)]
pub enum Commands {
    /// Writes a default `config.yaml` and `texts.yaml`.
    Init,

    /// Prints the text extracted from a document.
    Ingest {
        file: PathBuf,
    },

    /// Interactive practice session.
    #[clap(alias = "s")]
    Study {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short = 'q', long, value_enum)]
        question_type: Option<QuestionType>,

        #[arg(short, long, value_enum)]
        mode: Option<StudyMode>,
    },

    /// Generates a single practice question.
    #[clap(alias = "q")]
    Question {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(short = 'q', long, value_enum)]
        question_type: Option<QuestionType>,

        #[arg(short, long, value_enum)]
        mode: Option<StudyMode>,
    },

    /// Summarizes the material.
    Summary {
        #[command(flatten)]
        source: SourceArgs,

        /// Copy the result to the clipboard.
        #[arg(long)]
        copy: bool,
    },

    /// Frequently asked questions about the material.
    Faq {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        copy: bool,
    },

    /// Generates and browses flashcards.
    Flashcards {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Builds a concept map and exports it as an interactive HTML page.
    Map {
        #[command(flatten)]
        source: SourceArgs,

        /// Output file. Defaults to `mapa_conceptual_interactivo.html`.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Explains a concept in more depth.
    Elaborate {
        concept: String,

        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        copy: bool,
    },

    /// Analogies for a concept.
    Analogies {
        concept: String,

        #[command(flatten)]
        source: SourceArgs,

        #[arg(long)]
        copy: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_study_with_source() {
        let cli = Cli::parse_from([
            "repaso",
            "study",
            "--file",
            "tema1.pdf",
            "--image",
            "diagrama.png",
            "-q",
            "multiple-choice",
            "--mode",
            "guided",
        ]);
        match cli.command {
            Commands::Study {
                source,
                question_type,
                mode,
            } => {
                assert_eq!(source.file, Some(PathBuf::from("tema1.pdf")));
                assert_eq!(source.image, Some(PathBuf::from("diagrama.png")));
                assert_eq!(question_type, Some(QuestionType::MultipleChoice));
                assert_eq!(mode, Some(StudyMode::Guided));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_elaborate_and_global_config() {
        let cli = Cli::parse_from([
            "repaso",
            "elaborate",
            "Mitocondria",
            "--text",
            "La mitocondria produce energía.",
            "--copy",
            "--config",
            "/tmp/config.yaml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/config.yaml")));
        match cli.command {
            Commands::Elaborate {
                concept,
                source,
                copy,
            } => {
                assert_eq!(concept, "Mitocondria");
                assert_eq!(
                    source.text.as_deref(),
                    Some("La mitocondria produce energía.")
                );
                assert!(copy);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
