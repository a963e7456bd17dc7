//! # Repaso (library root)
//!
//! Core plumbing for the **Repaso** study assistant: a CLI that turns study material
//! (pasted text, `.txt`/`.md`/`.pdf`/`.docx` documents, an image) into practice
//! questions, graded answers, summaries, FAQs, flashcards, analogies and concept maps,
//! using Google's Gemini `generateContent` API.
//!
//! ## Layers
//! - Material: [`ingest`] extracts document text, [`capabilities`] records which
//!   optional extractors are available.
//! - AI access: [`prompt`] builds the Spanish instructions, [`gemini`] is the HTTP
//!   transport, [`gateway`] maps finish reasons to errors and decodes structured
//!   replies, [`verdict`] grades evaluations.
//! - Session: [`orchestrator`] owns all session state and posts [`notice`]s.
//! - Surfaces: [`commands`] (clap), [`shell`] (interactive loop), [`render`]
//!   (terminal output), [`clipboard`], [`export`] (standalone HTML concept map).
//! - Ambient: [`config`], [`texts`], [`error`], [`models`].
//!
//! ## Configuration layout
//! Both files live in the per-platform config directory ([`config_dir`]):
//!
//! - Linux (XDG): `~/.config/repaso/config.yaml` and `texts.yaml`
//! - macOS: `~/Library/Application Support/com.repaso.repaso/`
//! - Windows: `C:\Users\<you>\AppData\Roaming\repaso\repaso\config\`
//!
//! `repaso init` writes both with their defaults. The API key may instead come from
//! `GEMINI_API_KEY` or `API_KEY`.

use directories::ProjectDirs;
use std::error::Error;
use std::path::PathBuf;

pub mod capabilities;
pub mod clipboard;
pub mod commands;
pub mod config;
pub mod error;
pub mod export;
pub mod gateway;
pub mod gemini;
pub mod ingest;
pub mod models;
pub mod notice;
pub mod orchestrator;
pub mod prompt;
pub mod render;
pub mod shell;
pub mod texts;
pub mod verdict;

/// Retrieves the configuration directory for the application.
///
/// # Errors
///
/// Returns an error if the platform has no home directory to derive it from.
pub fn config_dir() -> Result<PathBuf, Box<dyn Error>> {
    let proj_dirs = ProjectDirs::from("com", "repaso", "repaso")
        .ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_app_name() {
        // Only meaningful where a home directory exists.
        if let Ok(dir) = config_dir() {
            assert!(dir.to_string_lossy().contains("repaso"));
        }
    }
}
