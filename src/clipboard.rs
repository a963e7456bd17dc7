//! Clipboard export.
//!
//! Copying tries the native clipboard first ([`ArboardTarget`]). If that fails the
//! text is written to a temporary file and piped into the platform's copy command
//! ([`CommandFallback`]); the temporary file is removed whatever the outcome.

use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::notice::Notice;
use crate::texts::{UiTexts, fill};

/// A place text can be copied to.
pub trait CopyTarget: Send {
    fn copy(&mut self, text: &str) -> Result<(), String>;
}

/// The system clipboard through `arboard`.
#[derive(Debug, Default)]
pub struct ArboardTarget;

impl CopyTarget for ArboardTarget {
    fn copy(&mut self, text: &str) -> Result<(), String> {
        let mut clipboard = arboard::Clipboard::new().map_err(|e| e.to_string())?;
        clipboard.set_text(text.to_string()).map_err(|e| e.to_string())
    }
}

/// Pipes the text into `pbcopy`, `clip`, `wl-copy` or `xclip`.
#[derive(Debug, Default)]
pub struct CommandFallback;

impl CommandFallback {
    fn command() -> (&'static str, Vec<&'static str>) {
        if cfg!(target_os = "macos") {
            ("pbcopy", vec![])
        } else if cfg!(target_os = "windows") {
            ("clip", vec![])
        } else if std::env::var_os("WAYLAND_DISPLAY").is_some() {
            ("wl-copy", vec![])
        } else {
            ("xclip", vec!["-selection", "clipboard"])
        }
    }
}

impl CopyTarget for CommandFallback {
    fn copy(&mut self, text: &str) -> Result<(), String> {
        let mut staged = tempfile::NamedTempFile::new().map_err(|e| e.to_string())?;
        staged
            .write_all(text.as_bytes())
            .and_then(|_| staged.flush())
            .map_err(|e| e.to_string())?;
        let input = staged.reopen().map_err(|e| e.to_string())?;

        let (program, args) = Self::command();
        debug!("Copying with {}", program);
        let status = Command::new(program)
            .args(args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| format!("{program}: {e}"))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("{program} terminó con {status}"))
        }
    }
}

pub struct Clipboard {
    primary: Box<dyn CopyTarget>,
    fallback: Option<Box<dyn CopyTarget>>,
}

impl Clipboard {
    pub fn new(primary: Box<dyn CopyTarget>, fallback: Option<Box<dyn CopyTarget>>) -> Self {
        Self { primary, fallback }
    }

    /// Native clipboard with the command fallback.
    pub fn system() -> Self {
        Self::new(Box::new(ArboardTarget), Some(Box::new(CommandFallback)))
    }

    /// Copies `text`, reporting the outcome as a notice that names `item`.
    pub fn copy(&mut self, text: Option<&str>, item: &str, texts: &UiTexts) -> Notice {
        let Some(text) = text.filter(|t| !t.trim().is_empty()) else {
            return Notice::info(fill(&texts.no_item_to_copy, "item", item));
        };

        let primary_err = match self.primary.copy(text) {
            Ok(()) => return Notice::success(fill(&texts.copied_success, "item", item)),
            Err(err) => err,
        };
        warn!("Clipboard copy failed, trying fallback: {}", primary_err);

        let Some(fallback) = self.fallback.as_mut() else {
            return Notice::error(fill(&texts.copied_error, "item", item));
        };
        match fallback.copy(text) {
            Ok(()) => Notice::success(fill(&texts.copied_fallback, "item", item)),
            Err(err) => {
                warn!("Fallback copy failed: {}", err);
                Notice::error(fill(&texts.copied_error_fallback, "item", item))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::Severity;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder {
        fail: bool,
        copied: Arc<Mutex<Vec<String>>>,
    }

    impl CopyTarget for Recorder {
        fn copy(&mut self, text: &str) -> Result<(), String> {
            if self.fail {
                return Err("sin portapapeles".into());
            }
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn failing() -> Recorder {
        Recorder {
            fail: true,
            ..Recorder::default()
        }
    }

    #[test]
    fn test_nothing_to_copy_is_info() {
        let primary = Recorder::default();
        let mut clipboard = Clipboard::new(Box::new(primary.clone()), None);
        let texts = UiTexts::default();

        let notice = clipboard.copy(None, "Resumen", &texts);
        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(notice.message, "No hay Resumen para copiar.");
        assert_eq!(clipboard.copy(Some("  "), "Resumen", &texts).severity, Severity::Info);
        assert!(primary.copied.lock().unwrap().is_empty());
    }

    #[test]
    fn test_copy_twice_gives_two_successes() {
        let primary = Recorder::default();
        let mut clipboard = Clipboard::new(Box::new(primary.clone()), None);
        let texts = UiTexts::default();

        let first = clipboard.copy(Some("La célula"), "Resumen", &texts);
        let second = clipboard.copy(Some("La célula"), "Resumen", &texts);
        assert_eq!(first.severity, Severity::Success);
        assert_eq!(second.severity, Severity::Success);
        assert_eq!(primary.copied.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_fallback_after_primary_failure() {
        let fallback = Recorder::default();
        let mut clipboard = Clipboard::new(Box::new(failing()), Some(Box::new(fallback.clone())));
        let notice = clipboard.copy(Some("FAQ"), "FAQ", &UiTexts::default());
        assert_eq!(notice.severity, Severity::Success);
        assert!(notice.message.contains("método alternativo"));
        assert_eq!(fallback.copied.lock().unwrap().as_slice(), ["FAQ"]);
    }

    #[test]
    fn test_both_paths_failing_is_error() {
        let mut clipboard = Clipboard::new(Box::new(failing()), Some(Box::new(failing())));
        let notice = clipboard.copy(Some("x"), "Informe", &UiTexts::default());
        assert_eq!(notice.severity, Severity::Error);
        assert_eq!(notice.message, "Error al copiar Informe con el método alternativo.");

        let mut no_fallback = Clipboard::new(Box::new(failing()), None);
        let notice = no_fallback.copy(Some("x"), "Informe", &UiTexts::default());
        assert_eq!(notice.message, "No se pudo copiar Informe.");
    }
}
