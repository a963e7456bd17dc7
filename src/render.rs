//! # Terminal rendering
//!
//! Everything the binary prints goes through here:
//!
//! - [`write_notice`]: a notice, colored by severity
//! - [`print_markdown`]: model output rendered with `termimad`
//! - [`with_spinner`]: an `indicatif` spinner while an AI call is in flight
//! - [`configuration_error_screen`]: the full-screen takeover shown when no
//!   credential is configured
//! - [`write_flashcard`], [`write_practice`]: session snapshots
//!
//! Writers are generic over [`Write`] so output can be captured in tests.

use std::error::Error;
use std::future::Future;
use std::io::{Write, stdout};
use std::time::Duration;

use crossterm::{
    ExecutableCommand, QueueableCommand,
    cursor::MoveTo,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use indicatif::{ProgressBar, ProgressStyle};
use termimad::MadSkin;

use crate::models::{FlashcardDeck, PracticeState};
use crate::notice::{Notice, Severity};
use crate::texts::UiTexts;

fn severity_style(severity: Severity) -> (Color, &'static str) {
    match severity {
        Severity::Info => (Color::Cyan, "ℹ"),
        Severity::Success => (Color::Green, "✓"),
        Severity::Warning => (Color::Yellow, "!"),
        Severity::Error => (Color::Red, "✗"),
    }
}

/// Writes a single notice line.
pub fn write_notice<W: Write>(out: &mut W, notice: &Notice) -> Result<(), Box<dyn Error>> {
    let (color, symbol) = severity_style(notice.severity);
    out.queue(SetForegroundColor(color))?;
    out.queue(Print(format!("{symbol} {}\n", notice.message)))?;
    out.queue(ResetColor)?;
    out.flush()?;
    Ok(())
}

/// Prints notices to stderr, oldest first.
pub fn print_notices(notices: &[Notice]) -> Result<(), Box<dyn Error>> {
    let mut err = std::io::stderr();
    for notice in notices {
        write_notice(&mut err, notice)?;
    }
    Ok(())
}

fn skin() -> MadSkin {
    let mut skin = MadSkin::default();
    skin.set_headers_fg(termimad::crossterm::style::Color::Cyan);
    skin.bold.set_fg(termimad::crossterm::style::Color::White);
    skin
}

/// Prints a titled block of Markdown.
pub fn print_markdown(title: &str, text: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    write_title(&mut out, title)?;
    writeln!(out, "{}", skin().term_text(text))?;
    out.flush()?;
    Ok(())
}

fn write_title<W: Write>(out: &mut W, title: &str) -> Result<(), Box<dyn Error>> {
    out.queue(SetForegroundColor(Color::Cyan))?;
    out.queue(SetAttribute(Attribute::Bold))?;
    out.queue(Print(format!("\n{title}\n")))?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(ResetColor)?;
    Ok(())
}

/// Awaits `future` while a spinner shows `message`.
pub async fn with_spinner<F: Future>(message: &str, future: F) -> F::Output {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let output = future.await;
    spinner.finish_and_clear();
    output
}

/// Clears the screen and explains that the credential is missing.
pub fn configuration_error_screen(texts: &UiTexts, message: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    out.execute(Clear(ClearType::All))?;
    out.execute(MoveTo(0, 0))?;
    out.queue(SetForegroundColor(Color::Red))?;
    out.queue(SetAttribute(Attribute::Bold))?;
    out.queue(Print(format!("{} · Error de configuración\n\n", texts.app_title)))?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(Print(format!("{message}\n\n")))?;
    out.queue(ResetColor)?;
    out.queue(Print(
        "Define la variable de entorno GEMINI_API_KEY o ejecuta `repaso init` y edita config.yaml.\n",
    ))?;
    out.flush()?;
    Ok(())
}

/// Writes the current card of `deck` with its position.
pub fn write_flashcard<W: Write>(
    out: &mut W,
    deck: &FlashcardDeck,
    texts: &UiTexts,
) -> Result<(), Box<dyn Error>> {
    let Some(side) = deck.visible_side() else {
        return Ok(());
    };
    let (color, label) = if deck.is_flipped() {
        (Color::Green, "Reverso")
    } else {
        (Color::Cyan, "Anverso")
    };
    out.queue(SetAttribute(Attribute::Dim))?;
    out.queue(Print(format!("{}\n", deck.position_label(&texts.flashcard_of))))?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(SetForegroundColor(color))?;
    out.queue(Print(format!("[{label}] {side}\n")))?;
    out.queue(ResetColor)?;
    out.flush()?;
    Ok(())
}

/// Writes the question, and the verdict once the answer has been evaluated.
pub fn write_practice<W: Write>(
    out: &mut W,
    practice: &PracticeState,
    texts: &UiTexts,
) -> Result<(), Box<dyn Error>> {
    if practice.current_question.is_empty() {
        return Ok(());
    }
    match practice.is_correct {
        None => {
            out.queue(SetAttribute(Attribute::Bold))?;
            out.queue(Print(format!("\n{}\n", practice.current_question)))?;
            out.queue(SetAttribute(Attribute::Reset))?;
        }
        Some(correct) => {
            let (color, label) = if correct {
                (Color::Green, &texts.correct_label)
            } else {
                (Color::Red, &texts.incorrect_label)
            };
            out.queue(SetForegroundColor(color))?;
            out.queue(SetAttribute(Attribute::Bold))?;
            out.queue(Print(format!("{label}\n")))?;
            out.queue(SetAttribute(Attribute::Reset))?;
            out.queue(ResetColor)?;
            out.queue(Print(format!("{}\n", practice.feedback)))?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Enters or leaves the alternate screen.
pub fn set_focus_mode(active: bool) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    if active {
        out.execute(EnterAlternateScreen)?;
        out.execute(Clear(ClearType::All))?;
        out.execute(MoveTo(0, 0))?;
    } else {
        out.execute(LeaveAlternateScreen)?;
    }
    Ok(())
}
