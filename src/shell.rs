//! Interactive practice shell.
//!
//! Lines starting with `/` are commands; any other line answers the current
//! question. [`parse`] is pure; [`run`] drives an [`Orchestrator`] from stdin.

use std::error::Error;
use std::io::{Write, stdin, stdout};
use std::path::PathBuf;

use clap::ValueEnum;
use tracing::debug;

use crate::gemini::Transport;
use crate::models::{QuestionType, StudyMode};
use crate::notice::Notice;
use crate::orchestrator::{CopyItem, Orchestrator};
use crate::render;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Question,
    Elaborate,
    Analogies,
    Summary,
    Faq,
    Flashcards,
    Map(Option<PathBuf>),
    Report,
    Copy(CopyItem),
    Load(PathBuf),
    Image(PathBuf),
    /// Inline text, or `None` to read several lines.
    Text(Option<String>),
    SetType(QuestionType),
    SetMode(StudyMode),
    /// `None` clears the course.
    SetCourse(Option<String>),
    Focus,
    Restart,
    Help,
    Exit,
    Answer(String),
    Empty,
    /// Unknown command or bad argument; carries the message to show.
    Invalid(String),
}

/// What a key press does in the flashcard viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Flip,
    Next,
    Prev,
    Shuffle,
    Close,
}

pub const HELP: &str = "\
**Comandos**

- `/pregunta`: nueva pregunta
- `/explicar`, `/analogias`: sobre la pregunta o concepto actual
- `/resumen`, `/faq`, `/tarjetas`
- `/mapa [ruta.html]`: mapa conceptual interactivo
- `/informe`: informe de la sesión
- `/copiar resumen|faq|explicacion|analogias|informe`
- `/cargar <ruta>`, `/imagen <ruta>`, `/texto [texto]`
- `/tipo <tipo>`, `/modo aleatorio|guiado`, `/curso [curso]`
- `/enfoque`, `/reiniciar`, `/ayuda`, `/salir`

Cualquier otra línea es tu respuesta a la pregunta actual.";

fn normalize(word: &str) -> String {
    word.trim()
        .to_lowercase()
        .replace('á', "a")
        .replace('é', "e")
        .replace('í', "i")
        .replace('ó', "o")
        .replace('ú', "u")
        .replace([' ', '_', '/'], "-")
}

pub fn parse_question_type(value: &str) -> Option<QuestionType> {
    let question_type = match normalize(value).as_str() {
        "aleatorio" | "aleatoria" => QuestionType::Random,
        "definicion" => QuestionType::Definition,
        "relacion" => QuestionType::Relationship,
        "aplicacion" => QuestionType::Application,
        "verdadero-falso" | "vf" => QuestionType::TrueFalse,
        "opcion-multiple" | "test" => QuestionType::MultipleChoice,
        other => return QuestionType::from_str(other, true).ok(),
    };
    Some(question_type)
}

pub fn parse_study_mode(value: &str) -> Option<StudyMode> {
    match normalize(value).as_str() {
        "aleatorio" => Some(StudyMode::Random),
        "guiado" => Some(StudyMode::Guided),
        other => StudyMode::from_str(other, true).ok(),
    }
}

fn parse_copy_item(value: &str) -> Option<CopyItem> {
    match normalize(value).as_str() {
        "resumen" => Some(CopyItem::Summary),
        "faq" => Some(CopyItem::Faq),
        "explicacion" => Some(CopyItem::Elaboration),
        "analogias" => Some(CopyItem::Analogies),
        "informe" => Some(CopyItem::Report),
        _ => None,
    }
}

/// Parses one input line.
pub fn parse(line: &str) -> ShellCommand {
    let line = line.trim();
    if line.is_empty() {
        return ShellCommand::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ShellCommand::Answer(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    match (normalize(name).as_str(), arg) {
        ("pregunta", _) => ShellCommand::Question,
        ("explicar", _) => ShellCommand::Elaborate,
        ("analogias", _) => ShellCommand::Analogies,
        ("resumen", _) => ShellCommand::Summary,
        ("faq", _) => ShellCommand::Faq,
        ("tarjetas", _) => ShellCommand::Flashcards,
        ("mapa", arg) => ShellCommand::Map(arg.map(PathBuf::from)),
        ("informe", _) => ShellCommand::Report,
        ("copiar", Some(item)) => match parse_copy_item(&item) {
            Some(item) => ShellCommand::Copy(item),
            None => ShellCommand::Invalid(format!("No se puede copiar «{item}».")),
        },
        ("copiar", None) => ShellCommand::Invalid("Indica qué copiar: /copiar resumen".into()),
        ("cargar", Some(path)) => ShellCommand::Load(PathBuf::from(path)),
        ("imagen", Some(path)) => ShellCommand::Image(PathBuf::from(path)),
        ("cargar" | "imagen", None) => ShellCommand::Invalid("Indica la ruta del archivo.".into()),
        ("texto", arg) => ShellCommand::Text(arg),
        ("tipo", Some(value)) => match parse_question_type(&value) {
            Some(question_type) => ShellCommand::SetType(question_type),
            None => ShellCommand::Invalid(format!("Tipo de pregunta desconocido: «{value}».")),
        },
        ("modo", Some(value)) => match parse_study_mode(&value) {
            Some(mode) => ShellCommand::SetMode(mode),
            None => ShellCommand::Invalid(format!("Modo desconocido: «{value}».")),
        },
        ("tipo" | "modo", None) => ShellCommand::Invalid("Falta el valor.".into()),
        ("curso", course) => ShellCommand::SetCourse(course),
        ("enfoque", _) => ShellCommand::Focus,
        ("reiniciar", _) => ShellCommand::Restart,
        ("ayuda" | "help", _) => ShellCommand::Help,
        ("salir" | "exit" | "quit", _) => ShellCommand::Exit,
        _ => ShellCommand::Invalid(format!("Comando desconocido: /{name}. Escribe /ayuda.")),
    }
}

pub fn parse_card_action(line: &str) -> CardAction {
    match normalize(line).as_str() {
        "s" | "siguiente" | "n" => CardAction::Next,
        "a" | "anterior" | "p" => CardAction::Prev,
        "b" | "barajar" => CardAction::Shuffle,
        "q" | "salir" | "x" => CardAction::Close,
        _ => CardAction::Flip,
    }
}

fn is_affirmative(answer: &str) -> bool {
    matches!(normalize(answer).as_str(), "s" | "si" | "y" | "yes")
}

/// Prints `prompt` and reads one line. `None` at end of input.
fn read_line(prompt: &str) -> Result<Option<String>, Box<dyn Error>> {
    let mut out = stdout();
    write!(out, "{prompt}")?;
    out.flush()?;
    let mut line = String::new();
    if stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

/// Reads lines until one is exactly `/fin`.
fn read_block() -> Result<String, Box<dyn Error>> {
    println!("Escribe o pega el texto y termina con una línea que contenga /fin");
    let mut text = String::new();
    while let Some(line) = read_line("")? {
        if line.trim() == "/fin" {
            break;
        }
        text.push_str(&line);
    }
    Ok(text)
}

/// Browses the current flashcard deck until the user closes it.
pub fn browse_flashcards<T: Transport>(
    orch: &mut Orchestrator<T>,
) -> Result<(), Box<dyn Error>> {
    if orch.deck().is_empty() {
        return Ok(());
    }
    render::print_markdown(&orch.texts().flashcards_title, "")?;
    println!("[Intro] voltear · s siguiente · a anterior · b barajar · q salir");
    loop {
        render::write_flashcard(&mut stdout(), orch.deck(), orch.texts())?;
        let Some(line) = read_line("» ")? else {
            break;
        };
        match parse_card_action(&line) {
            CardAction::Flip => orch.flip_card(),
            CardAction::Next => orch.next_card(),
            CardAction::Prev => orch.prev_card(),
            CardAction::Shuffle => orch.shuffle_cards(),
            CardAction::Close => break,
        }
    }
    Ok(())
}

/// Runs the shell until `/salir` or end of input.
pub async fn run<T: Transport>(orch: &mut Orchestrator<T>) -> Result<(), Box<dyn Error>> {
    render::print_markdown(&orch.texts().app_title, HELP)?;
    render::print_notices(&orch.drain_notices())?;

    loop {
        let Some(line) = read_line("\n» ")? else {
            break;
        };
        let command = parse(&line);
        debug!("Shell command: {:?}", command);

        match command {
            ShellCommand::Empty => {}
            ShellCommand::Exit => break,
            ShellCommand::Help => render::print_markdown(&orch.texts().app_title, HELP)?,
            ShellCommand::Invalid(message) => render::print_notices(&[Notice::warning(message)])?,
            ShellCommand::Question => {
                let generated =
                    render::with_spinner("Generando pregunta...", orch.generate_question()).await;
                render::print_notices(&orch.drain_notices())?;
                if generated.is_ok() {
                    render::write_practice(&mut stdout(), orch.practice(), orch.texts())?;
                }
            }
            ShellCommand::Answer(answer) => {
                orch.set_answer(answer);
                let evaluated =
                    render::with_spinner("Evaluando respuesta...", orch.evaluate_answer()).await;
                render::print_notices(&orch.drain_notices())?;
                if evaluated.is_ok() {
                    render::write_practice(&mut stdout(), orch.practice(), orch.texts())?;
                }
            }
            ShellCommand::Elaborate => {
                if render::with_spinner("Ampliando explicación...", orch.elaborate_concept())
                    .await
                    .is_ok()
                {
                    render::print_markdown(&orch.texts().elaboration_title, orch.elaboration())?;
                }
            }
            ShellCommand::Analogies => {
                if render::with_spinner("Buscando analogías...", orch.generate_analogies())
                    .await
                    .is_ok()
                {
                    render::print_markdown(&orch.texts().analogies_title, orch.analogies())?;
                }
            }
            ShellCommand::Summary => {
                if render::with_spinner("Resumiendo...", orch.generate_summary())
                    .await
                    .is_ok()
                {
                    render::print_markdown(&orch.texts().summary_title, orch.summary())?;
                }
            }
            ShellCommand::Faq => {
                if render::with_spinner("Generando FAQs...", orch.generate_faq())
                    .await
                    .is_ok()
                {
                    render::print_markdown(&orch.texts().faq_title, orch.faq())?;
                }
            }
            ShellCommand::Flashcards => {
                let generated =
                    render::with_spinner("Generando flashcards...", orch.generate_flashcards())
                        .await;
                render::print_notices(&orch.drain_notices())?;
                if generated.is_ok() {
                    browse_flashcards(orch)?;
                }
            }
            ShellCommand::Map(path) => {
                if render::with_spinner("Construyendo mapa conceptual...", orch.generate_semantic_map())
                    .await
                    .is_ok()
                {
                    if let Err(err) = orch.export_semantic_map(path.as_deref()).await {
                        debug!("Concept map export failed: {err}");
                    }
                }
            }
            ShellCommand::Report => {
                if render::with_spinner("Preparando informe...", orch.generate_report())
                    .await
                    .is_ok()
                {
                    if let Some(report) = orch.report_copy_text() {
                        render::print_markdown(&orch.texts().report_title, &report)?;
                    }
                }
            }
            ShellCommand::Copy(item) => {
                orch.copy(item);
            }
            ShellCommand::Load(path) => {
                if let Err(err) = orch.load_document(&path).await {
                    debug!("Document not loaded: {err}");
                }
            }
            ShellCommand::Image(path) => {
                if let Err(err) = orch.load_image(&path).await {
                    debug!("Image not loaded: {err}");
                }
            }
            ShellCommand::Text(text) => {
                let text = match text {
                    Some(text) => text,
                    None => read_block()?,
                };
                orch.set_text(text);
            }
            ShellCommand::SetType(question_type) => {
                orch.set_question_type(question_type);
                println!("Tipo de pregunta: {question_type}");
            }
            ShellCommand::SetMode(mode) => {
                orch.set_study_mode(mode);
                println!("Modo de estudio: {mode}");
            }
            ShellCommand::SetCourse(course) => {
                orch.set_course(course);
                println!("Curso: {}", orch.course().unwrap_or("(ninguno)"));
            }
            ShellCommand::Focus => {
                let active = orch.toggle_focus_mode();
                render::set_focus_mode(active)?;
            }
            ShellCommand::Restart => {
                let was_focused = orch.focus_mode();
                let question = format!("{} [s/N] ", orch.request_restart());
                let confirmed = read_line(&question)?.is_some_and(|a| is_affirmative(&a));
                if confirmed {
                    orch.confirm_restart();
                    if was_focused {
                        render::set_focus_mode(false)?;
                    }
                } else {
                    orch.cancel_restart();
                }
            }
        }

        render::print_notices(&orch.drain_notices())?;
    }

    if orch.focus_mode() {
        render::set_focus_mode(false)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_line_is_an_answer() {
        assert_eq!(
            parse("  La mitocondria produce ATP \n"),
            ShellCommand::Answer("La mitocondria produce ATP".into())
        );
        assert_eq!(parse("   "), ShellCommand::Empty);
    }

    #[test]
    fn test_commands_ignore_accents_and_case() {
        assert_eq!(parse("/Pregunta"), ShellCommand::Question);
        assert_eq!(parse("/analogías"), ShellCommand::Analogies);
        assert_eq!(parse("/copiar Explicación"), ShellCommand::Copy(CopyItem::Elaboration));
        assert_eq!(parse("/salir"), ShellCommand::Exit);
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse("/mapa"), ShellCommand::Map(None));
        assert_eq!(
            parse("/mapa salida/mapa.html"),
            ShellCommand::Map(Some(PathBuf::from("salida/mapa.html")))
        );
        assert_eq!(
            parse("/cargar apuntes de clase.pdf"),
            ShellCommand::Load(PathBuf::from("apuntes de clase.pdf"))
        );
        assert_eq!(
            parse("/tipo verdadero falso"),
            ShellCommand::SetType(QuestionType::TrueFalse)
        );
        assert_eq!(
            parse("/tipo multiple-choice"),
            ShellCommand::SetType(QuestionType::MultipleChoice)
        );
        assert_eq!(parse("/modo guiado"), ShellCommand::SetMode(StudyMode::Guided));
        assert_eq!(
            parse("/curso Bachillerato"),
            ShellCommand::SetCourse(Some("Bachillerato".into()))
        );
        assert_eq!(parse("/curso"), ShellCommand::SetCourse(None));
        assert_eq!(parse("/texto"), ShellCommand::Text(None));
    }

    #[test]
    fn test_bad_input_is_invalid() {
        assert!(matches!(parse("/volar"), ShellCommand::Invalid(_)));
        assert!(matches!(parse("/copiar"), ShellCommand::Invalid(_)));
        assert!(matches!(parse("/copiar nada"), ShellCommand::Invalid(_)));
        assert!(matches!(parse("/tipo raro"), ShellCommand::Invalid(_)));
        assert!(matches!(parse("/imagen"), ShellCommand::Invalid(_)));
    }

    #[test]
    fn test_card_actions() {
        assert_eq!(parse_card_action("\n"), CardAction::Flip);
        assert_eq!(parse_card_action("s"), CardAction::Next);
        assert_eq!(parse_card_action("A"), CardAction::Prev);
        assert_eq!(parse_card_action("barajar"), CardAction::Shuffle);
        assert_eq!(parse_card_action("q"), CardAction::Close);
    }

    #[test]
    fn test_confirmation_words() {
        assert!(is_affirmative("sí\n"));
        assert!(is_affirmative("S"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("no"));
    }
}
