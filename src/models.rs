//! # Session data model
//!
//! Plain in-memory data structures owned by the
//! [`Orchestrator`](crate::orchestrator::Orchestrator). Nothing here is persisted;
//! a session restart resets every value to its `Default`.
//!
//! - [`StudyContent`]: the loaded material (text and/or one image).
//! - [`PracticeState`]: the current question/answer cycle.
//! - [`SessionHistoryEntry`]: one immutable record per evaluated answer.
//! - [`TextSet`]: insertion-ordered set of strings (asked questions, covered concepts).
//! - [`Counters`], [`ReportState`].
//! - Structured outputs: [`Flashcard`] / [`FlashcardDeck`] and [`SemanticMap`].

use indexmap::IndexSet;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Course/level options offered to the user. The first entry is the default.
pub const COURSE_OPTIONS: &[&str] = &[
    "Educación Secundaria",
    "Bachillerato",
    "Formación Profesional",
    "Universidad",
    "Posgrado",
    "Oposiciones",
];

/// A single in-memory image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    /// Declared media type, e.g. `image/png`.
    pub mime_type: String,
}

/// The material the user is studying.
///
/// Replaced wholesale whenever new material is loaded; at least one of `text` or
/// `image` must be present before any content-dependent AI operation runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudyContent {
    pub text: String,
    pub image: Option<ImageData>,
}

impl StudyContent {
    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|img| !img.bytes.is_empty())
    }

    /// `true` when neither text nor image is available.
    pub fn is_empty(&self) -> bool {
        !self.has_text() && !self.has_image()
    }
}

/// Requested question style.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[default]
    Random,
    General,
    Definition,
    Relationship,
    Application,
    TrueFalse,
    MultipleChoice,
}

impl QuestionType {
    /// Every concrete (non-random) type.
    pub const CONCRETE: [QuestionType; 6] = [
        QuestionType::General,
        QuestionType::Definition,
        QuestionType::Relationship,
        QuestionType::Application,
        QuestionType::TrueFalse,
        QuestionType::MultipleChoice,
    ];

    pub fn label(self) -> &'static str {
        match self {
            QuestionType::Random => "Aleatorio",
            QuestionType::General => "General",
            QuestionType::Definition => "Definición",
            QuestionType::Relationship => "Relación",
            QuestionType::Application => "Aplicación",
            QuestionType::TrueFalse => "Verdadero/Falso",
            QuestionType::MultipleChoice => "Opción Múltiple",
        }
    }

    pub fn is_random(self) -> bool {
        self == QuestionType::Random
    }

    /// Picks a concrete type uniformly at random.
    pub fn sample<R: Rng + ?Sized>(rng: &mut R) -> QuestionType {
        *Self::CONCRETE
            .choose(rng)
            .unwrap_or(&QuestionType::General)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Practice mode.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StudyMode {
    /// Free questions over the whole material.
    #[default]
    Random,
    /// Tracks covered concepts and steers towards uncovered ones.
    Guided,
}

impl StudyMode {
    pub fn label(self) -> &'static str {
        match self {
            StudyMode::Random => "Aleatorio",
            StudyMode::Guided => "Guiado",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Insertion-ordered set of free-form strings. Grows monotonically until cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSet {
    items: IndexSet<String>,
}

impl TextSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the value was not present yet.
    pub fn insert(&mut self, value: impl Into<String>) -> bool {
        self.items.insert(value.into())
    }

    pub fn contains(&self, value: &str) -> bool {
        self.items.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn join(&self, separator: &str) -> String {
        self.iter().collect::<Vec<_>>().join(separator)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

/// One evaluated answer. Appended to the history, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHistoryEntry {
    pub question: String,
    pub user_answer: String,
    pub feedback: String,
    pub is_correct: bool,
    pub concept: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub correct: u32,
    pub incorrect: u32,
}

impl Counters {
    pub fn record(&mut self, is_correct: bool) {
        if is_correct {
            self.correct += 1;
        } else {
            self.incorrect += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.correct + self.incorrect
    }
}

/// Where the current practice cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PracticePhase {
    Idle,
    QuestionGenerated,
    Evaluated,
}

/// The active question/answer cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PracticeState {
    pub question_type: QuestionType,
    pub study_mode: StudyMode,
    pub current_question: String,
    pub current_concept: String,
    pub user_answer: String,
    pub feedback: String,
    /// Set once an evaluation completes.
    pub is_correct: Option<bool>,
}

impl PracticeState {
    pub fn phase(&self) -> PracticePhase {
        if self.current_question.is_empty() {
            PracticePhase::Idle
        } else if self.is_correct.is_some() {
            PracticePhase::Evaluated
        } else {
            PracticePhase::QuestionGenerated
        }
    }
}

/// Last generated report. Overwritten on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportState {
    pub report: String,
    pub suggestions: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

/// A set of flashcards plus the viewer position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashcardDeck {
    cards: Vec<Flashcard>,
    index: usize,
    flipped: bool,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        Self {
            cards,
            index: 0,
            flipped: false,
        }
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn current(&self) -> Option<&Flashcard> {
        self.cards.get(self.index)
    }

    /// The visible side of the current card.
    pub fn visible_side(&self) -> Option<&str> {
        self.current().map(|card| {
            if self.flipped {
                card.back.as_str()
            } else {
                card.front.as_str()
            }
        })
    }

    pub fn flip(&mut self) {
        self.flipped = !self.flipped;
    }

    pub fn next(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        self.flipped = false;
        self.index = (self.index + 1) % self.cards.len();
    }

    pub fn prev(&mut self) {
        if self.cards.is_empty() {
            return;
        }
        self.flipped = false;
        self.index = (self.index + self.cards.len() - 1) % self.cards.len();
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.index = 0;
        self.flipped = false;
    }

    /// Fills a `"{current} de {total}"`-style template with the 1-based position.
    pub fn position_label(&self, template: &str) -> String {
        template
            .replace("{current}", &(self.index + 1).to_string())
            .replace("{total}", &self.cards.len().to_string())
    }
}

/// Node identifiers come back either as strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeId {
    Text(String),
    Number(serde_json::Number),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Text(s) => f.write_str(s),
            NodeId::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: NodeId,
    pub label: String,
    /// Tooltip text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEdge {
    pub from: NodeId,
    pub to: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Arrow style, e.g. `"to"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrows: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMap {
    pub nodes: Vec<MapNode>,
    pub edges: Vec<MapEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn card(n: u8) -> Flashcard {
        Flashcard {
            front: format!("front {n}"),
            back: format!("back {n}"),
        }
    }

    #[test]
    fn test_study_content_emptiness() {
        let mut content = StudyContent::default();
        assert!(content.is_empty());
        content.text = "  \n".to_string();
        assert!(content.is_empty());
        content.image = Some(ImageData {
            bytes: vec![1, 2, 3],
            mime_type: "image/png".into(),
        });
        assert!(!content.is_empty());
        assert!(content.has_image());
        assert!(!content.has_text());
    }

    #[test]
    fn test_sample_never_random() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let t = QuestionType::sample(&mut rng);
            assert!(!t.is_random());
            assert!(QuestionType::CONCRETE.contains(&t));
        }
    }

    #[test]
    fn test_text_set_keeps_insertion_order() {
        let mut set = TextSet::new();
        assert!(set.insert("b"));
        assert!(set.insert("a"));
        assert!(!set.insert("b"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.join("; "), "b; a");
        assert!(set.contains("a"));
        set.clear();
        assert!(set.is_empty());
    }

    #[test]
    fn test_history_entry_serializes_camel_case() {
        let entry = SessionHistoryEntry {
            question: "q".into(),
            user_answer: "a".into(),
            feedback: "f".into(),
            is_correct: true,
            concept: "c".into(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["userAnswer"], "a");
        assert_eq!(json["isCorrect"], true);
    }

    #[test]
    fn test_practice_phase() {
        let mut state = PracticeState::default();
        assert_eq!(state.phase(), PracticePhase::Idle);
        state.current_question = "¿Qué es?".into();
        assert_eq!(state.phase(), PracticePhase::QuestionGenerated);
        state.is_correct = Some(false);
        assert_eq!(state.phase(), PracticePhase::Evaluated);
    }

    #[test]
    fn test_deck_navigation_wraps() {
        let mut deck = FlashcardDeck::new(vec![card(1), card(2), card(3)]);
        assert_eq!(deck.visible_side(), Some("front 1"));
        deck.flip();
        assert_eq!(deck.visible_side(), Some("back 1"));
        deck.prev();
        assert_eq!(deck.index(), 2);
        assert!(!deck.is_flipped());
        deck.next();
        assert_eq!(deck.index(), 0);
        assert_eq!(deck.position_label("Tarjeta {current} de {total}"), "Tarjeta 1 de 3");
    }

    #[test]
    fn test_deck_shuffle_resets_position() {
        let mut deck = FlashcardDeck::new((0..10).map(card).collect());
        deck.next();
        deck.next();
        deck.flip();
        deck.shuffle(&mut StdRng::seed_from_u64(42));
        assert_eq!(deck.index(), 0);
        assert!(!deck.is_flipped());
        assert_eq!(deck.len(), 10);
    }

    #[test]
    fn test_empty_deck_navigation_is_noop() {
        let mut deck = FlashcardDeck::default();
        deck.next();
        deck.prev();
        assert!(deck.current().is_none());
    }

    #[test]
    fn test_node_ids_accept_strings_and_numbers() {
        let map: SemanticMap = serde_json::from_str(
            r#"{"nodes":[{"id":1,"label":"A"},{"id":"b","label":"B","title":"tip"}],
                "edges":[{"from":1,"to":"b","label":"causa"}]}"#,
        )
        .unwrap();
        assert_eq!(map.nodes[0].id.to_string(), "1");
        assert_eq!(map.nodes[1].title.as_deref(), Some("tip"));
        assert_eq!(map.edges[0].to, NodeId::Text("b".into()));
    }
}
