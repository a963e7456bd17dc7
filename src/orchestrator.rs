//! # Session orchestrator
//!
//! Owns every piece of session state and is the only thing that mutates it. The
//! presentation layer reads snapshots through the accessors, dispatches intents
//! through the `async` operations and drains [`Notice`]s afterwards.
//!
//! Each operation follows the same shape:
//!
//! 1. validate preconditions (content present, question present, capability loaded);
//!    on failure post a notice and return [`StudyError::Validation`] or
//!    [`StudyError::CapabilityUnavailable`] without touching the network,
//! 2. mark its [`Control`] as loading,
//! 3. build the prompt and issue exactly one gateway call (two, in order, for the
//!    report; up to two for the concept map),
//! 4. clear the loading flag, then commit the result or post a failure notice.
//!
//! Operations take `&mut self`, so a second invocation cannot start while one is in
//! flight.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info};

use crate::capabilities::{Capability, CapabilityRegistry};
use crate::clipboard::Clipboard;
use crate::config::RepasoConfig;
use crate::error::StudyError;
use crate::export;
use crate::gateway::{Gateway, build_content};
use crate::gemini::{GeminiClient, Transport};
use crate::ingest::{self, IngestError};
use crate::models::{
    Counters, Flashcard, FlashcardDeck, MapEdge, MapNode, PracticeState, QuestionType,
    ReportState, SemanticMap, SessionHistoryEntry, StudyContent, StudyMode, TextSet,
};
use crate::notice::{Notice, NoticeBoard, Severity};
use crate::prompt::{self, KEYWORDS, Operation};
use crate::texts::{UiTexts, fill};
use crate::verdict::{Verdict, parse_verdict};

static CONCEPT_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(Concepto:\s*(.*?)\)").expect("valid concept tag regex"));

/// Splits a generated question into its displayed text and the first tagged concept.
///
/// Every `(Concepto: ...)` tag is removed from the returned text.
pub fn extract_concept(question: &str) -> (String, Option<String>) {
    let concept = CONCEPT_TAG
        .captures(question)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|c| !c.is_empty());
    let cleaned = CONCEPT_TAG.replace_all(question, "").trim().to_string();
    (cleaned, concept)
}

/// Controls that trigger AI operations. Each is "loading" while its call is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Practice,
    Report,
    Summary,
    Faq,
    Elaboration,
    Analogies,
    Flashcards,
    SemanticMap,
}

/// Result panels the presentation layer may show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Report,
    Summary,
    Faq,
    Elaboration,
    Analogies,
    Flashcards,
    SemanticMap,
}

/// Things that can be copied to the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyItem {
    Summary,
    Faq,
    Elaboration,
    Analogies,
    Report,
}

#[derive(Deserialize)]
struct FlashcardsPayload {
    #[serde(default)]
    flashcards: Option<Vec<Flashcard>>,
}

#[derive(Deserialize)]
struct SemanticMapPayload {
    #[serde(default)]
    nodes: Option<Vec<MapNode>>,
    #[serde(default)]
    edges: Option<Vec<MapEdge>>,
}

pub struct Orchestrator<T: Transport = GeminiClient> {
    config: RepasoConfig,
    texts: UiTexts,
    gateway: Gateway<T>,
    capabilities: &'static CapabilityRegistry,
    clipboard: Clipboard,
    notices: NoticeBoard,

    content: StudyContent,
    practice: PracticeState,
    history: Vec<SessionHistoryEntry>,
    asked_questions: TextSet,
    covered_concepts: TextSet,
    counters: Counters,
    concept_to_elaborate: String,
    report: ReportState,
    summary: String,
    faq: String,
    elaboration: String,
    analogies: String,
    deck: FlashcardDeck,
    semantic_map: Option<SemanticMap>,

    open_panels: HashSet<Panel>,
    loading: HashSet<Control>,
    restart_pending: bool,
    focus_mode: bool,
}

impl Orchestrator<GeminiClient> {
    /// Builds an orchestrator backed by the HTTP transport.
    ///
    /// Fails with a configuration error when no credential is configured.
    pub fn connect(
        config: RepasoConfig,
        texts: UiTexts,
        capabilities: &'static CapabilityRegistry,
    ) -> Result<Self, StudyError> {
        let client = GeminiClient::new(&config)?;
        Ok(Self::new(
            config,
            texts,
            client,
            capabilities,
            Clipboard::system(),
        ))
    }
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(
        config: RepasoConfig,
        texts: UiTexts,
        transport: T,
        capabilities: &'static CapabilityRegistry,
        clipboard: Clipboard,
    ) -> Self {
        Self {
            config,
            texts,
            gateway: Gateway::new(transport),
            capabilities,
            clipboard,
            notices: NoticeBoard::default(),
            content: StudyContent::default(),
            practice: PracticeState::default(),
            history: Vec::new(),
            asked_questions: TextSet::new(),
            covered_concepts: TextSet::new(),
            counters: Counters::default(),
            concept_to_elaborate: String::new(),
            report: ReportState::default(),
            summary: String::new(),
            faq: String::new(),
            elaboration: String::new(),
            analogies: String::new(),
            deck: FlashcardDeck::default(),
            semantic_map: None,
            open_panels: HashSet::new(),
            loading: HashSet::new(),
            restart_pending: false,
            focus_mode: false,
        }
    }

    // ---- snapshots -------------------------------------------------------

    pub fn texts(&self) -> &UiTexts {
        &self.texts
    }

    pub fn config(&self) -> &RepasoConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway<T> {
        &self.gateway
    }

    pub fn content(&self) -> &StudyContent {
        &self.content
    }

    pub fn practice(&self) -> &PracticeState {
        &self.practice
    }

    pub fn history(&self) -> &[SessionHistoryEntry] {
        &self.history
    }

    pub fn asked_questions(&self) -> &TextSet {
        &self.asked_questions
    }

    pub fn covered_concepts(&self) -> &TextSet {
        &self.covered_concepts
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn concept_to_elaborate(&self) -> &str {
        &self.concept_to_elaborate
    }

    pub fn report(&self) -> &ReportState {
        &self.report
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn faq(&self) -> &str {
        &self.faq
    }

    pub fn elaboration(&self) -> &str {
        &self.elaboration
    }

    pub fn analogies(&self) -> &str {
        &self.analogies
    }

    pub fn deck(&self) -> &FlashcardDeck {
        &self.deck
    }

    pub fn semantic_map(&self) -> Option<&SemanticMap> {
        self.semantic_map.as_ref()
    }

    pub fn is_panel_open(&self, panel: Panel) -> bool {
        self.open_panels.contains(&panel)
    }

    pub fn close_panel(&mut self, panel: Panel) {
        self.open_panels.remove(&panel);
    }

    pub fn is_loading(&self, control: Control) -> bool {
        self.loading.contains(&control)
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_pending
    }

    pub fn focus_mode(&self) -> bool {
        self.focus_mode
    }

    pub fn course(&self) -> Option<&str> {
        self.config.course.as_deref()
    }

    pub fn notices(&self) -> &[Notice] {
        self.notices.pending()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    // ---- settings and material -------------------------------------------

    pub fn set_question_type(&mut self, question_type: QuestionType) {
        self.practice.question_type = question_type;
    }

    pub fn set_study_mode(&mut self, study_mode: StudyMode) {
        self.practice.study_mode = study_mode;
    }

    pub fn set_course(&mut self, course: Option<String>) {
        self.config.course = course.filter(|c| !c.trim().is_empty());
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.practice.user_answer = answer.into();
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.content.text = text.into();
    }

    pub fn clear_image(&mut self) {
        self.content.image = None;
    }

    /// Replaces the study text with the content of a document.
    ///
    /// On failure the current text is left as it was.
    pub async fn load_document(&mut self, path: impl AsRef<Path>) -> Result<(), StudyError> {
        let path = path.as_ref();
        match ingest::ingest_file(path, self.capabilities).await {
            Ok(text) => {
                self.content.text = text;
                let name = display_name(path);
                self.post(Notice::success(fill(&self.texts.doc_loaded, "fileName", &name)));
                Ok(())
            }
            Err(err) => {
                let message = match &err {
                    IngestError::CapabilityUnavailable(Capability::PdfText) => {
                        self.texts.pdf_not_loaded.clone()
                    }
                    IngestError::CapabilityUnavailable(Capability::DocxText) => {
                        self.texts.docx_not_loaded.clone()
                    }
                    other => other.to_string(),
                };
                let err = StudyError::from(err);
                let severity = Notice::from(&err).severity;
                self.post(Notice::new(severity, message));
                Err(err)
            }
        }
    }

    /// Replaces the study image.
    pub async fn load_image(&mut self, path: impl AsRef<Path>) -> Result<(), StudyError> {
        let path = path.as_ref();
        match ingest::load_image(path).await {
            Ok(image) => {
                self.content.image = Some(image);
                let name = display_name(path);
                self.post(Notice::success(fill(
                    &self.texts.image_loaded,
                    "fileName",
                    &name,
                )));
                Ok(())
            }
            Err(IngestError::NotAnImage) => {
                Err(self.reject(Severity::Warning, self.texts.invalid_image_file.clone()))
            }
            Err(err) => {
                let err = StudyError::from(err);
                self.post(Notice::from(&err));
                Err(err)
            }
        }
    }

    // ---- practice --------------------------------------------------------

    /// Generates the next practice question.
    pub async fn generate_question(&mut self) -> Result<(), StudyError> {
        self.practice.current_question.clear();
        self.practice.current_concept.clear();
        self.practice.user_answer.clear();
        self.practice.feedback.clear();
        self.practice.is_correct = None;
        self.concept_to_elaborate.clear();

        self.require_content(|t| &t.no_content_to_generate)?;

        let question_type = if self.practice.question_type.is_random() {
            let sampled = QuestionType::sample(&mut rand::thread_rng());
            self.post(Notice::info(fill(
                &self.texts.question_type_random,
                "type",
                sampled.label(),
            )));
            sampled
        } else {
            self.practice.question_type
        };
        let study_mode = self.practice.study_mode;

        let instructions = prompt::build(
            &Operation::GenerateQuestion {
                question_type,
                study_mode,
                asked_questions: &self.asked_questions,
                covered_concepts: &self.covered_concepts,
            },
            self.course(),
        );
        let raw = self
            .ask_text(
                Control::Practice,
                instructions,
                true,
                self.texts.question_failed.clone(),
            )
            .await?;

        let raw = raw.trim();
        let (question, concept) = if study_mode == StudyMode::Guided {
            extract_concept(raw)
        } else {
            (raw.to_string(), None)
        };

        match concept {
            Some(concept) => {
                debug!("Question covers concept: {}", concept);
                self.covered_concepts.insert(concept.clone());
                self.concept_to_elaborate = concept.clone();
                self.practice.current_concept = concept;
            }
            None => self.concept_to_elaborate = question.clone(),
        }
        self.asked_questions.insert(question.clone());
        self.practice.current_question = question;
        Ok(())
    }

    /// Evaluates the current answer.
    pub async fn evaluate_answer(&mut self) -> Result<Verdict, StudyError> {
        if self.practice.current_question.trim().is_empty()
            || self.practice.user_answer.trim().is_empty()
        {
            return Err(self.reject(Severity::Warning, self.texts.no_question_to_evaluate.clone()));
        }
        self.require_content(|t| &t.no_content_for_action)?;

        let instructions = prompt::build(
            &Operation::EvaluateAnswer {
                question: &self.practice.current_question,
                answer: &self.practice.user_answer,
            },
            self.course(),
        );
        let raw = self
            .ask_text(
                Control::Practice,
                instructions,
                true,
                self.texts.evaluation_failed.clone(),
            )
            .await?;

        let verdict = parse_verdict(&raw, &KEYWORDS);
        self.practice.feedback = verdict.feedback.clone();
        self.practice.is_correct = Some(verdict.is_correct);
        self.counters.record(verdict.is_correct);
        self.history.push(SessionHistoryEntry {
            question: self.practice.current_question.clone(),
            user_answer: self.practice.user_answer.clone(),
            feedback: verdict.feedback.clone(),
            is_correct: verdict.is_correct,
            concept: self.practice.current_concept.clone(),
        });
        self.concept_to_elaborate = if self.practice.current_concept.is_empty() {
            self.practice.current_question.clone()
        } else {
            self.practice.current_concept.clone()
        };
        info!(
            "Answer evaluated ({}); {} correct, {} incorrect",
            if verdict.is_correct { "correct" } else { "incorrect" },
            self.counters.correct,
            self.counters.incorrect
        );
        Ok(verdict)
    }

    /// Generates the performance report and the review suggestions, in that order.
    ///
    /// Either half that fails is replaced by its placeholder text.
    pub async fn generate_report(&mut self) -> Result<(), StudyError> {
        if self.history.is_empty() {
            return Err(self.reject(Severity::Info, self.texts.no_history_for_report.clone()));
        }

        self.loading.insert(Control::Report);

        let report_prompt = prompt::build(
            &Operation::GenerateReport {
                history: &self.history,
                counters: self.counters,
            },
            self.course(),
        );
        let report = self.gateway.text(build_content(&report_prompt, None)).await;
        self.report.report = match report {
            Ok(text) => text,
            Err(err) => {
                let failed = self.texts.report_failed.clone();
                self.fail(&failed, err.into());
                self.texts.report_placeholder.clone()
            }
        };

        let suggestions_prompt = prompt::build(
            &Operation::GenerateSuggestions {
                history: &self.history,
                counters: self.counters,
            },
            self.course(),
        );
        let suggestions = self
            .gateway
            .text(build_content(&suggestions_prompt, None))
            .await;
        self.report.suggestions = match suggestions {
            Ok(text) => text,
            Err(err) => {
                let failed = self.texts.suggestions_failed.clone();
                self.fail(&failed, err.into());
                self.texts.suggestions_placeholder.clone()
            }
        };

        self.loading.remove(&Control::Report);
        self.open_panels.insert(Panel::Report);
        Ok(())
    }

    // ---- study aids ------------------------------------------------------

    pub async fn generate_summary(&mut self) -> Result<(), StudyError> {
        self.require_content(|t| &t.no_content_for_action)?;
        let instructions = prompt::build(&Operation::GenerateSummary, self.course());
        self.summary = self
            .ask_text(
                Control::Summary,
                instructions,
                true,
                self.texts.summary_failed.clone(),
            )
            .await?;
        self.open_panels.insert(Panel::Summary);
        Ok(())
    }

    pub async fn generate_faq(&mut self) -> Result<(), StudyError> {
        self.require_content(|t| &t.no_content_for_action)?;
        let instructions = prompt::build(&Operation::GenerateFaq, self.course());
        self.faq = self
            .ask_text(
                Control::Faq,
                instructions,
                true,
                self.texts.faq_failed.clone(),
            )
            .await?;
        self.open_panels.insert(Panel::Faq);
        Ok(())
    }

    /// Explains the current elaboration target in more depth.
    pub async fn elaborate_concept(&mut self) -> Result<(), StudyError> {
        if self.concept_to_elaborate.trim().is_empty() {
            return Err(self.reject(Severity::Info, self.texts.no_concept_to_elaborate.clone()));
        }
        self.require_content(|t| &t.no_content_for_elaboration)?;

        let instructions = prompt::build(
            &Operation::ElaborateConcept {
                concept: &self.concept_to_elaborate,
            },
            self.course(),
        );
        self.elaboration = self
            .ask_text(
                Control::Elaboration,
                instructions,
                true,
                self.texts.elaboration_failed.clone(),
            )
            .await?;
        self.open_panels.insert(Panel::Elaboration);
        Ok(())
    }

    pub async fn generate_analogies(&mut self) -> Result<(), StudyError> {
        if self.concept_to_elaborate.trim().is_empty() {
            return Err(self.reject(Severity::Info, self.texts.no_concept_for_analogies.clone()));
        }
        self.require_content(|t| &t.no_content_for_analogies)?;

        let instructions = prompt::build(
            &Operation::GenerateAnalogies {
                concept: &self.concept_to_elaborate,
            },
            self.course(),
        );
        self.analogies = self
            .ask_text(
                Control::Analogies,
                instructions,
                true,
                self.texts.analogies_failed.clone(),
            )
            .await?;
        self.open_panels.insert(Panel::Analogies);
        Ok(())
    }

    /// Elaborates on an explicitly named concept instead of the current target.
    pub async fn elaborate(&mut self, concept: impl Into<String>) -> Result<(), StudyError> {
        self.concept_to_elaborate = concept.into();
        self.elaborate_concept().await
    }

    /// Analogies for an explicitly named concept instead of the current target.
    pub async fn analogies_for(&mut self, concept: impl Into<String>) -> Result<(), StudyError> {
        self.concept_to_elaborate = concept.into();
        self.generate_analogies().await
    }

    pub async fn generate_flashcards(&mut self) -> Result<(), StudyError> {
        self.require_content(|t| &t.no_content_for_action)?;

        let instructions = prompt::build(&Operation::GenerateFlashcards, self.course());
        self.loading.insert(Control::Flashcards);
        let result = self
            .gateway
            .structured::<FlashcardsPayload>(
                build_content(&instructions, Some(&self.content)),
                prompt::flashcards_schema(),
            )
            .await;
        self.loading.remove(&Control::Flashcards);

        let failed = self.texts.flashcards_failed.clone();
        match result {
            Ok(Some(FlashcardsPayload {
                flashcards: Some(cards),
            })) if !cards.is_empty() => {
                info!("Received {} flashcards", cards.len());
                self.deck = FlashcardDeck::new(cards);
                self.open_panels.insert(Panel::Flashcards);
                Ok(())
            }
            Ok(Some(_)) => {
                let message = self.texts.invalid_flashcards.clone();
                self.post(Notice::warning(message.clone()));
                Err(StudyError::InvalidData(message))
            }
            Ok(None) => Err(self.fail(
                &failed,
                StudyError::InvalidData(self.texts.invalid_structured_response.clone()),
            )),
            Err(err) => Err(self.fail(&failed, err.into())),
        }
    }

    /// Builds a concept map from the material.
    ///
    /// With an image loaded, the image is described first and the description is
    /// placed before the study text. If the description fails nothing else is sent.
    pub async fn generate_semantic_map(&mut self) -> Result<(), StudyError> {
        if !self.capabilities.is_available(Capability::GraphRenderer) {
            let message = self.texts.graph_not_loaded.clone();
            self.post(Notice::warning(message));
            return Err(StudyError::CapabilityUnavailable(Capability::GraphRenderer));
        }
        self.require_content(|t| &t.no_content_for_action)?;

        self.semantic_map = None;
        self.open_panels.remove(&Panel::SemanticMap);
        self.loading.insert(Control::SemanticMap);
        let result = self.semantic_map_inner().await;
        self.loading.remove(&Control::SemanticMap);
        result
    }

    async fn semantic_map_inner(&mut self) -> Result<(), StudyError> {
        let mut description = String::new();
        if self.content.has_image() {
            self.post(Notice::info(self.texts.describing_image_for_map.clone()));
            let instructions = prompt::build(&Operation::DescribeImageForMap, self.course());
            let described = self
                .gateway
                .text(build_content(&instructions, Some(&self.content)))
                .await;
            match described {
                Ok(text) => {
                    description = text;
                    self.post(Notice::success(self.texts.image_description_success.clone()));
                }
                Err(err) => {
                    let failed = self.texts.image_description_error.clone();
                    return Err(self.fail(&failed, err.into()));
                }
            }
        }

        let effective_text = format!("{description}\n\n{}", self.content.text)
            .trim()
            .to_string();
        if effective_text.is_empty() {
            return Err(self.reject(Severity::Warning, self.texts.no_content_for_action.clone()));
        }

        let instructions = prompt::build(
            &Operation::GenerateSemanticMap {
                effective_text: &effective_text,
            },
            self.course(),
        );
        let result = self
            .gateway
            .structured::<SemanticMapPayload>(
                build_content(&instructions, None),
                prompt::semantic_map_schema(),
            )
            .await;

        let failed = self.texts.semantic_map_failed.clone();
        match result {
            Ok(Some(SemanticMapPayload {
                nodes: Some(nodes),
                edges: Some(edges),
            })) => {
                info!("Concept map with {} nodes, {} edges", nodes.len(), edges.len());
                self.semantic_map = Some(SemanticMap { nodes, edges });
                self.open_panels.insert(Panel::SemanticMap);
                Ok(())
            }
            Ok(Some(_)) => {
                let message = self.texts.no_semantic_map_data.clone();
                self.post(Notice::error(message.clone()));
                Err(StudyError::InvalidData(message))
            }
            Ok(None) => Err(self.fail(
                &failed,
                StudyError::InvalidData(self.texts.invalid_structured_response.clone()),
            )),
            Err(err) => Err(self.fail(&failed, err.into())),
        }
    }

    /// Writes the current concept map as a standalone HTML document.
    pub async fn export_semantic_map(
        &mut self,
        path: Option<&Path>,
    ) -> Result<PathBuf, StudyError> {
        let Some(map) = self.semantic_map.as_ref() else {
            return Err(self.reject(Severity::Warning, self.texts.no_map_to_export.clone()));
        };
        let result =
            export::export_map_html(map, &self.config, &self.texts.semantic_map_title, path).await;
        match result {
            Ok(written) => {
                let shown = written.display().to_string();
                self.post(Notice::success(fill(&self.texts.map_exported, "path", &shown)));
                Ok(written)
            }
            Err(err) => {
                self.post(Notice::from(&err));
                Err(err)
            }
        }
    }

    // ---- flashcard viewer --------------------------------------------------

    pub fn flip_card(&mut self) {
        self.deck.flip();
    }

    pub fn next_card(&mut self) {
        self.deck.next();
    }

    pub fn prev_card(&mut self) {
        self.deck.prev();
    }

    pub fn shuffle_cards(&mut self) {
        self.deck.shuffle(&mut rand::thread_rng());
    }

    // ---- clipboard ---------------------------------------------------------

    /// The report and suggestions in their copyable layout, or `None` if both are empty.
    pub fn report_copy_text(&self) -> Option<String> {
        if self.report.report.is_empty() && self.report.suggestions.is_empty() {
            return None;
        }
        let text = format!(
            "{}\n=====================\n{}\n\n{}\n=====================\n{}",
            self.texts.report_results_title,
            self.report.report,
            self.texts.study_suggestions_title,
            self.report.suggestions
        );
        Some(text.trim().to_string())
    }

    /// Copies a result to the clipboard and posts the outcome.
    pub fn copy(&mut self, item: CopyItem) -> Notice {
        let (text, label) = match item {
            CopyItem::Summary => (Some(self.summary.clone()), &self.texts.summary_title),
            CopyItem::Faq => (Some(self.faq.clone()), &self.texts.faq_title),
            CopyItem::Elaboration => (
                Some(self.elaboration.clone()),
                &self.texts.elaboration_title,
            ),
            CopyItem::Analogies => (Some(self.analogies.clone()), &self.texts.analogies_title),
            CopyItem::Report => (self.report_copy_text(), &self.texts.report_title),
        };
        let notice = self.clipboard.copy(text.as_deref(), label, &self.texts);
        self.post(notice.clone());
        notice
    }

    // ---- session ---------------------------------------------------------

    /// Asks for confirmation before a restart.
    pub fn request_restart(&mut self) -> &str {
        self.restart_pending = true;
        &self.texts.confirm_restart
    }

    pub fn cancel_restart(&mut self) {
        self.restart_pending = false;
    }

    /// Restarts the session if a restart was requested. Returns whether it happened.
    pub fn confirm_restart(&mut self) -> bool {
        if !self.restart_pending {
            return false;
        }
        self.reset();
        self.post(Notice::info(self.texts.session_restarted.clone()));
        info!("Session restarted");
        true
    }

    fn reset(&mut self) {
        self.content = StudyContent::default();
        self.practice = PracticeState::default();
        self.history.clear();
        self.asked_questions.clear();
        self.covered_concepts.clear();
        self.counters = Counters::default();
        self.concept_to_elaborate.clear();
        self.report = ReportState::default();
        self.summary.clear();
        self.faq.clear();
        self.elaboration.clear();
        self.analogies.clear();
        self.deck = FlashcardDeck::default();
        self.semantic_map = None;
        self.open_panels.clear();
        self.loading.clear();
        self.restart_pending = false;
        self.focus_mode = false;
    }

    pub fn toggle_focus_mode(&mut self) -> bool {
        self.focus_mode = !self.focus_mode;
        let message = if self.focus_mode {
            self.texts.focus_mode_active.clone()
        } else {
            self.texts.focus_mode_inactive.clone()
        };
        self.post(Notice::info(message));
        self.focus_mode
    }

    // ---- helpers -----------------------------------------------------------

    fn post(&mut self, notice: Notice) {
        self.notices.post(notice);
    }

    /// Posts a precondition notice and returns the matching validation error.
    fn reject(&mut self, severity: Severity, message: String) -> StudyError {
        self.post(Notice::new(severity, message.clone()));
        StudyError::Validation(message)
    }

    fn require_content(
        &mut self,
        message: impl FnOnce(&UiTexts) -> &String,
    ) -> Result<(), StudyError> {
        if self.content.is_empty() {
            let message = message(&self.texts).clone();
            return Err(self.reject(Severity::Warning, message));
        }
        Ok(())
    }

    /// Posts `"<operation message> <cause>"` and hands the error back.
    fn fail(&mut self, operation_message: &str, err: StudyError) -> StudyError {
        let notice = Notice::from(&err);
        self.post(Notice::new(
            notice.severity,
            format!("{operation_message} {}", notice.message),
        ));
        err
    }

    /// One free-text call with the loading flag held for its duration.
    async fn ask_text(
        &mut self,
        control: Control,
        instructions: String,
        with_material: bool,
        failed: String,
    ) -> Result<String, StudyError> {
        self.loading.insert(control);
        let material = with_material.then_some(&self.content);
        let result = self
            .gateway
            .text(build_content(&instructions, material))
            .await;
        self.loading.remove(&control);
        result.map_err(|err| self.fail(&failed, err.into()))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::CopyTarget;
    use crate::error::{ErrorKind, GatewayError};
    use crate::gateway::testing::ScriptedTransport;
    use crate::gemini::Part;
    use crate::models::{ImageData, PracticePhase};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemoryClipboard(Arc<Mutex<Vec<String>>>);

    impl CopyTarget for MemoryClipboard {
        fn copy(&mut self, text: &str) -> Result<(), String> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn registry(capabilities: &[Capability]) -> &'static CapabilityRegistry {
        let registry: &'static CapabilityRegistry =
            Box::leak(Box::new(CapabilityRegistry::new()));
        registry.init(capabilities.iter().copied()).unwrap();
        registry
    }

    fn orchestrator(transport: ScriptedTransport) -> Orchestrator<ScriptedTransport> {
        orchestrator_with(transport, &[Capability::GraphRenderer], MemoryClipboard::default())
    }

    fn orchestrator_with(
        transport: ScriptedTransport,
        capabilities: &[Capability],
        clipboard: MemoryClipboard,
    ) -> Orchestrator<ScriptedTransport> {
        Orchestrator::new(
            RepasoConfig::default(),
            UiTexts::default(),
            transport,
            registry(capabilities),
            Clipboard::new(Box::new(clipboard), None),
        )
    }

    fn image() -> ImageData {
        ImageData {
            bytes: vec![137, 80, 78, 71],
            mime_type: "image/png".into(),
        }
    }

    fn requests(orch: &Orchestrator<ScriptedTransport>) -> usize {
        orch.gateway().transport().request_count()
    }

    fn last_notice(orch: &Orchestrator<ScriptedTransport>) -> Notice {
        orch.notices().last().cloned().unwrap()
    }

    #[test]
    fn test_extract_concept_strips_every_tag() {
        let (question, concept) =
            extract_concept("¿Qué hace la mitocondria? (Concepto: Mitocondria) (concepto: Otra)");
        assert_eq!(question, "¿Qué hace la mitocondria?");
        assert_eq!(concept.as_deref(), Some("Mitocondria"));

        let (question, concept) = extract_concept("¿Sin etiqueta?");
        assert_eq!(question, "¿Sin etiqueta?");
        assert!(concept.is_none());
    }

    #[tokio::test]
    async fn test_question_without_content_is_rejected() {
        let mut orch = orchestrator(ScriptedTransport::new().reply_text("¿Nunca?"));

        let err = orch.generate_question().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(last_notice(&orch).severity, Severity::Warning);
        assert_eq!(orch.practice().current_question, "");
        assert_eq!(requests(&orch), 0);
    }

    #[tokio::test]
    async fn test_random_type_is_announced() {
        let mut orch = orchestrator(ScriptedTransport::new().reply_text("¿Qué es el ADN?"));
        orch.set_text("El ADN guarda la información genética.");

        orch.generate_question().await.unwrap();
        let notices = orch.drain_notices();
        assert!(notices[0].message.starts_with("Tipo de pregunta elegido al azar: "));
        assert_eq!(orch.practice().current_question, "¿Qué es el ADN?");
        assert_eq!(orch.concept_to_elaborate(), "¿Qué es el ADN?");
        assert!(orch.asked_questions().contains("¿Qué es el ADN?"));
        assert!(!orch.is_loading(Control::Practice));

        let request = &orch.gateway().transport().requests()[0];
        assert_eq!(request.parts().len(), 2);
    }

    #[tokio::test]
    async fn test_guided_question_tracks_concepts() {
        let transport = ScriptedTransport::new()
            .reply_text("¿Qué función cumple la mitocondria? (Concepto: Mitocondria)")
            .reply_text("¿Qué contiene el núcleo? (Concepto: Núcleo)");
        let mut orch = orchestrator(transport);
        orch.set_text("La célula tiene mitocondrias y núcleo.");
        orch.set_study_mode(StudyMode::Guided);
        orch.set_question_type(QuestionType::Definition);

        orch.generate_question().await.unwrap();
        assert_eq!(
            orch.practice().current_question,
            "¿Qué función cumple la mitocondria?"
        );
        assert!(!orch.practice().current_question.contains("(Concepto:"));
        assert!(orch.covered_concepts().contains("Mitocondria"));
        assert_eq!(orch.concept_to_elaborate(), "Mitocondria");
        assert!(orch.notices().is_empty());

        orch.generate_question().await.unwrap();
        let second = orch.gateway().transport().instructions(1);
        assert!(second.contains("Conceptos ya cubiertos: [Mitocondria]"));
        assert!(second.contains("¿Qué función cumple la mitocondria?"));
        assert_eq!(orch.covered_concepts().len(), 2);
    }

    #[tokio::test]
    async fn test_evaluate_requires_question_and_answer() {
        let mut orch = orchestrator(ScriptedTransport::new());
        orch.set_text("Material");
        orch.set_answer("algo");

        assert!(orch.evaluate_answer().await.is_err());
        assert_eq!(last_notice(&orch).severity, Severity::Warning);
        assert_eq!(requests(&orch), 0);
    }

    #[tokio::test]
    async fn test_blank_answer_is_rejected() {
        let mut orch = orchestrator(ScriptedTransport::new().reply_text("¿Pregunta?"));
        orch.set_text("Material");
        orch.set_question_type(QuestionType::General);
        orch.generate_question().await.unwrap();
        orch.set_answer("   ");

        assert!(orch.evaluate_answer().await.is_err());
        assert_eq!(requests(&orch), 1);
        assert!(orch.history().is_empty());
    }

    #[tokio::test]
    async fn test_counters_match_history() {
        let transport = ScriptedTransport::new()
            .reply_text("¿Qué es un átomo?")
            .reply_text("Correcto. Es la unidad básica de la materia.")
            .reply_text("¿Qué es un ion?")
            .reply_text("Incorrecto. Un ion es un átomo con carga.");
        let mut orch = orchestrator(transport);
        orch.set_text("Química básica");
        orch.set_question_type(QuestionType::General);

        orch.generate_question().await.unwrap();
        orch.set_answer("La parte más pequeña");
        let verdict = orch.evaluate_answer().await.unwrap();
        assert!(verdict.is_correct);
        assert_eq!(orch.practice().phase(), PracticePhase::Evaluated);
        assert_eq!(
            orch.practice().feedback,
            "Es la unidad básica de la materia."
        );

        orch.generate_question().await.unwrap();
        assert_eq!(orch.practice().phase(), PracticePhase::QuestionGenerated);
        orch.set_answer("Una molécula");
        assert!(!orch.evaluate_answer().await.unwrap().is_correct);

        let counters = orch.counters();
        assert_eq!((counters.correct, counters.incorrect), (1, 1));
        assert_eq!(counters.total() as usize, orch.history().len());
        assert_eq!(orch.history()[1].user_answer, "Una molécula");
        assert_eq!(orch.concept_to_elaborate(), "¿Qué es un ion?");
    }

    #[tokio::test]
    async fn test_report_needs_history() {
        let mut orch = orchestrator(ScriptedTransport::new());
        let err = orch.generate_report().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(last_notice(&orch).severity, Severity::Info);
        assert_eq!(requests(&orch), 0);
    }

    #[tokio::test]
    async fn test_report_halves_fail_independently() {
        let transport = ScriptedTransport::new()
            .reply_text("¿Qué es la célula?")
            .reply_text("Correcto. Bien.")
            .reply(Err(GatewayError::Network("sin red".into())))
            .reply_text("- Repasa la membrana");
        let mut orch = orchestrator(transport);
        orch.set_text("Biología");
        orch.set_question_type(QuestionType::General);
        orch.generate_question().await.unwrap();
        orch.set_answer("La unidad de vida");
        orch.evaluate_answer().await.unwrap();

        orch.generate_report().await.unwrap();
        assert_eq!(requests(&orch), 4);
        assert_eq!(orch.report().report, "Error al generar informe.");
        assert_eq!(orch.report().suggestions, "- Repasa la membrana");
        assert!(orch.is_panel_open(Panel::Report));
        assert!(!orch.is_loading(Control::Report));
        assert!(
            orch.notices()
                .iter()
                .any(|n| n.severity == Severity::Error
                    && n.message.starts_with("No se pudo generar el informe."))
        );

        let report_prompt = orch.gateway().transport().requests()[2].clone();
        assert_eq!(report_prompt.parts().len(), 1);
    }

    #[tokio::test]
    async fn test_elaboration_preconditions() {
        let mut orch = orchestrator(ScriptedTransport::new().reply_text("¿Qué es X?"));

        orch.elaborate_concept().await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().no_concept_to_elaborate);

        orch.set_text("Material sobre X");
        orch.set_question_type(QuestionType::General);
        orch.generate_question().await.unwrap();
        orch.set_text("");
        orch.generate_analogies().await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().no_content_for_analogies);
        assert_eq!(requests(&orch), 1);
    }

    #[tokio::test]
    async fn test_failure_notice_combines_messages() {
        let mut orch = orchestrator(ScriptedTransport::new().reply(Err(GatewayError::Truncated)));
        orch.set_text("Material");

        let err = orch.generate_summary().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        let notice = last_notice(&orch);
        assert_eq!(notice.severity, Severity::Error);
        assert!(notice.message.starts_with("No se pudo generar el resumen."));
        assert!(notice.message.contains("demasiado larga"));
        assert!(!orch.is_loading(Control::Summary));
        assert!(!orch.is_panel_open(Panel::Summary));
    }

    #[tokio::test]
    async fn test_empty_flashcards_are_rejected() {
        let transport = ScriptedTransport::new()
            .reply_text(r#"{"flashcards": []}"#)
            .reply_text(r#"{"flashcards": [{"front": "ADN", "back": "Ácido desoxirribonucleico"}]}"#);
        let mut orch = orchestrator(transport);
        orch.set_text("Genética");

        orch.generate_flashcards().await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().invalid_flashcards);
        assert_eq!(last_notice(&orch).severity, Severity::Warning);
        assert!(!orch.is_panel_open(Panel::Flashcards));

        orch.generate_flashcards().await.unwrap();
        assert_eq!(orch.deck().len(), 1);
        assert!(orch.is_panel_open(Panel::Flashcards));
        orch.flip_card();
        assert_eq!(orch.deck().visible_side(), Some("Ácido desoxirribonucleico"));
    }

    #[tokio::test]
    async fn test_map_with_image_only_stops_when_description_fails() {
        let transport = ScriptedTransport::new()
            .reply(Err(GatewayError::SafetyFiltered))
            .reply_text(r#"{"nodes": [], "edges": []}"#);
        let mut orch = orchestrator(transport);
        orch.content.image = Some(image());

        orch.generate_semantic_map().await.unwrap_err();
        assert_eq!(requests(&orch), 1);
        assert!(!orch.is_loading(Control::SemanticMap));
        assert!(orch.semantic_map().is_none());
        let notice = last_notice(&orch);
        assert_eq!(notice.severity, Severity::Error);
        assert!(notice.message.starts_with("No se pudo describir la imagen."));
    }

    #[tokio::test]
    async fn test_map_prepends_image_description() {
        let transport = ScriptedTransport::new()
            .reply_text("Un diagrama de una célula.")
            .reply_text(
                r#"{"nodes": [{"id": "1", "label": "Célula"}, {"id": "2", "label": "Núcleo"}],
                    "edges": [{"from": "1", "to": "2", "label": "contiene"}]}"#,
            );
        let mut orch = orchestrator(transport);
        orch.set_text("Apuntes de biología");
        orch.content.image = Some(image());

        orch.generate_semantic_map().await.unwrap();
        let requests = orch.gateway().transport().requests();
        assert_eq!(requests.len(), 2);
        assert!(matches!(requests[0].parts()[0], Part::InlineData { .. }));
        assert_eq!(requests[1].parts().len(), 1);
        assert!(
            orch.gateway()
                .transport()
                .instructions(1)
                .contains("Un diagrama de una célula.\n\nApuntes de biología")
        );
        assert_eq!(orch.semantic_map().unwrap().nodes.len(), 2);
        assert!(orch.is_panel_open(Panel::SemanticMap));
    }

    #[tokio::test]
    async fn test_map_without_edges_is_no_data() {
        let mut orch = orchestrator(
            ScriptedTransport::new().reply_text(r#"{"nodes": [{"id": "1", "label": "A"}]}"#),
        );
        orch.set_text("Texto");

        orch.generate_semantic_map().await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().no_semantic_map_data);
        assert!(orch.semantic_map().is_none());
    }

    #[tokio::test]
    async fn test_map_needs_graph_renderer() {
        let mut orch = orchestrator_with(ScriptedTransport::new(), &[], MemoryClipboard::default());
        orch.set_text("Texto");

        let err = orch.generate_semantic_map().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
        assert_eq!(requests(&orch), 0);
    }

    #[tokio::test]
    async fn test_unsupported_document_keeps_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.rtf");
        std::fs::write(&path, "{\\rtf1}").unwrap();
        let mut orch = orchestrator(ScriptedTransport::new());
        orch.set_text("Texto previo");

        orch.load_document(&path).await.unwrap_err();
        assert_eq!(orch.content().text, "Texto previo");
        assert!(last_notice(&orch).message.contains("no soportado"));
    }

    #[tokio::test]
    async fn test_missing_pdf_capability_uses_its_notice() {
        let mut orch = orchestrator_with(ScriptedTransport::new(), &[], MemoryClipboard::default());
        orch.load_document("/no/existe/tema.pdf").await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().pdf_not_loaded);
    }

    #[tokio::test]
    async fn test_restart_cancel_then_confirm() {
        let transport = ScriptedTransport::new()
            .reply_text("¿Qué hace el ribosoma? (Concepto: Ribosoma)")
            .reply_text("Correcto. Sintetiza proteínas.")
            .reply_text(r#"{"flashcards": [{"front": "ARN", "back": "Ácido ribonucleico"}]}"#)
            .reply_text(r#"{"nodes": [{"id": "1", "label": "Ribosoma"}], "edges": []}"#)
            .reply_text("Resumen breve");
        let mut orch = orchestrator(transport);
        orch.set_text("Material");
        orch.set_study_mode(StudyMode::Guided);
        orch.set_question_type(QuestionType::TrueFalse);
        orch.generate_question().await.unwrap();
        orch.set_answer("Fabrica proteínas");
        orch.evaluate_answer().await.unwrap();
        orch.generate_flashcards().await.unwrap();
        orch.generate_semantic_map().await.unwrap();
        orch.generate_summary().await.unwrap();
        orch.report = ReportState {
            report: "Vas bien.".into(),
            suggestions: "- Repasa ARN".into(),
        };
        orch.toggle_focus_mode();

        assert_eq!(orch.counters().correct, 1);
        assert!(orch.covered_concepts().contains("Ribosoma"));
        assert_eq!(orch.deck().len(), 1);
        assert!(orch.semantic_map().is_some());

        orch.request_restart();
        orch.cancel_restart();
        assert!(!orch.confirm_restart());
        assert_eq!(orch.summary(), "Resumen breve");
        assert_eq!(orch.history().len(), 1);
        assert!(orch.is_panel_open(Panel::Summary));

        orch.request_restart();
        assert!(orch.confirm_restart());
        assert_eq!(orch.content(), &StudyContent::default());
        assert_eq!(orch.practice(), &PracticeState::default());
        assert_eq!(orch.practice().question_type, QuestionType::Random);
        assert_eq!(orch.practice().study_mode, StudyMode::Random);
        assert_eq!(orch.summary(), "");
        assert!(orch.history().is_empty());
        assert!(orch.asked_questions().is_empty());
        assert!(orch.covered_concepts().is_empty());
        assert_eq!(orch.counters(), Counters::default());
        assert_eq!(orch.concept_to_elaborate(), "");
        assert!(orch.deck().is_empty());
        assert!(orch.semantic_map().is_none());
        assert_eq!(orch.report(), &ReportState::default());
        assert!(!orch.is_panel_open(Panel::Summary));
        assert!(!orch.is_panel_open(Panel::Flashcards));
        assert!(!orch.is_panel_open(Panel::SemanticMap));
        assert!(!orch.focus_mode());
        assert!(!orch.restart_pending());
        let notice = last_notice(&orch);
        assert_eq!(notice.message, UiTexts::default().session_restarted);
        assert_eq!(notice.severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_failed_map_regeneration_drops_previous_map() {
        let transport = ScriptedTransport::new()
            .reply_text(r#"{"nodes": [{"id": "1", "label": "Célula"}], "edges": []}"#)
            .reply(Err(GatewayError::Network("sin conexión".into())));
        let mut orch = orchestrator(transport);
        orch.set_text("Biología celular");
        orch.generate_semantic_map().await.unwrap();
        assert!(orch.is_panel_open(Panel::SemanticMap));

        orch.set_text("Química orgánica");
        orch.generate_semantic_map().await.unwrap_err();
        assert!(orch.semantic_map().is_none());
        assert!(!orch.is_panel_open(Panel::SemanticMap));
        assert!(!orch.is_loading(Control::SemanticMap));

        orch.drain_notices();
        orch.export_semantic_map(None).await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().no_map_to_export);
    }

    #[tokio::test]
    async fn test_copy_report_layout() {
        let clipboard = MemoryClipboard::default();
        let mut orch = orchestrator_with(
            ScriptedTransport::new(),
            &[Capability::GraphRenderer],
            clipboard.clone(),
        );

        let notice = orch.copy(CopyItem::Report);
        assert_eq!(notice.severity, Severity::Info);

        orch.report = ReportState {
            report: "Bien en genética.".into(),
            suggestions: "- Repasa mitosis".into(),
        };
        let notice = orch.copy(CopyItem::Report);
        assert_eq!(notice.severity, Severity::Success);
        assert_eq!(
            clipboard.0.lock().unwrap()[0],
            "Resultados de la sesión\n=====================\nBien en genética.\n\nSugerencias de estudio\n=====================\n- Repasa mitosis"
        );
    }

    #[tokio::test]
    async fn test_export_without_map_warns() {
        let mut orch = orchestrator(ScriptedTransport::new());
        orch.export_semantic_map(None).await.unwrap_err();
        assert_eq!(last_notice(&orch).message, UiTexts::default().no_map_to_export);
    }
}
