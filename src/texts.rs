//! # User-facing message table
//!
//! Every notice, label and placeholder the study assistant shows lives in
//! [`UiTexts`]. The built-in values are Spanish (the fixed interaction language).
//! Any subset can be overridden from a YAML file stored next to `config.yaml`:
//!
//! ```text
//! <config_dir>/texts.yaml
//! ```
//!
//! ## Minimal YAML example
//!
//! ```yaml
//! session_restarted: "Sesión reiniciada. ¡A por otra ronda!"
//! copied_success: "{item} está en tu portapapeles."
//! ```
//!
//! Keys that are not present keep their default. Templates use `{name}` placeholders
//! which are filled with [`fill`].

use serde::{Deserialize, Serialize};
use std::{error::Error, fs, path::Path};

/// Replaces `{key}` in `template` with `value`.
pub fn fill(template: &str, key: &str, value: &str) -> String {
    template.replace(&format!("{{{key}}}"), value)
}

/// The message table.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct UiTexts {
    pub app_title: String,
    pub confirm_restart: String,
    pub session_restarted: String,

    // Material
    pub image_loaded: String,
    pub doc_loaded: String,
    pub invalid_image_file: String,
    pub pdf_not_loaded: String,
    pub docx_not_loaded: String,
    pub graph_not_loaded: String,

    // Preconditions
    pub no_content_to_generate: String,
    pub no_content_for_action: String,
    pub question_type_random: String,
    pub no_question_to_evaluate: String,
    pub no_history_for_report: String,
    pub no_concept_to_elaborate: String,
    pub no_content_for_elaboration: String,
    pub no_concept_for_analogies: String,
    pub no_content_for_analogies: String,

    // Structured outputs
    pub invalid_flashcards: String,
    pub no_semantic_map_data: String,
    pub invalid_structured_response: String,
    pub describing_image_for_map: String,
    pub image_description_success: String,
    pub image_description_error: String,
    pub map_exported: String,
    pub no_map_to_export: String,
    pub flashcard_of: String,

    // Operation failures
    pub question_failed: String,
    pub evaluation_failed: String,
    pub report_failed: String,
    pub suggestions_failed: String,
    pub summary_failed: String,
    pub faq_failed: String,
    pub elaboration_failed: String,
    pub analogies_failed: String,
    pub flashcards_failed: String,
    pub semantic_map_failed: String,
    pub report_placeholder: String,
    pub suggestions_placeholder: String,

    // Clipboard
    pub copied_success: String,
    pub copied_fallback: String,
    pub copied_error: String,
    pub copied_error_fallback: String,
    pub no_item_to_copy: String,

    // Titles / item labels
    pub summary_title: String,
    pub faq_title: String,
    pub elaboration_title: String,
    pub analogies_title: String,
    pub flashcards_title: String,
    pub semantic_map_title: String,
    pub report_title: String,
    pub report_results_title: String,
    pub study_suggestions_title: String,
    pub correct_label: String,
    pub incorrect_label: String,

    // Focus mode
    pub focus_mode_active: String,
    pub focus_mode_inactive: String,
}

impl Default for UiTexts {
    fn default() -> Self {
        Self {
            app_title: "Repaso".into(),
            confirm_restart:
                "¿Seguro que quieres reiniciar la sesión? Se perderá todo el progreso actual."
                    .into(),
            session_restarted: "Sesión reiniciada.".into(),

            image_loaded: "Imagen '{fileName}' cargada correctamente.".into(),
            doc_loaded: "Documento '{fileName}' cargado correctamente.".into(),
            invalid_image_file: "Por favor, carga un archivo de imagen válido.".into(),
            pdf_not_loaded: "La librería de PDF no está cargada. No se pueden procesar PDFs."
                .into(),
            docx_not_loaded:
                "La librería de DOCX no está cargada. No se pueden procesar documentos Word."
                    .into(),
            graph_not_loaded:
                "El visor de mapas conceptuales no está disponible. Revisa graph_script_url."
                    .into(),

            no_content_to_generate:
                "Carga material de estudio (texto, documento o imagen) antes de generar preguntas."
                    .into(),
            no_content_for_action:
                "No hay material de estudio cargado para realizar esta acción.".into(),
            question_type_random: "Tipo de pregunta elegido al azar: {type}".into(),
            no_question_to_evaluate:
                "Genera una pregunta y escribe tu respuesta antes de comprobarla.".into(),
            no_history_for_report:
                "Responde al menos una pregunta para poder generar el informe.".into(),
            no_concept_to_elaborate: "No hay ningún concepto o pregunta para explicar.".into(),
            no_content_for_elaboration:
                "Se necesita material de estudio para ampliar la explicación.".into(),
            no_concept_for_analogies:
                "No hay ningún concepto o pregunta para crear analogías.".into(),
            no_content_for_analogies:
                "Se necesita material de estudio para crear analogías.".into(),

            invalid_flashcards: "Las flashcards recibidas no son válidas o están vacías.".into(),
            no_semantic_map_data: "No se recibieron datos válidos para el mapa conceptual.".into(),
            invalid_structured_response: "La respuesta de la IA no tiene un formato válido."
                .into(),
            describing_image_for_map: "Analizando la imagen para el mapa conceptual...".into(),
            image_description_success: "Imagen analizada correctamente.".into(),
            image_description_error: "No se pudo describir la imagen.".into(),
            map_exported: "Mapa conceptual guardado en {path}.".into(),
            no_map_to_export: "No hay datos del mapa para generar el HTML.".into(),
            flashcard_of: "Tarjeta {current} de {total}".into(),

            question_failed: "No se pudo generar la pregunta.".into(),
            evaluation_failed: "No se pudo evaluar la respuesta.".into(),
            report_failed: "No se pudo generar el informe.".into(),
            suggestions_failed: "No se pudieron generar sugerencias.".into(),
            summary_failed: "No se pudo generar el resumen.".into(),
            faq_failed: "No se pudieron generar las FAQs.".into(),
            elaboration_failed: "No se pudo generar la explicación.".into(),
            analogies_failed: "No se pudieron generar las analogías.".into(),
            flashcards_failed: "No se pudieron generar las flashcards.".into(),
            semantic_map_failed: "No se pudo generar el mapa conceptual.".into(),
            report_placeholder: "Error al generar informe.".into(),
            suggestions_placeholder: "Error al generar sugerencias.".into(),

            copied_success: "{item} copiado al portapapeles.".into(),
            copied_fallback: "{item} copiado al portapapeles (método alternativo).".into(),
            copied_error: "No se pudo copiar {item}.".into(),
            copied_error_fallback: "Error al copiar {item} con el método alternativo.".into(),
            no_item_to_copy: "No hay {item} para copiar.".into(),

            summary_title: "Resumen".into(),
            faq_title: "Preguntas frecuentes".into(),
            elaboration_title: "Explicación".into(),
            analogies_title: "Analogías".into(),
            flashcards_title: "Flashcards".into(),
            semantic_map_title: "Mapa conceptual".into(),
            report_title: "Informe".into(),
            report_results_title: "Resultados de la sesión".into(),
            study_suggestions_title: "Sugerencias de estudio".into(),
            correct_label: "¡Correcto!".into(),
            incorrect_label: "Incorrecto".into(),

            focus_mode_active: "Modo enfoque activado.".into(),
            focus_mode_inactive: "Modo enfoque desactivado.".into(),
        }
    }
}

/// Loads a message table from a YAML file. Missing keys keep their defaults.
pub fn load_texts(path: impl AsRef<Path>) -> Result<UiTexts, Box<dyn Error>> {
    let path = path.as_ref();
    tracing::info!("Loading texts: {}", path.display());
    let content = fs::read_to_string(path)?;
    let texts: UiTexts = serde_yaml::from_str(&content)?;
    Ok(texts)
}

/// Loads the table if the file exists; otherwise returns the built-in defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<UiTexts, Box<dyn Error>> {
    let path = path.as_ref();
    if path.exists() {
        load_texts(path)
    } else {
        Ok(UiTexts::default())
    }
}
