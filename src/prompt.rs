//! # Prompt builder
//!
//! Pure functions that turn an [`Operation`] plus its context into the instruction
//! text sent to the model. No I/O, no state.
//!
//! Every prompt starts with the interaction-language directive, optionally followed by
//! the course calibration line, and then the operation-specific instructions. The
//! instruction text is always the **last** part of a request; study material travels
//! in separate parts (see [`crate::gateway::build_content`]), except for the concept
//! map where the effective text is embedded in the prompt itself.

use serde_json::{Value, json};

use crate::models::{Counters, QuestionType, SessionHistoryEntry, StudyMode, TextSet};

/// The single language every generated text must be in.
pub const INTERACTION_LANGUAGE: &str = "español";

/// Keywords the evaluation reply must start with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keywords {
    pub correct: &'static str,
    pub incorrect: &'static str,
}

pub const KEYWORDS: Keywords = Keywords {
    correct: "Correcto",
    incorrect: "Incorrecto",
};

/// Label that precedes the study text part of a request.
pub const STUDY_TEXT_LABEL: &str = "Contenido de estudio (texto):";

/// Everything the model can be asked to do, with the data each request needs.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    GenerateQuestion {
        /// Concrete type; `Random` is treated like `General`.
        question_type: QuestionType,
        study_mode: StudyMode,
        asked_questions: &'a TextSet,
        covered_concepts: &'a TextSet,
    },
    EvaluateAnswer {
        question: &'a str,
        answer: &'a str,
    },
    GenerateReport {
        history: &'a [SessionHistoryEntry],
        counters: Counters,
    },
    GenerateSuggestions {
        history: &'a [SessionHistoryEntry],
        counters: Counters,
    },
    GenerateSummary,
    ElaborateConcept {
        concept: &'a str,
    },
    GenerateFaq,
    GenerateAnalogies {
        concept: &'a str,
    },
    DescribeImageForMap,
    GenerateFlashcards,
    GenerateSemanticMap {
        effective_text: &'a str,
    },
}

/// Builds the instruction text for `operation`.
pub fn build(operation: &Operation<'_>, course: Option<&str>) -> String {
    let lang = INTERACTION_LANGUAGE;
    let mut prompt = format!("Responde ESTRICTA y EXCLUSIVAMENTE en el idioma: {lang}.\n");

    if let Some(course) = course.map(str::trim).filter(|c| !c.is_empty()) {
        prompt.push_str(&format!(
            "Adapta la complejidad y el lenguaje para un estudiante de {course}, pero mantén siempre la respuesta en {lang}.\n"
        ));
    }

    match *operation {
        Operation::GenerateQuestion {
            question_type,
            study_mode,
            asked_questions,
            covered_concepts,
        } => {
            prompt.push_str(
                "Genera una pregunta de comprensión concisa y clara sobre el contenido proporcionado.\n",
            );
            if !asked_questions.is_empty() {
                prompt.push_str(&format!(
                    "La pregunta NO puede ser ninguna de las siguientes: {}.\n",
                    asked_questions.join("; ")
                ));
            }
            if let Some(line) = question_type_instruction(question_type) {
                prompt.push_str(line);
            }
            if study_mode == StudyMode::Guided {
                prompt.push_str(&format!(
                    "Formula la pregunta sobre el siguiente concepto lógico o una sección del documento que todavía no se haya cubierto. Conceptos ya cubiertos: [{}]. Justo después de la pregunta indica el concepto que cubre con el formato exacto \"(Concepto: <nombre del concepto>)\". Ejemplo: \"¿Qué función cumple la mitocondria? (Concepto: Mitocondria)\"\n",
                    covered_concepts.join(", ")
                ));
            }
            prompt.push_str(&format!(
                "Recuerda: la pregunta y cualquier texto adicional deben estar en {lang}.\n"
            ));
        }
        Operation::EvaluateAnswer { question, answer } => {
            let Keywords { correct, incorrect } = KEYWORDS;
            prompt.push_str(&format!("Pregunta: \"{question}\"\n"));
            prompt.push_str(&format!("Respuesta del alumno: \"{answer}\"\n"));
            prompt.push_str(&format!(
                "IMPORTANTE: tu evaluación y explicación DEBEN estar EXCLUSIVAMENTE en {lang}, sin importar el idioma de la respuesta del alumno.\n"
            ));
            prompt.push_str(&format!(
                "Evalúa si la respuesta es {correct} o {incorrect} basándote estrictamente en el contenido proporcionado y en la pregunta. Tu respuesta DEBE empezar con la palabra clave '{correct}' si es correcta o '{incorrect}' si es incorrecta, seguida de un punto y después una explicación detallada. Si la pregunta era de opción múltiple y la respuesta es incorrecta, indica cuál era la opción correcta.\n"
            ));
        }
        Operation::GenerateReport { history, counters } => {
            prompt.push_str(&format!(
                "A partir del siguiente historial de preguntas y respuestas de un alumno, genera un informe conciso sobre sus puntos fuertes y débiles. Incluye el número total de respuestas correctas ({}) e incorrectas ({}).\n",
                counters.correct, counters.incorrect
            ));
            prompt.push_str(&format!("Historial de sesión: {}\n", history_json(history)));
            prompt.push_str(&format!("El informe completo debe estar en {lang}.\n"));
        }
        Operation::GenerateSuggestions { history, counters } => {
            prompt.push_str(&format!(
                "A partir del siguiente historial de preguntas y respuestas del alumno, que ha respondido {} correctamente y {} incorrectamente, sugiere áreas concretas del material (conceptos, secciones, temas) que debería repasar con más atención.\n",
                counters.correct, counters.incorrect
            ));
            prompt.push_str("Sé conciso y usa una lista simple.\n");
            prompt.push_str(&format!("Historial: {}\n", history_json(history)));
            prompt.push_str(&format!("Todas las sugerencias deben estar en {lang}.\n"));
        }
        Operation::GenerateSummary => {
            prompt.push_str(
                "Genera un resumen conciso y fácil de entender del material de estudio proporcionado (texto y/o imagen).\n",
            );
            prompt.push_str(&format!(
                "El resumen debe recoger las ideas principales y los puntos clave. Todo el resumen debe estar en {lang}.\n"
            ));
        }
        Operation::ElaborateConcept { concept } => {
            prompt.push_str(&format!(
                "Proporciona una explicación más detallada y clara sobre el siguiente tema, pregunta o concepto: \"{concept}\".\n"
            ));
            prompt.push_str("Usa el material de estudio proporcionado como base de la explicación.\n");
            prompt.push_str(&format!(
                "Si el material no contiene información directa, razona a partir de principios generales relacionados con el tema del material. La explicación completa debe estar en {lang}.\n"
            ));
        }
        Operation::GenerateFaq => {
            prompt.push_str(
                "Genera una lista exhaustiva de preguntas frecuentes (FAQ) relevantes con respuestas concisas basadas en el material de estudio proporcionado (texto y/o imagen). Cuanto más extenso sea el material, más preguntas debes generar.\n",
            );
            prompt.push_str("Formatea CADA pregunta y respuesta así, usando Markdown:\n");
            prompt.push_str("**Pregunta [Número]:** [Texto de la pregunta]\n");
            prompt.push_str("**Respuesta [Número]:** [Texto de la respuesta]\n\n");
            prompt.push_str(&format!(
                "Deja una línea en blanco entre cada par de pregunta y respuesta. Todas las preguntas y respuestas deben estar en {lang}.\n"
            ));
        }
        Operation::GenerateAnalogies { concept } => {
            prompt.push_str(&format!(
                "Genera 1 o 2 analogías o metáforas creativas y claras para explicar el siguiente concepto o pregunta: \"{concept}\".\n"
            ));
            prompt.push_str(
                "Las analogías deben ser fáciles de entender y relevantes para el concepto, de modo que lo simplifiquen.\n",
            );
            prompt.push_str(&format!(
                "Usa el material de estudio proporcionado como contexto. Todas las analogías deben estar en {lang}.\n"
            ));
        }
        Operation::DescribeImageForMap => {
            prompt.push_str(&format!(
                "Describe la imagen proporcionada con el mayor detalle posible: objetos, relaciones entre ellos, contexto y cualquier texto visible. La descripción se usará después para construir un mapa conceptual y debe estar en {lang}.\n"
            ));
        }
        Operation::GenerateFlashcards => {
            prompt.push_str(
                "Genera un conjunto de flashcards basadas en el material de estudio proporcionado (texto y/o imagen). Cada flashcard tiene un anverso (\"front\": término, concepto clave o pregunta breve) y un reverso (\"back\": definición, explicación o respuesta).\n",
            );
            prompt.push_str(
                "Genera entre 5 y 15 flashcards según la extensión y complejidad del material; más flashcards cuanto más extenso o complejo sea.\n",
            );
            prompt.push_str(&format!(
                "El texto de AMBOS lados de CADA flashcard debe estar en {lang}.\n"
            ));
            prompt.push_str(
                "Devuelve un objeto JSON con la clave \"flashcards\": una lista de objetos {\"front\", \"back\"}. Asegúrate de que el JSON sea válido y siga el esquema.\n",
            );
        }
        Operation::GenerateSemanticMap { effective_text } => {
            prompt.push_str(
                "Analiza el siguiente material de estudio (texto, descripción detallada de una imagen o ambos) y extrae los conceptos clave y sus relaciones para construir un mapa conceptual.\n",
            );
            prompt.push_str("El objetivo es visualizar las ideas principales y cómo se conectan entre sí.\n");
            prompt.push_str(
                "Identifica entre 5 y 15 nodos principales según la complejidad del material; para material muy corto pueden ser menos.\n",
            );
            prompt.push_str(&format!(
                "Las etiquetas de nodos y aristas deben estar en {lang}.\n\n"
            ));
            prompt.push_str(&format!(
                "MATERIAL DE ESTUDIO PROPORCIONADO:\n---\n{effective_text}\n---\n\n"
            ));
            prompt.push_str(
                "Devuelve un OBJETO JSON con dos claves: \"nodes\" (lista de nodos con \"id\", \"label\" y opcionalmente \"title\") y \"edges\" (lista de aristas con \"from\", \"to\" y opcionalmente \"label\" y \"arrows\"). Los \"id\" de los nodos deben ser únicos y las aristas deben referenciarlos correctamente.\n",
            );
        }
    }

    prompt
}

fn question_type_instruction(question_type: QuestionType) -> Option<&'static str> {
    match question_type {
        QuestionType::Random | QuestionType::General => None,
        QuestionType::Definition => {
            Some("La pregunta debe pedir la definición de un concepto clave.\n")
        }
        QuestionType::Relationship => {
            Some("La pregunta debe pedir la relación entre dos o más conceptos.\n")
        }
        QuestionType::Application => {
            Some("La pregunta debe pedir un ejemplo o una aplicación de un concepto.\n")
        }
        QuestionType::TrueFalse => Some(
            "La pregunta debe ser UNA ÚNICA afirmación de Verdadero/Falso que el alumno debe evaluar y justificar.\n",
        ),
        QuestionType::MultipleChoice => Some(
            "La pregunta debe ser de opción múltiple con 3 o 4 opciones (A, B, C, D) de las que SOLO UNA es correcta. Presenta claramente el enunciado y las opciones. No indiques cuál es la opción correcta en la pregunta.\n",
        ),
    }
}

fn history_json(history: &[SessionHistoryEntry]) -> String {
    serde_json::to_string_pretty(history).unwrap_or_else(|_| "[]".to_string())
}

/// Response schema for [`Operation::GenerateFlashcards`].
pub fn flashcards_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "flashcards": {
                "type": "ARRAY",
                "description": "Lista de flashcards.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "front": { "type": "STRING", "description": "Anverso: término, concepto o pregunta." },
                        "back": { "type": "STRING", "description": "Reverso: definición, explicación o respuesta." }
                    },
                    "required": ["front", "back"]
                }
            }
        },
        "required": ["flashcards"]
    })
}

/// Response schema for [`Operation::GenerateSemanticMap`].
pub fn semantic_map_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "nodes": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "label": { "type": "STRING" },
                        "title": { "type": "STRING" }
                    },
                    "required": ["id", "label"]
                }
            },
            "edges": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "from": { "type": "STRING" },
                        "to": { "type": "STRING" },
                        "label": { "type": "STRING" },
                        "arrows": { "type": "STRING" }
                    },
                    "required": ["from", "to"]
                }
            }
        },
        "required": ["nodes", "edges"]
    })
}
