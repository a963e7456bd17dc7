//! # Error taxonomy
//!
//! Every failure the study assistant can surface falls into one of a handful of
//! categories ([`ErrorKind`]). The concrete error enums live next to the seams that
//! produce them:
//!
//! - [`GatewayError`]: anything that goes wrong talking to the generative-language
//!   service (missing credential, network, HTTP error envelopes, filtered or truncated
//!   output).
//! - [`crate::ingest::IngestError`]: reading and parsing uploaded material.
//! - [`StudyError`]: what the orchestrator hands back to the presentation layer.
//!
//! Each of them answers [`kind()`](StudyError::kind) so callers can pick a
//! notification severity without matching on every variant.

use crate::capabilities::Capability;
use crate::ingest::IngestError;

/// Top-level failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing access credential. Fatal for the whole session.
    Configuration,
    /// A precondition was not met; nothing was attempted.
    Validation,
    /// A parsing or rendering capability is not loaded.
    CapabilityUnavailable,
    /// Network failure, error envelope, filtered/truncated or undecodable output.
    Transport,
    /// Local file input/output.
    Io,
}

/// Errors returned by the AI gateway and its transports.
///
/// The display strings are user facing and written in the interaction language.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("La clave de API no está configurada. No se puede llamar a la IA.")]
    MissingCredential,

    #[error("Error al comunicarse con la IA: {0}")]
    Network(String),

    #[error("La IA respondió con un error ({status}): {message}")]
    Http { status: u16, message: String },

    #[error("No se pudo interpretar la respuesta de la IA: {0}")]
    Decode(String),

    #[error("Respuesta incompleta o bloqueada por IA: La respuesta fue demasiado larga.")]
    Truncated,

    #[error("Respuesta incompleta o bloqueada por IA: La respuesta fue bloqueada por motivos de seguridad.")]
    SafetyFiltered,

    #[error("Respuesta incompleta o bloqueada por IA: La respuesta fue bloqueada por recitación.")]
    RecitationFiltered,

    /// Any other non-`STOP` termination reason, carried verbatim.
    #[error("Respuesta incompleta o bloqueada por IA: {0}.")]
    Blocked(String),

    #[error("Respuesta inesperada o vacía de la IA.")]
    Empty,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::MissingCredential => ErrorKind::Configuration,
            _ => ErrorKind::Transport,
        }
    }
}

/// Errors produced by orchestrator operations.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    #[error("{0}")]
    Configuration(String),

    /// Precondition failure; the message is the notice that was shown.
    #[error("{0}")]
    Validation(String),

    #[error("{0} no está disponible")]
    CapabilityUnavailable(Capability),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The service answered but the structured payload was unusable.
    #[error("{0}")]
    InvalidData(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Error de entrada/salida: {0}")]
    Io(#[from] std::io::Error),
}

impl StudyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StudyError::Configuration(_) => ErrorKind::Configuration,
            StudyError::Validation(_) => ErrorKind::Validation,
            StudyError::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            StudyError::Gateway(e) => e.kind(),
            StudyError::InvalidData(_) => ErrorKind::Transport,
            StudyError::Ingest(e) => e.kind(),
            StudyError::Io(_) => ErrorKind::Io,
        }
    }
}
