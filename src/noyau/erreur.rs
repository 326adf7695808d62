// src/noyau/erreur.rs
//
// Une seule erreur pour tout le pipeline (jetons -> RPN -> validation -> arbre -> eval).
// Le message reste lisible tel quel ; la position (en caractères) est optionnelle.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{}", .position.map(|p| format!(" at position {p}")).unwrap_or_default())]
pub struct ExpressionError {
    message: String,
    position: Option<usize>,
}

impl ExpressionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    /// Erreur rattachée à un caractère de la source.
    pub fn at(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position: Some(position),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

pub type Result<T> = std::result::Result<T, ExpressionError>;
