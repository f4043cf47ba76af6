//! error.rs — diagnostics de compilation (lexicaux et syntaxiques).

use thiserror::Error;

/// Une erreur survenue pendant le scan ou l'analyse syntaxique, avec la ligne
/// source où elle a été détectée. Le compilateur ne panique jamais sur une
/// entrée utilisateur malformée : toute erreur passe par cette structure.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// Erreur détectée par le scanner (caractère inattendu, chaîne non terminée).
    #[error("[line {line}] Error: {message}")]
    Lex { line: u32, message: String },

    /// Erreur détectée par le parseur ou la résolution de portée.
    #[error("[line {line}] Error: {message}")]
    Syntax { line: u32, message: String },
}

impl CompileError {
    pub fn line(&self) -> u32 {
        match self {
            CompileError::Lex { line, .. } | CompileError::Syntax { line, .. } => *line,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            CompileError::Lex { message, .. } | CompileError::Syntax { message, .. } => message,
        }
    }
}
