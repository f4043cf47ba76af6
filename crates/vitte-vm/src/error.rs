//! error.rs — fautes d'exécution. Pas de numéro de ligne : la VM n'a pas accès
//! à la table de lignes du compilateur au-delà du chunk en cours (hors scope).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VmError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    AddOperands,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("{0}")]
    Native(String),
}
