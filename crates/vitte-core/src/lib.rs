//! vitte-core — valeurs, bytecode et scanner partagés par le compilateur et la VM.
//!
//! Ce crate ne contient aucune logique de compilation ni d'exécution : il
//! fournit juste le langage commun (`Value`, `Chunk`/`Op`, `Scanner`) que
//! `vitte-compiler` produit et que `vitte-vm` consomme.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod chunk;
pub mod scanner;
pub mod value;

pub use chunk::{Chunk, ConstPool, LineTable, Op};
pub use scanner::{Scanner, Token, TokenKind};
pub use value::{Function, NativeFn, Value};

/// Version du crate, utile pour les bannières CLI et les logs.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
