//! vitte-vm — machine virtuelle à pile pour le langage Vitte.
//!
//! Exécute le bytecode produit par `vitte-compiler` : une pile d'opérandes,
//! une pile de frames d'appel, des globales partagées par nom. Aucune
//! collecte cyclique n'est nécessaire — le langage n'a ni fermetures ni
//! classes, donc aucun cycle de références ne peut se former.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

mod error;
mod vm;

pub use error::VmError;
pub use vitte_core::{Function, NativeFn, Value};
pub use vm::{CapturingHost, Host, InterpretResult, StdoutHost, Vm, VmOptions};
