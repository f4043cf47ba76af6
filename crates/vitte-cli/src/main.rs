//! vitte-cli/src/main.rs — point d'entrée du binaire `vitte`.
//!
//! Prépare l'environnement (logs, rapports d'erreurs) puis délègue à
//! `vitte_cli::run()`, qui porte tout le code testable en unité.

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: could not install color-eyre: {e}");
    }
    env_logger::init();

    vitte_cli::run()
}
