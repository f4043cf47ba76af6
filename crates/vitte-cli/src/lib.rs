//! vitte-cli/src/lib.rs — cœur du binaire `vitte`.
//!
//! Zéro argument démarre un REPL ; un argument l'exécute comme fichier
//! source ; plus d'un argument est une erreur d'usage. Les codes de sortie
//! suivent `sysexits.h` : 64 (usage), 65 (erreur de compilation), 70 (erreur
//! d'exécution).

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use vitte_vm::{InterpretResult, StdoutHost, Vm};

const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "vitte", version, about = "Interpréteur du langage Vitte")]
struct Cli {
    /// Script à exécuter. Omis : démarre un REPL interactif.
    paths: Vec<PathBuf>,
}

/// Point d'entrée du binaire (appelé depuis `src/main.rs`).
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let code = match cli.paths.as_slice() {
        [] => run_repl(),
        [path] => run_file(path),
        _ => {
            eprintln!("Usage: vitte [script]");
            EX_USAGE
        }
    };
    ExitCode::from(code)
}

fn run_file(path: &PathBuf) -> u8 {
    log::debug!("reading {}", path.display());
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: cannot read {}: {err}", path.display());
            return EX_IOERR;
        }
    };
    let mut vm = Vm::with_host(StdoutHost);
    let code = report(vm.interpret(&source));
    log::info!("{} exited with status {code}", path.display());
    code
}

fn report(result: InterpretResult) -> u8 {
    match result {
        InterpretResult::Ok => 0,
        InterpretResult::CompileError(errors) => {
            for err in &errors {
                eprintln!("{err}");
            }
            EX_DATAERR
        }
        InterpretResult::RuntimeError(err) => {
            eprintln!("Error: {err}");
            EX_SOFTWARE
        }
    }
}

/// Si `line` n'est pas déjà une déclaration terminée (pas de `;` ni de `}`
/// final), on l'enveloppe dans `print (...)` : confort REPL classique pour
/// voir la valeur d'une expression tapée sans mot-clé `print`.
fn wrap_as_print_if_bare_expression(line: &str) -> String {
    let trimmed = line.trim_end();
    if trimmed.ends_with(';') || trimmed.ends_with('}') || trimmed.is_empty() {
        line.to_string()
    } else {
        format!("print ({trimmed});")
    }
}

fn run_repl() -> u8 {
    log::info!("starting REPL");
    let mut vm = Vm::with_host(StdoutHost);
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("Error: cannot start line editor: {err}");
            return EX_SOFTWARE;
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());
                let source = wrap_as_print_if_bare_expression(&line);
                match vm.interpret(&source) {
                    InterpretResult::Ok => {}
                    InterpretResult::CompileError(errors) => {
                        for err in &errors {
                            eprintln!("{err}");
                        }
                    }
                    InterpretResult::RuntimeError(err) => eprintln!("Error: {err}"),
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {err}");
                return EX_SOFTWARE;
            }
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_bare_expressions_but_not_statements() {
        assert_eq!(wrap_as_print_if_bare_expression("1 + 1"), "print (1 + 1);");
        assert_eq!(wrap_as_print_if_bare_expression("var x = 1;"), "var x = 1;");
        assert_eq!(wrap_as_print_if_bare_expression("{ print 1; }"), "{ print 1; }");
    }

    #[test]
    fn reports_compile_error_as_exit_65() {
        let mut vm = Vm::with_host(StdoutHost);
        assert_eq!(report(vm.interpret("print ;")), EX_DATAERR);
    }

    #[test]
    fn reports_runtime_error_as_exit_70() {
        let mut vm = Vm::with_host(StdoutHost);
        assert_eq!(report(vm.interpret("print missing;")), EX_SOFTWARE);
    }

    #[test]
    fn reports_success_as_exit_0() {
        let mut vm = Vm::with_host(StdoutHost);
        assert_eq!(report(vm.interpret("print 1;")), 0);
    }
}
