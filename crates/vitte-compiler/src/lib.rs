//! vitte-compiler — compilateur Pratt en une passe : source vers bytecode `vitte-core`.
//!
//! Pas d'AST : chaque règle de grammaire émet directement dans le `Chunk` de
//! la fonction en cours de compilation.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

mod compiler;
mod error;

pub use compiler::compile;
pub use error::CompileError;

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(src: &str) {
        if let Err(errs) = compile(src) {
            panic!("compilation inattendue en échec pour {src:?}: {errs:?}");
        }
    }

    fn err_contains(src: &str, needle: &str) {
        let errs = compile(src).expect_err("une erreur de compilation était attendue");
        assert!(
            errs.iter().any(|e| e.message().contains(needle)),
            "aucune erreur ne contient {needle:?}: {errs:?}"
        );
    }

    #[test]
    fn compiles_arithmetic_and_print() {
        ok("print 3 + 4 * 2;");
    }

    #[test]
    fn compiles_var_and_scopes() {
        ok("var x = 1; { var x = 2; print x; } print x;");
    }

    #[test]
    fn compiles_control_flow() {
        ok("var sum = 0; for (var i = 0; i < 11; i = i + 1) sum = sum + i; print sum;");
        ok("if (false) print \"bad\"; else print \"good\";");
        ok("var i = 0; while (i < 3) { print i; i = i + 1; }");
    }

    #[test]
    fn compiles_functions_and_recursion() {
        ok("fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } print fib(8);");
    }

    #[test]
    fn compiles_short_circuit() {
        ok("print false and (1 / 0);");
        ok("print true or (1 / 0);");
    }

    #[test]
    fn rejects_self_referential_initializer() {
        err_contains("{ var a = a; }", "own initializer");
    }

    #[test]
    fn rejects_duplicate_local() {
        err_contains("{ var a = 1; var a = 2; }", "already declared");
    }

    #[test]
    fn rejects_invalid_assignment_target() {
        err_contains("1 + 2 = 3;", "Invalid assignment target");
    }

    #[test]
    fn rejects_top_level_return() {
        err_contains("return 1;", "top-level");
    }

    #[test]
    fn rejects_too_many_constants() {
        let mut src = String::new();
        for i in 0..300 {
            src.push_str(&format!("var v{i} = {i};\n"));
        }
        err_contains(&src, "Too many constants");
    }

    #[test]
    fn rejects_unterminated_string() {
        err_contains("print \"abc;", "Unterminated string");
    }

    #[test]
    fn reports_expect_expression() {
        err_contains("print ;", "Expect expression");
    }
}
