//! Scénarios de bout en bout : une source, un `Vm::interpret`, une sortie.

use vitte_vm::{CapturingHost, InterpretResult, Vm};

fn printed(source: &str) -> Vec<String> {
    let mut vm = Vm::with_host(CapturingHost::default());
    let result = vm.interpret(source);
    assert!(result.is_ok(), "interprétation inattendue en échec: {result:?}");
    vm.host_mut().lines.clone()
}

#[test]
fn arithmetic() {
    assert_eq!(printed("print 3 + 4;"), vec!["7"]);
}

#[test]
fn variable_reassignment() {
    assert_eq!(printed("var x = \"hello\"; x = \"world\"; print x;"), vec!["world"]);
}

#[test]
fn for_loop_sums_zero_to_ten() {
    let source = "var sum = 0; for (var i = 0; i < 11; i = i + 1) sum = sum + i; print sum;";
    assert_eq!(printed(source), vec!["55"]);
}

#[test]
fn if_else_branches_correctly() {
    assert_eq!(printed("if (false) print \"bad\"; else print \"good\";"), vec!["good"]);
}

#[test]
fn recursive_fibonacci() {
    let source = "fun fib(n){ if(n<2) return n; return fib(n-1)+fib(n-2);} print fib(8);";
    assert_eq!(printed(source), vec!["21"]);
}

#[test]
fn mutual_recursion_parity_check() {
    let source = "fun e(n){if(n==0)return true;return o(n-1);} \
                  fun o(n){return e(n-1);} \
                  print e(4);";
    assert_eq!(printed(source), vec!["true"]);
}

#[test]
fn short_circuit_and_does_not_evaluate_rhs() {
    // Si le membre droit était évalué, la division par zéro remonterait une
    // erreur d'exécution et `result.is_ok()` échouerait dans `printed`.
    assert_eq!(printed("print false and (1/0);"), vec!["false"]);
}

#[test]
fn interpret_result_distinguishes_compile_and_runtime_failures() {
    let mut vm = Vm::new();
    assert!(matches!(vm.interpret("print ;"), InterpretResult::CompileError(_)));
    assert!(matches!(vm.interpret("print missing;"), InterpretResult::RuntimeError(_)));
}
