#![allow(dead_code, unused_macros)]

use stacklisp::{ErrorKind, Machine, MachineConfig};

/// A machine with only the builtins installed.
pub fn bare() -> Machine {
    Machine::new(MachineConfig::default()).unwrap_or_else(|e| panic!("machine failed: {e}"))
}

/// A machine with the bootstrap library loaded.
pub fn prelude() -> Machine {
    Machine::with_prelude(MachineConfig::default())
        .unwrap_or_else(|e| panic!("prelude failed: {e}"))
}

/// Evaluate `input` and print the last result.
pub fn eval_print(m: &mut Machine, input: &str) -> String {
    let val = m
        .eval_str(input)
        .unwrap_or_else(|e| panic!("`{input}` failed: {e}"));
    m.print(val)
}

/// Evaluate `input`, expecting failure, and return the error kind.
pub fn eval_err(m: &mut Machine, input: &str) -> ErrorKind {
    match m.eval_str(input) {
        Ok(val) => panic!("`{input}` should fail, got {}", m.print(val)),
        Err(e) => e.kind(),
    }
}

/// Run a scripted session: each input is evaluated in turn on one machine
/// and its printed result compared with the expectation.
pub fn session(m: &mut Machine, steps: &[(&str, &str)]) {
    for (input, expect) in steps {
        assert_eq!(&eval_print(m, input), expect, "input: {input}");
    }
}

/// One test per case, each on a fresh machine built by `$machine`.
macro_rules! eval_tests {
    ($machine:path; $($name:ident: $input:expr => $expected:expr),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let mut m = $machine();
                assert_eq!(common::eval_print(&mut m, $input), $expected, "input: {}", $input);
            }
        )*
    };
}
