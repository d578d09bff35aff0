#[macro_use]
mod common;

use common::{bare, eval_err, eval_print, session};
use stacklisp::{ErrorKind, LispError, Machine, MachineConfig, Value};

// ============================================================
// Atoms, quoting, builtins
// ============================================================

eval_tests! { common::bare;
    integer: "42" => "42",
    negative_integer: "-7" => "-7",
    nil_self_evaluates: "nil" => "NIL",
    empty_list_is_nil: "()" => "NIL",
    t_is_bound: "t" => "T",
    quote_symbol: "(quote foo)" => "FOO",
    quote_abbrev: "'(a b c)" => "(A B C)",
    nested_quote: "''()" => "(QUOTE NIL)",
    cons_dotted: "(cons 1 2)" => "(1 . 2)",
    car_of_list: "(car '(a b c))" => "A",
    cdr_of_list: "(cdr '(a b c))" => "(B C)",
    add: "(+ 1 1)" => "2",
    sub: "(- 54 12)" => "42",
    mul: "(* 6 9)" => "54",
    div_truncates: "(/ 7 2)" => "3",
    div_negative: "(/ -7 2)" => "-3",
    num_eq: "(= 3 3)" => "T",
    less: "(< 11 4)" => "NIL",
    eq_symbols: "(eq? 'a 'A)" => "T",
    eq_integers: "(eq? 5 5)" => "T",
    eq_distinct_pairs: "(eq? '(1) '(1))" => "NIL",
    eq_nil_nil: "(eq? nil '())" => "T",
    pairp_list: "(pair? '(1))" => "T",
    pairp_nil: "(pair? nil)" => "NIL",
    builtin_prints: "car" => "#<BUILTIN:CAR>",
    lambda_prints: "(lambda (x) x)" => "#<CLOSURE>",
    apply_builtin: "(apply + '(3 4))" => "7",
    apply_lambda: "(apply (lambda (a b) (cons b a)) '(1 2))" => "(2 . 1)",
}

#[test]
fn overflow_wraps() {
    let mut m = bare();
    assert_eq!(
        eval_print(&mut m, "(+ 9223372036854775807 1)"),
        "-9223372036854775808"
    );
}

// ============================================================
// Definitions, closures, conditionals
// ============================================================

#[test]
fn define_and_lookup() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define foo 42)", "FOO"),
            ("foo", "42"),
            ("(define foo (quote bar))", "FOO"),
            ("foo", "BAR"),
            ("(define baz '(a b c))", "BAZ"),
            ("(car baz)", "A"),
        ],
    );
}

#[test]
fn closures_capture_their_environment() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define square (lambda (x) (* x x)))", "SQUARE"),
            ("(square 4)", "16"),
            ("((lambda (x) (- x 2)) 7)", "5"),
            ("(define make-adder (lambda (x) (lambda (y) (+ x y))))", "MAKE-ADDER"),
            ("(define add-two (make-adder 2))", "ADD-TWO"),
            ("(add-two 5)", "7"),
        ],
    );
}

#[test]
fn recursion_and_if() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(if t 3 4)", "3"),
            ("(if nil 3 4)", "4"),
            ("(if 0 t nil)", "T"),
            (
                "(define fact (lambda (x) (if (= x 0) 1 (* x (fact (- x 1))))))",
                "FACT",
            ),
            ("(fact 10)", "3628800"),
            (
                "(if (= (fact 10) 3628800) (quote passed) (quote failed))",
                "PASSED",
            ),
        ],
    );
}

#[test]
fn variadic_parameters() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("((lambda (a . b) a) 1 2 3)", "1"),
            ("((lambda (a . b) b) 1 2 3)", "(2 3)"),
            ("((lambda args args) 1 2 3)", "(1 2 3)"),
            ("((lambda args args))", "NIL"),
            (
                "(define (sum-list xs) (if xs (+ (car xs) (sum-list (cdr xs))) 0))",
                "SUM-LIST",
            ),
            ("(define (add . xs) (sum-list xs))", "ADD"),
            ("(add 1 (- 4 2) (/ 9 3))", "6"),
        ],
    );
}

#[test]
fn body_runs_in_sequence() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define (f x) (define y (* x 2)) (+ y 1))", "F"),
            ("(f 5)", "11"),
        ],
    );
    // the inner DEFINE bound in the call's scope only
    assert_eq!(eval_err(&mut m, "y"), ErrorKind::Unbound);
}

#[test]
fn define_inside_closure_does_not_touch_globals() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define x 1)", "X"),
            ("((lambda () (define x 2) x))", "2"),
            ("x", "1"),
        ],
    );
}

// ============================================================
// Macros
// ============================================================

#[test]
fn macro_sees_unevaluated_operands() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(defmacro (ignore x) (cons 'quote (cons x nil)))", "IGNORE"),
            ("(ignore foo)", "FOO"),
            ("(ignore (this is never evaluated))", "(THIS IS NEVER EVALUATED)"),
        ],
    );
    assert_eq!(eval_err(&mut m, "foo"), ErrorKind::Unbound);
    assert_eq!(eval_err(&mut m, "(apply ignore '(x))"), ErrorKind::Type);
}

#[test]
fn macro_expansion_runs_in_caller_scope() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(defmacro (twice x) (cons '+ (cons x (cons x nil))))", "TWICE"),
            ("((lambda (n) (twice n)) 21)", "42"),
        ],
    );
}

// ============================================================
// Errors
// ============================================================

#[test]
fn error_kinds() {
    let mut m = bare();
    assert_eq!(eval_err(&mut m, "undefined"), ErrorKind::Unbound);
    assert_eq!(eval_err(&mut m, "(car 1)"), ErrorKind::Type);
    assert_eq!(eval_err(&mut m, "(car nil)"), ErrorKind::Type);
    assert_eq!(eval_err(&mut m, "(car '(1) '(2))"), ErrorKind::Argument);
    assert_eq!(eval_err(&mut m, "(+ 1 'a)"), ErrorKind::Type);
    assert_eq!(eval_err(&mut m, "(/ 1 0)"), ErrorKind::Argument);
    assert_eq!(eval_err(&mut m, "((lambda (x) x))"), ErrorKind::Argument);
    assert_eq!(eval_err(&mut m, "((lambda (x) x) 1 2)"), ErrorKind::Argument);
    assert_eq!(eval_err(&mut m, "(1 2)"), ErrorKind::Type);
    assert_eq!(eval_err(&mut m, "(f . x)"), ErrorKind::Syntax);
    assert_eq!(eval_err(&mut m, "(if 1 2)"), ErrorKind::Argument);
    assert_eq!(eval_err(&mut m, "(apply + '(1 . 2))"), ErrorKind::Syntax);
}

#[test]
fn unbound_error_names_the_symbol() {
    let mut m = bare();
    assert_eq!(
        m.eval_str("missing-thing"),
        Err(LispError::Unbound("MISSING-THING".into()))
    );
}

#[test]
fn machine_recovers_after_error() {
    let mut m = bare();
    assert_eq!(eval_err(&mut m, "(+ 1 (car 5))"), ErrorKind::Type);
    assert_eq!(eval_print(&mut m, "(+ 1 2)"), "3");
}

#[test]
fn apply_copies_the_argument_list() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define args '(1 2))", "ARGS"),
            ("(define (keep . xs) xs)", "KEEP"),
            ("(eq? (apply keep args) args)", "NIL"),
            ("args", "(1 2)"),
        ],
    );
}

// ============================================================
// Deep recursion
// ============================================================

#[test]
fn deep_non_tail_recursion() {
    let mut m = bare();
    eval_print(
        &mut m,
        "(define (count n) (if (= n 0) 0 (+ 1 (count (- n 1)))))",
    );
    assert_eq!(eval_print(&mut m, "(count 100000)"), "100000");
}

#[test]
fn deep_tail_recursion_has_bounded_stack() {
    let mut m = bare();
    eval_print(
        &mut m,
        "(define (count n a) (if (= n 0) a (count (- n 1) (+ a 1))))",
    );
    m.reset_peak_depth();
    assert_eq!(eval_print(&mut m, "(count 100000 0)"), "100000");
    assert!(m.peak_depth() < 10, "peak depth {}", m.peak_depth());
}

#[test]
fn overly_nested_input_is_a_syntax_error() {
    let mut m = bare();
    let input = format!("'{}{}", "(".repeat(200_000), ")".repeat(200_000));
    assert_eq!(eval_err(&mut m, &input), ErrorKind::Syntax);
    assert_eq!(eval_print(&mut m, "(cons 1 2)"), "(1 . 2)");
}

#[test]
fn deeply_nested_results_print_in_full() {
    let mut m = bare();
    session(
        &mut m,
        &[
            ("(define (nest n) (if (= n 0) 'x (cons (nest (- n 1)) nil)))", "NEST"),
            ("(nest 3)", "(((X)))"),
        ],
    );
    let printed = eval_print(&mut m, "(nest 600)");
    assert_eq!(printed, format!("{}X{}", "(".repeat(600), ")".repeat(600)));

    let quoted = format!("'{}x{}", "(".repeat(999), ")".repeat(999));
    let printed = eval_print(&mut m, &quoted);
    assert_eq!(printed, format!("{}X{}", "(".repeat(999), ")".repeat(999)));
}

#[test]
fn independent_machines_do_not_share_state() {
    let mut a = bare();
    let mut b = bare();
    eval_print(&mut a, "(define only-here 1)");
    assert_eq!(eval_err(&mut b, "only-here"), ErrorKind::Unbound);
}

#[test]
fn host_can_bind_globals() {
    let mut m = Machine::new(MachineConfig::default()).unwrap();
    m.set_global("answer", Value::Integer(42)).unwrap();
    assert_eq!(eval_print(&mut m, "(+ answer 0)"), "42");
    assert_eq!(m.global("ANSWER"), Some(Value::Integer(42)));
}
