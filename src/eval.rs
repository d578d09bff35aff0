use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, trace, warn};

use crate::builtins::{self, Primitive};
use crate::config::MachineConfig;
use crate::env;
use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::printer::print_val;
use crate::reader;
use crate::symbol::{sym, SymbolTable};
use crate::value::{PairId, SymbolId, Value};

/// The bootstrap library, loaded by `Machine::with_prelude`.
pub const PRELUDE: &str = include_str!("prelude.lisp");

/// Native special forms, keyed by their reserved symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Quote,
    Define,
    Lambda,
    If,
    Defmacro,
    Apply,
}

/// What a suspended frame does with the next value returned to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    /// Waiting for the operator expression.
    Pending,
    /// Operator known; collecting operand values.
    Resolved(Value),
    /// Running a closure body.
    Body,
    /// Binding the result of `(DEFINE sym expr)`.
    Define(SymbolId),
    /// Choosing a branch; `tail` holds `(then else)`.
    If,
    /// The `APPLY` form: collecting `fn` and the argument list.
    Apply,
    /// A macro expansion is running; its result gets evaluated here.
    Expand,
}

/// One suspended evaluation. The parent is the previous element of the
/// machine's stack.
#[derive(Debug, Clone, Copy)]
struct Frame {
    env: Value,
    op: Op,
    /// Operands not yet evaluated.
    tail: Value,
    /// Evaluated operands, most recent first.
    args: Value,
    /// Body expressions not yet run.
    body: Value,
}

impl Frame {
    fn new(env: Value, op: Op, tail: Value) -> Self {
        Frame {
            env,
            op,
            tail,
            args: Value::Nil,
            body: Value::Nil,
        }
    }

    fn push_roots(&self, roots: &mut Vec<Value>) {
        roots.extend([self.env, self.tail, self.args, self.body]);
        if let Op::Resolved(f) = self.op {
            roots.push(f);
        }
    }
}

/// Evaluator state between steps.
#[derive(Debug, Clone, Copy)]
enum State {
    Dispatch { expr: Value, env: Value },
    /// All operands are in; call the operator of this frame.
    Apply(Frame),
    Return(Value),
}

/// Outcome of loading a sequence of top-level expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub evaluated: usize,
    pub failed: usize,
}

/// The evaluation machine.
/// All interpreter state lives here so GC can find roots.
pub struct Machine {
    pub heap: Heap,
    pub symbols: SymbolTable,
    /// The root environment: `(NIL . bindings)`.
    pub globe: Value,
    forms: HashMap<SymbolId, Form>,
    stack: Vec<Frame>,
    /// Values the current evaluation must keep alive that are not on the
    /// stack: the top-level expression and its environment.
    pinned: Vec<Value>,
    /// Deepest frame stack seen since the last `reset_peak_depth`.
    peak_depth: usize,
}

impl Machine {
    pub fn new(config: MachineConfig) -> LispResult<Self> {
        let mut heap = Heap::new(config.heap_capacity, config.gc_threshold);
        let mut symbols = SymbolTable::new();
        let globe = env::create(&mut heap, Value::Nil)?;
        builtins::install(&mut heap, &mut symbols, globe)?;

        let mut m = Machine {
            heap,
            symbols,
            globe,
            forms: HashMap::new(),
            stack: Vec::new(),
            pinned: Vec::new(),
            peak_depth: 0,
        };
        m.init_forms();
        Ok(m)
    }

    /// Build a machine and load the bootstrap library into it.
    pub fn with_prelude(config: MachineConfig) -> LispResult<Self> {
        let mut m = Machine::new(config)?;
        let summary = m.load_str(PRELUDE, |_, _| {})?;
        debug!(
            evaluated = summary.evaluated,
            failed = summary.failed,
            "prelude loaded"
        );
        Ok(m)
    }

    fn init_forms(&mut self) {
        self.forms = HashMap::from([
            (sym::QUOTE, Form::Quote),
            (sym::DEFINE, Form::Define),
            (sym::LAMBDA, Form::Lambda),
            (sym::IF, Form::If),
            (sym::DEFMACRO, Form::Defmacro),
            (sym::APPLY, Form::Apply),
        ]);
    }

    /// Deepest frame stack reached since the last reset.
    pub fn peak_depth(&self) -> usize {
        self.peak_depth
    }

    pub fn reset_peak_depth(&mut self) {
        self.peak_depth = 0;
    }

    /// Render a value with this machine's heap and symbols.
    pub fn print(&self, val: Value) -> String {
        print_val(val, &self.heap, &self.symbols)
    }

    /// Read a single expression.
    pub fn read(&mut self, input: &str) -> LispResult<Value> {
        reader::read_str(input, &mut self.heap, &mut self.symbols)
    }

    /// Look up a symbol by name in the root environment.
    pub fn global(&mut self, name: &str) -> Option<Value> {
        let id = self.symbols.intern(name);
        env::find(&self.heap, self.globe, id)
    }

    /// Bind a symbol by name in the root environment.
    pub fn set_global(&mut self, name: &str, val: Value) -> LispResult<()> {
        let id = self.symbols.intern(name);
        env::bind(&mut self.heap, self.globe, id, val)
    }

    // ========================================================================
    // Core evaluation entry points
    // ========================================================================

    /// Evaluate an expression in the root environment.
    ///
    /// The result stays valid until the next evaluation or collection unless
    /// it is reachable from the root environment.
    pub fn eval(&mut self, expr: Value) -> LispResult<Value> {
        self.eval_in(expr, self.globe)
    }

    /// Evaluate an expression in the given environment.
    pub fn eval_in(&mut self, expr: Value, env: Value) -> LispResult<Value> {
        self.stack.clear();
        self.pinned.clear();
        self.pinned.extend([expr, env]);
        let result = self.run(State::Dispatch { expr, env });
        self.stack.clear();
        self.pinned.clear();
        result
    }

    /// Read and evaluate every expression in `input`, returning the last
    /// result (NIL for empty input). Stops at the first error.
    pub fn eval_str(&mut self, input: &str) -> LispResult<Value> {
        let mut pos = 0;
        let mut last = Value::Nil;
        while let Some((expr, next)) =
            reader::read_one_at(input, pos, &mut self.heap, &mut self.symbols)?
        {
            last = self.eval(expr)?;
            pos = next;
        }
        Ok(last)
    }

    /// The main loop: step until a value is returned to an empty stack.
    fn run(&mut self, mut state: State) -> LispResult<Value> {
        loop {
            if self.heap.should_gc() {
                self.collect(&state);
            }
            self.peak_depth = self.peak_depth.max(self.stack.len());

            state = match state {
                State::Dispatch { expr, env } => self.dispatch(expr, env)?,
                State::Apply(frame) => self.apply(frame)?,
                State::Return(val) => {
                    trace!(
                        target: "stacklisp::eval",
                        depth = self.stack.len(),
                        value = %self.print(val),
                        "return"
                    );
                    match self.stack.pop() {
                        Some(frame) => self.resume(frame, val)?,
                        None => return Ok(val),
                    }
                }
            };
        }
    }

    /// Decide how to evaluate an expression.
    fn dispatch(&mut self, expr: Value, env: Value) -> LispResult<State> {
        trace!(
            target: "stacklisp::eval",
            depth = self.stack.len(),
            expr = %self.print(expr),
            "dispatch"
        );

        let Value::Pair(id) = expr else {
            return match expr {
                Value::Symbol(name) => Ok(State::Return(env::lookup(
                    &self.heap,
                    &self.symbols,
                    env,
                    name,
                )?)),
                other => Ok(State::Return(other)),
            };
        };

        if !self.heap.is_proper_list(expr) {
            return Err(LispError::Syntax(format!(
                "cannot evaluate dotted list {}",
                self.print(expr)
            )));
        }

        let head = self.heap.car(id);
        let operands = self.heap.cdr(id);

        if let Value::Symbol(name) = head {
            if let Some(&form) = self.forms.get(&name) {
                return self.special_form(form, operands, env);
            }
        }

        self.stack.push(Frame::new(env, Op::Pending, operands));
        Ok(State::Dispatch { expr: head, env })
    }

    /// Feed a returned value into the frame that was waiting for it.
    fn resume(&mut self, mut frame: Frame, val: Value) -> LispResult<State> {
        match frame.op {
            Op::Pending => {
                if let Value::Macro(id) = val {
                    // The macro sees the operands unevaluated.
                    let operands = frame.tail;
                    let env = frame.env;
                    self.stack.push(Frame::new(env, Op::Expand, Value::Nil));
                    return self.enter_closure(Frame::new(env, Op::Body, Value::Nil), id, operands);
                }
                frame.op = Op::Resolved(val);
                self.advance(frame)
            }
            Op::Resolved(_) | Op::Apply => {
                frame.args = self.heap.cons(val, frame.args)?;
                self.advance(frame)
            }
            Op::Body => self.next_body(frame),
            Op::Define(name) => {
                env::bind(&mut self.heap, frame.env, name, val)?;
                Ok(State::Return(Value::Symbol(name)))
            }
            Op::If => {
                let branches = frame.tail;
                let branch = if val.is_nil() {
                    let rest = self.heap.cdr_val(branches)?;
                    self.heap.car_val(rest)?
                } else {
                    self.heap.car_val(branches)?
                };
                Ok(State::Dispatch {
                    expr: branch,
                    env: frame.env,
                })
            }
            Op::Expand => {
                trace!(
                    target: "stacklisp::eval",
                    expansion = %self.print(val),
                    "macro expanded"
                );
                Ok(State::Dispatch {
                    expr: val,
                    env: frame.env,
                })
            }
        }
    }

    /// Start evaluating the next operand, or apply once there are none.
    fn advance(&mut self, mut frame: Frame) -> LispResult<State> {
        match frame.tail {
            Value::Pair(id) => {
                let expr = self.heap.car(id);
                let env = frame.env;
                frame.tail = self.heap.cdr(id);
                self.stack.push(frame);
                Ok(State::Dispatch { expr, env })
            }
            _ => Ok(State::Apply(frame)),
        }
    }

    // ========================================================================
    // Application
    // ========================================================================

    fn apply(&mut self, mut frame: Frame) -> LispResult<State> {
        let args = self.heap.list_reverse(frame.args);
        frame.args = Value::Nil;
        let (f, args) = match frame.op {
            Op::Resolved(f) => (f, args),
            // Only the APPLY form reaches here otherwise: args = (fn list).
            _ => builtins::apply_args(&mut self.heap, args)?,
        };
        self.invoke(frame, f, args)
    }

    /// Call `f` on an evaluated argument list, reusing `frame`.
    fn invoke(&mut self, frame: Frame, mut f: Value, mut args: Value) -> LispResult<State> {
        loop {
            trace!(
                target: "stacklisp::eval",
                depth = self.stack.len(),
                operator = %self.print(f),
                args = %self.print(args),
                "apply"
            );
            match f {
                Value::Builtin(id) => match builtins::get(id).primitive {
                    Primitive::Native(native) => {
                        return Ok(State::Return(native(&mut self.heap, args)?));
                    }
                    Primitive::Apply => {
                        (f, args) = builtins::apply_args(&mut self.heap, args)?;
                    }
                },
                Value::Closure(id) => return self.enter_closure(frame, id, args),
                other => {
                    return Err(LispError::Type(format!(
                        "cannot apply {} {}",
                        other.type_name(),
                        self.print(other)
                    )))
                }
            }
        }
    }

    /// Bind a closure's parameters in a fresh child of its captured
    /// environment and start its body in `frame`.
    fn enter_closure(&mut self, mut frame: Frame, id: PairId, args: Value) -> LispResult<State> {
        let (captured, params, body) = self.heap.closure_parts(id);
        let env = env::create(&mut self.heap, captured)?;
        env::bind_params(&mut self.heap, env, params, args)?;
        frame.env = env;
        frame.op = Op::Body;
        frame.tail = Value::Nil;
        frame.body = body;
        self.next_body(frame)
    }

    /// Run the next body expression. The frame is dropped before the last
    /// one so it runs in tail position.
    fn next_body(&mut self, mut frame: Frame) -> LispResult<State> {
        let Value::Pair(id) = frame.body else {
            return Ok(State::Return(Value::Nil));
        };
        let expr = self.heap.car(id);
        let rest = self.heap.cdr(id);
        let env = frame.env;
        if rest.is_pair() {
            frame.body = rest;
            self.stack.push(frame);
        }
        Ok(State::Dispatch { expr, env })
    }

    // ========================================================================
    // Special forms
    // ========================================================================

    fn special_form(&mut self, form: Form, operands: Value, env: Value) -> LispResult<State> {
        let count = self.heap.list_len(operands);
        match form {
            Form::Quote => {
                expect_count("QUOTE", count, 1)?;
                Ok(State::Return(self.heap.car_val(operands)?))
            }
            Form::Define => self.form_define(operands, count, env),
            Form::Lambda => {
                if count < 2 {
                    return Err(LispError::Args(
                        "LAMBDA expects a parameter list and a body".into(),
                    ));
                }
                let params = self.heap.car_val(operands)?;
                let body = self.heap.cdr_val(operands)?;
                Ok(State::Return(self.make_closure(env, params, body, false)?))
            }
            Form::If => {
                expect_count("IF", count, 3)?;
                let test = self.heap.car_val(operands)?;
                let branches = self.heap.cdr_val(operands)?;
                self.stack.push(Frame::new(env, Op::If, branches));
                Ok(State::Dispatch { expr: test, env })
            }
            Form::Defmacro => {
                if count < 2 {
                    return Err(LispError::Args(
                        "DEFMACRO expects a signature and a body".into(),
                    ));
                }
                let signature = self.heap.car_val(operands)?;
                let Value::Pair(sig) = signature else {
                    return Err(LispError::Syntax(format!(
                        "DEFMACRO signature must be a list, got {}",
                        self.print(signature)
                    )));
                };
                let name = self.defined_name("DEFMACRO", self.heap.car(sig))?;
                let params = self.heap.cdr(sig);
                let body = self.heap.cdr_val(operands)?;
                let mac = self.make_closure(env, params, body, true)?;
                env::bind(&mut self.heap, env, name, mac)?;
                Ok(State::Return(Value::Symbol(name)))
            }
            Form::Apply => {
                expect_count("APPLY", count, 2)?;
                self.advance(Frame::new(env, Op::Apply, operands))
            }
        }
    }

    /// `(DEFINE sym expr)` or `(DEFINE (name . params) . body)`.
    fn form_define(&mut self, operands: Value, count: usize, env: Value) -> LispResult<State> {
        if count < 2 {
            return Err(LispError::Args(format!(
                "DEFINE expects at least 2 operands, got {}",
                count
            )));
        }
        let target = self.heap.car_val(operands)?;
        match target {
            Value::Symbol(name) => {
                expect_count("DEFINE", count, 2)?;
                let rest = self.heap.cdr_val(operands)?;
                let expr = self.heap.car_val(rest)?;
                self.stack.push(Frame::new(env, Op::Define(name), Value::Nil));
                Ok(State::Dispatch { expr, env })
            }
            Value::Pair(sig) => {
                let name = self.defined_name("DEFINE", self.heap.car(sig))?;
                let params = self.heap.cdr(sig);
                let body = self.heap.cdr_val(operands)?;
                let closure = self.make_closure(env, params, body, false)?;
                env::bind(&mut self.heap, env, name, closure)?;
                Ok(State::Return(Value::Symbol(name)))
            }
            other => Err(LispError::Type(format!(
                "DEFINE target must be a symbol or a list, got {}",
                other.type_name()
            ))),
        }
    }

    fn defined_name(&self, form: &str, name: Value) -> LispResult<SymbolId> {
        name.as_symbol().ok_or_else(|| {
            LispError::Type(format!(
                "{} name must be a symbol, got {}",
                form,
                name.type_name()
            ))
        })
    }

    /// Build a closure (or macro) record `(env . (params . body))`.
    fn make_closure(&mut self, env: Value, params: Value, body: Value, is_macro: bool) -> LispResult<Value> {
        env::check_params(&self.heap, params)?;
        if !self.heap.is_proper_list(body) {
            return Err(LispError::Syntax("body must be a proper list".into()));
        }
        let rest = self.heap.cons(params, body)?;
        let record = self.heap.alloc(env, rest)?;
        Ok(if is_macro {
            Value::Macro(record)
        } else {
            Value::Closure(record)
        })
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Evaluate each top-level expression in `source` against the root
    /// environment, handing every outcome to `each`.
    ///
    /// Evaluation errors are reported and loading carries on with the next
    /// expression. A read error stops the load and is returned.
    pub fn load_str<F>(&mut self, source: &str, mut each: F) -> LispResult<LoadSummary>
    where
        F: FnMut(&Machine, LispResult<Value>),
    {
        let mut summary = LoadSummary::default();
        let mut pos = 0;
        while let Some((expr, next)) =
            reader::read_one_at(source, pos, &mut self.heap, &mut self.symbols)?
        {
            pos = next;
            let result = self.eval(expr);
            summary.evaluated += 1;
            if let Err(err) = &result {
                summary.failed += 1;
                warn!(error = %err, "top-level expression failed");
            }
            each(self, result);
        }
        Ok(summary)
    }

    /// Read a file and load it with `load_str`.
    pub fn load_file<F>(&mut self, path: &Path, each: F) -> LispResult<LoadSummary>
    where
        F: FnMut(&Machine, LispResult<Value>),
    {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LispError::Io(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), "loading file");
        self.load_str(&source, each)
    }

    // ========================================================================
    // GC
    // ========================================================================

    /// Collect garbage between evaluations. Everything reachable from the
    /// root environment survives. Returns the number of free cells.
    pub fn run_gc(&mut self) -> usize {
        self.collect(&State::Return(Value::Nil))
    }

    fn collect(&mut self, state: &State) -> usize {
        let mut roots = Vec::with_capacity(self.stack.len() * 5 + 8);
        roots.push(self.globe);
        roots.extend(self.pinned.iter().copied());
        for frame in &self.stack {
            frame.push_roots(&mut roots);
        }
        match *state {
            State::Dispatch { expr, env } => roots.extend([expr, env]),
            State::Apply(frame) => frame.push_roots(&mut roots),
            State::Return(val) => roots.push(val),
        }

        let freed = self.heap.collect(&roots);
        debug!(
            target: "stacklisp::gc",
            freed,
            live = self.heap.live_count(),
            depth = self.stack.len(),
            "collected"
        );
        freed
    }
}

fn expect_count(form: &str, got: usize, want: usize) -> LispResult<()> {
    if got == want {
        Ok(())
    } else {
        Err(LispError::Args(format!(
            "{} expects {} operand{}, got {}",
            form,
            want,
            if want == 1 { "" } else { "s" },
            got
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn machine() -> Machine {
        Machine::new(MachineConfig::default()).unwrap()
    }

    fn eval(m: &mut Machine, src: &str) -> LispResult<String> {
        let v = m.eval_str(src)?;
        Ok(m.print(v))
    }

    fn kind(m: &mut Machine, src: &str) -> ErrorKind {
        m.eval_str(src).unwrap_err().kind()
    }

    #[test]
    fn self_evaluating_and_quote() {
        let mut m = machine();
        assert_eq!(eval(&mut m, "42").unwrap(), "42");
        assert_eq!(eval(&mut m, "nil").unwrap(), "NIL");
        assert_eq!(eval(&mut m, "'(a b)").unwrap(), "(A B)");
        assert_eq!(eval(&mut m, "''()").unwrap(), "(QUOTE NIL)");
        assert_eq!(eval(&mut m, "t").unwrap(), "T");
    }

    #[test]
    fn define_returns_the_symbol() {
        let mut m = machine();
        assert_eq!(eval(&mut m, "(define x 5)").unwrap(), "X");
        assert_eq!(eval(&mut m, "x").unwrap(), "5");
        assert_eq!(eval(&mut m, "(define (sq n) (* n n))").unwrap(), "SQ");
        assert_eq!(eval(&mut m, "(sq 7)").unwrap(), "49");
    }

    #[test]
    fn if_treats_only_nil_as_false() {
        let mut m = machine();
        assert_eq!(eval(&mut m, "(if 0 't nil)").unwrap(), "T");
        assert_eq!(eval(&mut m, "(if nil 1 2)").unwrap(), "2");
        assert_eq!(eval(&mut m, "(if '() 1 2)").unwrap(), "2");
    }

    #[test]
    fn special_form_arity() {
        let mut m = machine();
        assert_eq!(kind(&mut m, "(quote)"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(quote a b)"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(if t 1)"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(lambda (x))"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(define x)"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(define x 1 2)"), ErrorKind::Argument);
        assert_eq!(kind(&mut m, "(apply car)"), ErrorKind::Argument);
    }

    #[test]
    fn malformed_definitions() {
        let mut m = machine();
        assert_eq!(kind(&mut m, "(define 5 1)"), ErrorKind::Type);
        assert_eq!(kind(&mut m, "(define (5 x) x)"), ErrorKind::Type);
        assert_eq!(kind(&mut m, "(lambda (1) 1)"), ErrorKind::Type);
        assert_eq!(kind(&mut m, "(defmacro foo 1)"), ErrorKind::Syntax);
        assert_eq!(kind(&mut m, "(defmacro (1 x) x)"), ErrorKind::Type);
        assert_eq!(kind(&mut m, "(car . 1)"), ErrorKind::Syntax);
    }

    #[test]
    fn non_callable_operator_is_type_error() {
        let mut m = machine();
        assert_eq!(kind(&mut m, "(1 2 3)"), ErrorKind::Type);
        assert_eq!(kind(&mut m, "(undefined-fn 1)"), ErrorKind::Unbound);
        assert_eq!(kind(&mut m, "(apply car '(a . b))"), ErrorKind::Syntax);
    }

    #[test]
    fn apply_form_and_builtin_agree() {
        let mut m = machine();
        assert_eq!(eval(&mut m, "(apply + '(1 2))").unwrap(), "3");
        assert_eq!(eval(&mut m, "(define ap apply)").unwrap(), "AP");
        assert_eq!(eval(&mut m, "(ap cons '(1 2))").unwrap(), "(1 . 2)");
        assert_eq!(eval(&mut m, "(ap ap (cons + '((5 6))))").unwrap(), "11");
    }

    #[test]
    fn macros_receive_unevaluated_operands() {
        let mut m = machine();
        eval(&mut m, "(defmacro (ignore x) (cons 'quote (cons x nil)))").unwrap();
        assert_eq!(eval(&mut m, "(ignore (undefined 1 2))").unwrap(), "(UNDEFINED 1 2)");
        assert_eq!(eval(&mut m, "(apply ignore '(1))").unwrap_err().kind(), ErrorKind::Type);
    }

    #[test]
    fn errors_leave_the_machine_usable() {
        let mut m = machine();
        assert!(m.eval_str("(car (car '(1)))").is_err());
        assert!(m.stack.is_empty());
        assert_eq!(eval(&mut m, "(+ 1 2)").unwrap(), "3");
    }

    #[test]
    fn read_then_eval() {
        let mut m = machine();
        let expr = m.read("(cons (+ 1 2) '(x))").unwrap();
        let val = m.eval(expr).unwrap();
        assert_eq!(m.print(val), "(3 X)");
    }

    #[test]
    fn tail_calls_keep_the_stack_flat() {
        let mut m = machine();
        eval(&mut m, "(define (loop n) (if (= n 0) 'done (loop (- n 1))))").unwrap();
        m.reset_peak_depth();
        assert_eq!(eval(&mut m, "(loop 50000)").unwrap(), "DONE");
        assert!(m.peak_depth() < 8, "peak depth {}", m.peak_depth());
    }

    #[test]
    fn load_str_continues_past_errors() {
        let mut m = machine();
        let mut seen = Vec::new();
        let summary = m
            .load_str("(define a 1) (car 1) (+ a 1)", |m, r| {
                seen.push(r.map(|v| m.print(v)));
            })
            .unwrap();
        assert_eq!(summary, LoadSummary { evaluated: 3, failed: 1 });
        assert_eq!(seen[0], Ok("A".to_string()));
        assert!(seen[1].is_err());
        assert_eq!(seen[2], Ok("2".to_string()));
    }

    #[test]
    fn load_str_stops_on_read_error() {
        let mut m = machine();
        let result = m.load_str("(define b 2) (oops", |_, _| {});
        assert!(matches!(result, Err(LispError::Syntax(_))));
        assert_eq!(m.global("b"), Some(Value::Integer(2)));
    }
}
