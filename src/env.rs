//! Environments are plain pairs: `(parent . bindings)`, where `bindings` is
//! an association list of `(symbol . value)` cells local to the scope.

use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::{SymbolId, Value};

/// Create a new, empty scope whose parent is `parent` (Nil for the root).
pub fn create(heap: &mut Heap, parent: Value) -> LispResult<Value> {
    heap.cons(parent, Value::Nil)
}

/// Find the `(symbol . value)` cell bound directly in this scope.
fn local_binding(heap: &Heap, env: Value, name: SymbolId) -> Option<Value> {
    let mut current = heap.cdr_val(env).ok()?;
    while let Value::Pair(id) = current {
        let binding = heap.car(id);
        if let Value::Pair(bid) = binding {
            if heap.car(bid) == Value::Symbol(name) {
                return Some(binding);
            }
        }
        current = heap.cdr(id);
    }
    None
}

/// Look up a binding, walking local bindings first and then the parents.
/// Returns None when the chain ends without a match.
pub fn find(heap: &Heap, env: Value, name: SymbolId) -> Option<Value> {
    let mut scope = env;
    while scope.is_pair() {
        if let Some(Value::Pair(bid)) = local_binding(heap, scope, name) {
            return Some(heap.cdr(bid));
        }
        scope = heap.car_val(scope).ok()?;
    }
    None
}

/// Look up a binding, failing with `Unbound` when there is none.
pub fn lookup(heap: &Heap, symbols: &SymbolTable, env: Value, name: SymbolId) -> LispResult<Value> {
    find(heap, env, name).ok_or_else(|| LispError::Unbound(symbols.name(name).to_string()))
}

/// Bind `name` in this scope only. An existing local binding is overwritten
/// in place; otherwise a new binding is prepended. Parent scopes are never
/// touched.
pub fn bind(heap: &mut Heap, env: Value, name: SymbolId, val: Value) -> LispResult<()> {
    if let Some(Value::Pair(bid)) = local_binding(heap, env, name) {
        heap.set_cdr(bid, val);
        return Ok(());
    }
    let bindings = heap.cdr_val(env)?;
    let binding = heap.cons(Value::Symbol(name), val)?;
    let node = heap.cons(binding, bindings)?;
    heap.set_cdr_val(env, node)
}

/// Check that a parameter list is a list of symbols, optionally dotted with
/// a symbol tail, or a single symbol.
pub fn check_params(heap: &Heap, params: Value) -> LispResult<()> {
    let mut current = params;
    loop {
        match current {
            Value::Nil | Value::Symbol(_) => return Ok(()),
            Value::Pair(id) => {
                let param = heap.car(id);
                if !param.is_symbol() {
                    return Err(LispError::Type(format!(
                        "parameter must be a symbol, got {}",
                        param.type_name()
                    )));
                }
                current = heap.cdr(id);
            }
            other => {
                return Err(LispError::Type(format!(
                    "parameter list tail must be a symbol, got {}",
                    other.type_name()
                )))
            }
        }
    }
}

/// Bind a parameter list against an evaluated argument list in `env`.
///
/// A symbol in parameter position (either the whole list or a dotted tail)
/// collects every remaining argument as a list.
pub fn bind_params(heap: &mut Heap, env: Value, params: Value, args: Value) -> LispResult<()> {
    let mut names = params;
    let mut rest = args;
    loop {
        match names {
            Value::Symbol(name) => {
                bind(heap, env, name, rest)?;
                return Ok(());
            }
            Value::Pair(id) => {
                let Value::Pair(arg) = rest else {
                    return Err(LispError::Args(format!(
                        "too few arguments: expected at least {}, got {}",
                        heap.list_len(params),
                        heap.list_len(args)
                    )));
                };
                if let Value::Symbol(name) = heap.car(id) {
                    let val = heap.car(arg);
                    bind(heap, env, name, val)?;
                }
                names = heap.cdr(id);
                rest = heap.cdr(arg);
            }
            _ => break,
        }
    }
    if !rest.is_nil() {
        return Err(LispError::Args(format!(
            "too many arguments: expected {}, got {}",
            heap.list_len(params),
            heap.list_len(args)
        )));
    }
    Ok(())
}
