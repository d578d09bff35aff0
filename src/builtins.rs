use crate::env;
use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::symbol::{sym, SymbolTable};
use crate::value::{BuiltinId, Value};

/// Native calling convention: the evaluated argument list in, a value out.
pub type NativeFn = fn(&mut Heap, Value) -> LispResult<Value>;

/// How a builtin is invoked.
#[derive(Clone, Copy)]
pub enum Primitive {
    /// Runs directly on the argument list.
    Native(NativeFn),
    /// `(APPLY f args)`: handed back to the evaluator, which re-enters its
    /// own apply path so the call stays in tail position.
    Apply,
}

pub struct Builtin {
    pub name: &'static str,
    pub primitive: Primitive,
}

/// The fixed builtin table. `BuiltinId` is an index into it.
pub static BUILTINS: [Builtin; 12] = [
    Builtin { name: "CAR", primitive: Primitive::Native(prim_car) },
    Builtin { name: "CDR", primitive: Primitive::Native(prim_cdr) },
    Builtin { name: "CONS", primitive: Primitive::Native(prim_cons) },
    Builtin { name: "+", primitive: Primitive::Native(prim_add) },
    Builtin { name: "-", primitive: Primitive::Native(prim_sub) },
    Builtin { name: "*", primitive: Primitive::Native(prim_mul) },
    Builtin { name: "/", primitive: Primitive::Native(prim_div) },
    Builtin { name: "=", primitive: Primitive::Native(prim_num_eq) },
    Builtin { name: "<", primitive: Primitive::Native(prim_less) },
    Builtin { name: "EQ?", primitive: Primitive::Native(prim_eq) },
    Builtin { name: "PAIR?", primitive: Primitive::Native(prim_pairp) },
    Builtin { name: "APPLY", primitive: Primitive::Apply },
];

pub fn get(id: BuiltinId) -> &'static Builtin {
    &BUILTINS[id.0 as usize]
}

/// Bind every builtin by name in `env`, plus `T` bound to itself.
pub fn install(heap: &mut Heap, symbols: &mut SymbolTable, env: Value) -> LispResult<()> {
    env::bind(heap, env, sym::T, Value::Symbol(sym::T))?;
    for (i, builtin) in BUILTINS.iter().enumerate() {
        let name = symbols.intern(builtin.name);
        env::bind(heap, env, name, Value::Builtin(BuiltinId(i as u8)))?;
    }
    Ok(())
}

/// Split an argument list that must hold exactly `N` values.
fn take_args<const N: usize>(heap: &Heap, name: &str, args: Value) -> LispResult<[Value; N]> {
    let mut out = [Value::Nil; N];
    let mut current = args;
    for (i, slot) in out.iter_mut().enumerate() {
        match current {
            Value::Pair(id) => {
                *slot = heap.car(id);
                current = heap.cdr(id);
            }
            _ => {
                return Err(LispError::Args(format!(
                    "{} expects {} arguments, got {}",
                    name, N, i
                )))
            }
        }
    }
    if !current.is_nil() {
        return Err(LispError::Args(format!(
            "{} expects {} arguments, got {}",
            name,
            N,
            N + heap.list_len(current)
        )));
    }
    Ok(out)
}

fn integers(name: &str, a: Value, b: Value) -> LispResult<(i64, i64)> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Ok((x, y)),
        (Value::Integer(_), other) | (other, _) => Err(LispError::Type(format!(
            "{} expects integers, got {}",
            name,
            other.type_name()
        ))),
    }
}

fn truth(b: bool) -> Value {
    if b {
        Value::Symbol(sym::T)
    } else {
        Value::Nil
    }
}

/// Check the `(f list)` shape handed to `APPLY` and return both parts.
/// The list is copied so the callee may bind or mutate it freely.
pub fn apply_args(heap: &mut Heap, args: Value) -> LispResult<(Value, Value)> {
    let [f, list] = take_args::<2>(heap, "APPLY", args)?;
    if !heap.is_proper_list(list) {
        return Err(LispError::Syntax(
            "APPLY expects a proper argument list".into(),
        ));
    }
    Ok((f, heap.list_copy(list)?))
}

/// (car x)
fn prim_car(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a] = take_args::<1>(heap, "CAR", args)?;
    heap.car_val(a)
}

/// (cdr x)
fn prim_cdr(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a] = take_args::<1>(heap, "CDR", args)?;
    heap.cdr_val(a)
}

/// (cons a b): fresh cell.
fn prim_cons(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "CONS", args)?;
    heap.cons(a, b)
}

fn prim_add(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "+", args)?;
    let (x, y) = integers("+", a, b)?;
    Ok(Value::Integer(x.wrapping_add(y)))
}

fn prim_sub(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "-", args)?;
    let (x, y) = integers("-", a, b)?;
    Ok(Value::Integer(x.wrapping_sub(y)))
}

fn prim_mul(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "*", args)?;
    let (x, y) = integers("*", a, b)?;
    Ok(Value::Integer(x.wrapping_mul(y)))
}

/// (/ a b): truncating integer division.
fn prim_div(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "/", args)?;
    let (x, y) = integers("/", a, b)?;
    if y == 0 {
        return Err(LispError::Args("/ by zero".into()));
    }
    Ok(Value::Integer(x.wrapping_div(y)))
}

fn prim_num_eq(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "=", args)?;
    let (x, y) = integers("=", a, b)?;
    Ok(truth(x == y))
}

fn prim_less(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "<", args)?;
    let (x, y) = integers("<", a, b)?;
    Ok(truth(x < y))
}

/// (eq? a b): identity comparison.
/// Pairs, closures, macros and builtins compare by handle; integers by
/// value; symbols by interned id. Different variants are never equal.
fn prim_eq(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a, b] = take_args::<2>(heap, "EQ?", args)?;
    Ok(truth(a == b))
}

fn prim_pairp(heap: &mut Heap, args: Value) -> LispResult<Value> {
    let [a] = take_args::<1>(heap, "PAIR?", args)?;
    Ok(truth(a.is_pair()))
}
