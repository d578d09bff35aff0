use crate::builtins;
use crate::heap::Heap;
use crate::symbol::SymbolTable;
use crate::value::Value;

/// Nesting depth past which sublists print as `...`.
const MAX_DEPTH: usize = 1000;

/// Print a value to its canonical text form.
pub fn print_val(val: Value, heap: &Heap, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    print_inner(val, heap, symbols, &mut out, 0);
    out
}

fn print_inner(val: Value, heap: &Heap, symbols: &SymbolTable, out: &mut String, depth: usize) {
    if depth > MAX_DEPTH {
        out.push_str("...");
        return;
    }

    match val {
        Value::Nil => out.push_str("NIL"),
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Symbol(id) => out.push_str(symbols.name(id)),
        Value::Builtin(id) => {
            out.push_str("#<BUILTIN:");
            out.push_str(builtins::get(id).name);
            out.push('>');
        }
        Value::Closure(_) => out.push_str("#<CLOSURE>"),
        Value::Macro(_) => out.push_str("#<MACRO>"),
        Value::Pair(id) => {
            out.push('(');
            print_inner(heap.car(id), heap, symbols, out, depth + 1);

            // `slow` trails at half speed so a cdr-cycle is caught on the lap.
            let mut slow = val;
            let mut steps = 0usize;
            let mut current = heap.cdr(id);
            loop {
                match current {
                    Value::Nil => break,
                    Value::Pair(pid) => {
                        if current == slow {
                            out.push_str(" ...");
                            break;
                        }
                        out.push(' ');
                        print_inner(heap.car(pid), heap, symbols, out, depth + 1);
                        current = heap.cdr(pid);
                        steps += 1;
                        if steps % 2 == 0 {
                            if let Value::Pair(sid) = slow {
                                slow = heap.cdr(sid);
                            }
                        }
                    }
                    tail => {
                        out.push_str(" . ");
                        print_inner(tail, heap, symbols, out, depth + 1);
                        break;
                    }
                }
            }
            out.push(')');
        }
    }
}
