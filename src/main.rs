use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use stacklisp::config::{MachineConfig, DEFAULT_HEAP_CAPACITY};
use stacklisp::eval::Machine;
use stacklisp::reader;

#[derive(Parser)]
#[command(name = "stacklisp", version, about = "A small Lisp on an explicit frame stack")]
struct Cli {
    /// Source files to load, in order, before anything else
    files: Vec<PathBuf>,

    /// Evaluate an expression, print the result, and exit
    #[arg(short, long)]
    eval: Option<String>,

    /// Start without the bootstrap library
    #[arg(long)]
    no_prelude: bool,

    /// Cons-cell arena capacity
    #[arg(long, env = "STACKLISP_HEAP_CELLS", default_value_t = DEFAULT_HEAP_CAPACITY)]
    heap_cells: usize,

    /// Log every evaluator step to stderr
    #[arg(long)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.trace);

    let config = MachineConfig::default().with_heap_capacity(cli.heap_cells);
    let built = if cli.no_prelude {
        Machine::new(config)
    } else {
        Machine::with_prelude(config)
    };
    let mut machine = match built {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Failed to initialize machine: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for path in &cli.files {
        let loaded = machine.load_file(path, |_, result| {
            if let Err(e) = result {
                eprintln!("{}: {}", path.display(), e);
            }
        });
        if let Err(e) = loaded {
            eprintln!("Error loading {}: {}", path.display(), e);
            return ExitCode::FAILURE;
        }
    }

    if let Some(expr) = &cli.eval {
        return if eval_and_print(&mut machine, expr) {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        };
    }

    if io::stdin().is_terminal() {
        repl(&mut machine);
        ExitCode::SUCCESS
    } else {
        run_piped(&mut machine)
    }
}

fn init_logging(trace: bool) {
    let filter = if trace {
        EnvFilter::new("warn,stacklisp::eval=trace")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Evaluate every expression in `input`, printing each result.
/// Returns false if anything failed.
fn eval_and_print(machine: &mut Machine, input: &str) -> bool {
    let mut pos = 0;
    let mut ok = true;
    loop {
        match reader::read_one_at(input, pos, &mut machine.heap, &mut machine.symbols) {
            Ok(Some((expr, next))) => {
                pos = next;
                match machine.eval(expr) {
                    Ok(val) => println!("{}", machine.print(val)),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        ok = false;
                    }
                }
            }
            Ok(None) => return ok,
            Err(e) => {
                eprintln!("Error: {}", e);
                return false;
            }
        }
    }
}

/// Piped mode: evaluate stdin one expression at a time.
fn run_piped(machine: &mut Machine) -> ExitCode {
    let mut input = String::new();
    if let Err(e) = io::stdin().read_to_string(&mut input) {
        eprintln!("Error reading stdin: {}", e);
        return ExitCode::FAILURE;
    }
    if eval_and_print(machine, &input) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn history_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".stacklisp_history"))
}

/// Interactive REPL: accumulate lines until parens balance.
fn repl(machine: &mut Machine) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to start line editor: {}", e);
            return;
        }
    };
    let history = history_path();
    if let Some(path) = &history {
        if let Err(e) = rl.load_history(path) {
            debug!(path = %path.display(), error = %e, "no history loaded");
        }
    }

    println!(
        "stacklisp {} ({} cells, {} symbols). Ctrl-D exits.",
        env!("CARGO_PKG_VERSION"),
        machine.heap.live_count(),
        machine.symbols.count()
    );

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "> " } else { "  " };
        match rl.readline(prompt) {
            Ok(line) => {
                if !buffer.is_empty() {
                    buffer.push('\n');
                }
                buffer.push_str(&line);
                if paren_depth(&buffer) > 0 {
                    continue;
                }
                let input = std::mem::take(&mut buffer);
                if input.trim().is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(input.trim());
                eval_and_print(machine, &input);
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
                println!("^C");
            }
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Err(e) = rl.save_history(path) {
            warn!(path = %path.display(), error = %e, "failed to save history");
        }
    }
}

/// Open-paren depth of `input`, ignoring `;` comments.
fn paren_depth(input: &str) -> i32 {
    let mut depth = 0;
    for line in input.lines() {
        let code = line.split(';').next().unwrap_or("");
        for ch in code.chars() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
        }
    }
    depth
}
