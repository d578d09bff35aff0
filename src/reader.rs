use crate::error::{LispError, LispResult};
use crate::heap::Heap;
use crate::symbol::{sym, SymbolTable};
use crate::value::{SymbolId, Value};

/// Lists and abbreviations nested deeper than this are rejected.
pub const MAX_PARSE_DEPTH: usize = 1000;

/// Parses source text into value trees on the heap.
pub struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    depth: usize,
    heap: &'a mut Heap,
    symbols: &'a mut SymbolTable,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a str, heap: &'a mut Heap, symbols: &'a mut SymbolTable) -> Self {
        Reader {
            input: input.as_bytes(),
            pos: 0,
            depth: 0,
            heap,
            symbols,
        }
    }

    /// Read one expression. Returns None at end of input.
    pub fn read(&mut self) -> LispResult<Option<Value>> {
        self.skip_whitespace_and_comments();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        self.depth = 0;
        let val = self.read_expr()?;
        Ok(Some(val))
    }

    /// Byte offset just past the last expression read.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Read all expressions from input.
    pub fn read_all(&mut self) -> LispResult<Vec<Value>> {
        let mut results = Vec::new();
        while let Some(val) = self.read()? {
            results.push(val);
        }
        Ok(results)
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while let Some(ch) = self.peek() {
                if ch.is_ascii_whitespace() {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            if self.peek() == Some(b';') {
                while let Some(ch) = self.advance() {
                    if ch == b'\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn enter(&mut self) -> LispResult<()> {
        self.depth += 1;
        if self.depth > MAX_PARSE_DEPTH {
            return Err(LispError::Syntax(format!(
                "expression too deeply nested (max depth: {})",
                MAX_PARSE_DEPTH
            )));
        }
        Ok(())
    }

    fn read_expr(&mut self) -> LispResult<Value> {
        self.skip_whitespace_and_comments();

        let ch = self
            .peek()
            .ok_or_else(|| LispError::Syntax("unexpected end of input".into()))?;

        match ch {
            b'(' => self.read_list(),
            b')' => Err(LispError::Syntax("unexpected ')'".into())),
            b'\'' => self.read_prefixed(1, sym::QUOTE),
            b'`' => self.read_prefixed(1, sym::QUASIQUOTE),
            b',' if self.input.get(self.pos + 1) == Some(&b'@') => {
                self.read_prefixed(2, sym::UNQUOTE_SPLICING)
            }
            b',' => self.read_prefixed(1, sym::UNQUOTE),
            _ => self.read_word(),
        }
    }

    /// Read a list: (a b c) or (a . b) or (a b . c)
    fn read_list(&mut self) -> LispResult<Value> {
        self.enter()?;
        self.advance(); // consume '('

        let mut elements = Vec::new();
        let mut dot_tail = None;

        loop {
            self.skip_whitespace_and_comments();

            match self.peek() {
                None => return Err(LispError::Syntax("unterminated list".into())),
                Some(b')') => {
                    self.advance();
                    break;
                }
                Some(b'.') if self.is_dot_separator() => {
                    if elements.is_empty() {
                        return Err(LispError::Syntax("dot at start of list".into()));
                    }
                    self.advance(); // consume '.'
                    self.skip_whitespace_and_comments();
                    if self.peek() == Some(b')') {
                        return Err(LispError::Syntax("missing expression after dot".into()));
                    }
                    dot_tail = Some(self.read_expr()?);
                    self.skip_whitespace_and_comments();
                    if self.peek() != Some(b')') {
                        return Err(LispError::Syntax("expected ')' after dotted tail".into()));
                    }
                    self.advance();
                    break;
                }
                Some(_) => elements.push(self.read_expr()?),
            }
        }

        self.depth -= 1;
        let mut result = dot_tail.unwrap_or(Value::Nil);
        for val in elements.into_iter().rev() {
            result = self.heap.cons(val, result)?;
        }
        Ok(result)
    }

    /// A '.' is a separator when followed by whitespace, a paren, or EOF.
    fn is_dot_separator(&self) -> bool {
        match self.input.get(self.pos + 1) {
            None => true,
            Some(&next) => next.is_ascii_whitespace() || next == b'(' || next == b')',
        }
    }

    /// Read a reader abbreviation: 'x -> (QUOTE x), ,@x -> (UNQUOTE-SPLICING x), ...
    fn read_prefixed(&mut self, width: usize, tag: SymbolId) -> LispResult<Value> {
        self.enter()?;
        self.pos += width;
        self.skip_whitespace_and_comments();
        if self.peek().is_none() {
            return Err(LispError::Syntax(format!(
                "unexpected end of input after {}",
                self.symbols.name(tag)
            )));
        }
        let expr = self.read_expr()?;
        self.depth -= 1;
        self.heap.list(&[Value::Symbol(tag), expr])
    }

    /// Read a word: integer, NIL, or symbol.
    fn read_word(&mut self) -> LispResult<Value> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if is_delimiter(ch) {
                break;
            }
            self.pos += 1;
        }

        let word = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| LispError::Syntax("invalid UTF-8 in token".into()))?;

        if word.is_empty() {
            return Err(LispError::Syntax("empty token".into()));
        }
        if let Ok(n) = word.parse::<i64>() {
            return Ok(Value::Integer(n));
        }
        if word.eq_ignore_ascii_case("nil") {
            return Ok(Value::Nil);
        }
        Ok(Value::Symbol(self.symbols.intern(word)))
    }
}

fn is_delimiter(ch: u8) -> bool {
    ch.is_ascii_whitespace() || matches!(ch, b'(' | b')' | b'\'' | b'`' | b',' | b';')
}

/// Read a single expression from a string.
pub fn read_str(input: &str, heap: &mut Heap, symbols: &mut SymbolTable) -> LispResult<Value> {
    let mut reader = Reader::new(input, heap, symbols);
    reader
        .read()?
        .ok_or_else(|| LispError::Syntax("empty input".into()))
}

/// Read all expressions from a string.
pub fn read_all(input: &str, heap: &mut Heap, symbols: &mut SymbolTable) -> LispResult<Vec<Value>> {
    let mut reader = Reader::new(input, heap, symbols);
    reader.read_all()
}

/// Read one expression starting at byte offset `pos`.
/// Returns `Ok(Some((value, new_pos)))` or `Ok(None)` if only whitespace/comments remain.
pub fn read_one_at(
    input: &str,
    pos: usize,
    heap: &mut Heap,
    symbols: &mut SymbolTable,
) -> LispResult<Option<(Value, usize)>> {
    let rest = input.get(pos..).unwrap_or("");
    let mut reader = Reader::new(rest, heap, symbols);
    match reader.read()? {
        Some(val) => Ok(Some((val, pos + reader.position()))),
        None => Ok(None),
    }
}
