//! Reader for literal argument text.
//!
//! Recognises `None`, `True`, `False`, integers, floats, quoted strings and
//! nested lists, tuples and dicts. Text that is not a literal yields `None`
//! and the binder falls back to the raw block.

use incant_types::Value;

/// Read `text` as a single literal, ignoring surrounding whitespace.
pub fn read_literal(text: &str) -> Option<Value> {
    let mut reader = Reader::new(text);
    let value = reader.value()?;
    reader.skip_whitespace();
    reader.at_end().then_some(value)
}

struct Reader<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn value(&mut self) -> Option<Value> {
        self.skip_whitespace();
        match self.peek()? {
            '\'' | '"' => self.string(),
            '[' => {
                self.bump();
                self.items(']').map(Value::List)
            },
            '(' => self.tuple_or_group(),
            '{' => self.dict(),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    fn keyword(&mut self) -> Option<Value> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        match &self.input[start..self.pos] {
            "None" => Some(Value::None),
            "True" => Some(Value::Bool(true)),
            "False" => Some(Value::Bool(false)),
            _ => None,
        }
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {},
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if matches!(self.previous(), Some('e' | 'E')) => {},
                _ => break,
            }
            self.bump();
        }
        let text = &self.input[start..self.pos];
        if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>().ok().map(Value::Int)
        }
    }

    fn previous(&self) -> Option<char> {
        self.input[..self.pos].chars().next_back()
    }

    fn string(&mut self) -> Option<Value> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Some(Value::Str(out)),
                '\\' => match self.bump()? {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '0' => out.push('\0'),
                    c @ ('\\' | '\'' | '"') => out.push(c),
                    other => {
                        out.push('\\');
                        out.push(other);
                    },
                },
                c => out.push(c),
            }
        }
    }

    /// Comma-separated values up to `close`; a trailing comma is allowed.
    fn items(&mut self, close: char) -> Option<Vec<Value>> {
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat(close) {
                return Some(items);
            }
            items.push(self.value()?);
            self.skip_whitespace();
            if !self.eat(',') {
                self.skip_whitespace();
                return self.eat(close).then_some(items);
            }
        }
    }

    fn tuple_or_group(&mut self) -> Option<Value> {
        self.bump();
        self.skip_whitespace();
        if self.eat(')') {
            return Some(Value::Tuple(Vec::new()));
        }
        let first = self.value()?;
        self.skip_whitespace();
        if self.eat(')') {
            return Some(first);
        }
        if !self.eat(',') {
            return None;
        }
        let mut items = vec![first];
        items.extend(self.items(')')?);
        Some(Value::Tuple(items))
    }

    fn dict(&mut self) -> Option<Value> {
        self.bump();
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat('}') {
                return Some(Value::Dict(entries));
            }
            let key = self.value()?;
            self.skip_whitespace();
            if !self.eat(':') {
                return None;
            }
            let value = self.value()?;
            entries.push((key, value));
            self.skip_whitespace();
            if !self.eat(',') {
                self.skip_whitespace();
                return self.eat('}').then_some(Value::Dict(entries));
            }
        }
    }
}
