//! Container-aware splitting of command lines into blocks.
//!
//! A separator only splits when it sits outside every quoted span and every
//! `()`, `[]`, `{}` pair, so composite literals such as
//! `names='fred, phyllis'` or `point=(1, 2)` stay in one block.

/// Separator between argument blocks.
pub const BLOCK_SEPARATOR: char = ' ';

/// Separator between a keyword name and its value.
pub const KEYWORD_SEPARATOR: char = '=';

/// One block of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// A separator followed this token. False for a token still being typed
    /// at the end of the input.
    pub terminated: bool,
}

/// Output of a split: the tokens, plus whether every quote and bracket was
/// closed by the end of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenized {
    pub tokens: Vec<Token>,
    pub complete: bool,
}

impl Tokenized {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token texts in order.
    pub fn texts(&self) -> Vec<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Owned token texts in order.
    pub fn into_texts(self) -> Vec<String> {
        self.tokens.into_iter().map(|t| t.text).collect()
    }

    /// The last token, if it has not been closed by a separator.
    pub fn unterminated_tail(&self) -> Option<&Token> {
        self.tokens.last().filter(|t| !t.terminated)
    }
}

/// Split `line` on `separator`, honouring nested quotes and brackets.
///
/// Runs of separators collapse. An unterminated quote or unbalanced bracket
/// yields `complete == false`; the trailing partial token is still returned.
/// Every top-level separator splits, so `tokenize("a=b=c", '=')` gives three
/// tokens. Use [`split_keyword`] to split a block into name and value once.
pub fn tokenize(line: &str, separator: char) -> Tokenized {
    let scan = scan(line, separator, usize::MAX);
    let mut tokens = Vec::new();
    let mut start = 0;
    for &at in &scan.splits {
        if at > start {
            tokens.push(Token {
                text: line[start..at].to_string(),
                terminated: true,
            });
        }
        start = at + separator.len_utf8();
    }
    if start < line.len() {
        tokens.push(Token {
            text: line[start..].to_string(),
            terminated: false,
        });
    }
    Tokenized {
        tokens,
        complete: scan.balanced,
    }
}

/// Split a block into keyword name and value at its first top-level `=`.
///
/// `"a=b=c"` gives `["a", "b=c"]`. A block without a top-level `=` comes
/// back as a single token. `"key="` gives `["key", ""]` with
/// `complete == false`: the value has not been typed yet.
pub fn split_keyword(block: &str) -> Tokenized {
    let scan = scan(block, KEYWORD_SEPARATOR, 1);
    match scan.splits.first() {
        Some(&at) => {
            let value = &block[at + KEYWORD_SEPARATOR.len_utf8()..];
            Tokenized {
                tokens: vec![
                    Token {
                        text: block[..at].to_string(),
                        terminated: true,
                    },
                    Token {
                        text: value.to_string(),
                        terminated: false,
                    },
                ],
                complete: scan.balanced && !value.is_empty(),
            }
        },
        None => tokenize(block, KEYWORD_SEPARATOR),
    }
}

struct Scan {
    splits: Vec<usize>,
    balanced: bool,
}

fn scan(line: &str, separator: char, limit: usize) -> Scan {
    let mut splits = Vec::new();
    let mut quote: Option<char> = None;
    let mut brackets: Vec<char> = Vec::new();
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' | '[' | '{' => brackets.push(ch),
            ')' | ']' | '}' => {
                if brackets.last() == Some(&opening(ch)) {
                    brackets.pop();
                }
            },
            c if c == separator && brackets.is_empty() && splits.len() < limit => {
                splits.push(i);
            },
            _ => {},
        }
    }

    Scan {
        splits,
        balanced: quote.is_none() && brackets.is_empty(),
    }
}

fn opening(close: char) -> char {
    match close {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}
