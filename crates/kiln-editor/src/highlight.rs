//! Syntax highlighting: tokenizers and the per-line token cache.
//!
//! A [`Tokenizer`] splits one source line into `(fragment, TokenKind)` pairs.
//! [`SyntaxHighlightCache`] sits in front of it and remembers the styled
//! result per line content, so redrawing an unchanged screen never
//! re-tokenizes.
//!
//! # Tokenizers
//!
//! - [`TreeSitterTokenizer`] parses the line with tree-sitter and runs the
//!   grammar's highlight query. Later captures override earlier ones for
//!   the same byte, so the more specific pattern wins.
//! - [`KeywordTokenizer`] is a small hand lexer (keywords, numbers, strings,
//!   line comments) for languages without a bundled grammar.
//! - [`PlainTokenizer`] returns the whole line unstyled.
//!
//! Each line is tokenized on its own. Constructs that span lines (block
//! comments, multi-line strings) are therefore only recognised on the line
//! where they open.
//!
//! # Cache policy
//!
//! Entries are keyed by `(hash of the line, tokenizer id)` and evicted in
//! insertion order once the cache holds more than its capacity. A hit does
//! not refresh an entry's age: this is FIFO, not LRU.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Query, QueryCursor};

/// Default number of cached lines.
pub const CACHE_CAPACITY: usize = 1000;

// ---------------------------------------------------------------------------
// Token kinds and style ids
// ---------------------------------------------------------------------------

/// What a tokenizer says a fragment is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    Keyword,
    String,
    Comment,
    Number,
    Function,
    Type,
    Constant,
    Macro,
    Attribute,
    Operator,
    Punctuation,
}

/// A named entry of the colour table. Syntax ids come from token kinds;
/// the rest are used by the screen for UI elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleId {
    Default,
    Keyword,
    String,
    Comment,
    Number,
    Function,
    Type,
    Constant,
    Decorator,
    Operator,
    LineNumber,
    Status,
    Message,
    Error,
    SearchMatch,
    Selection,
    Bracket,
}

impl StyleId {
    pub const ALL: [Self; 17] = [
        Self::Default,
        Self::Keyword,
        Self::String,
        Self::Comment,
        Self::Number,
        Self::Function,
        Self::Type,
        Self::Constant,
        Self::Decorator,
        Self::Operator,
        Self::LineNumber,
        Self::Status,
        Self::Message,
        Self::Error,
        Self::SearchMatch,
        Self::Selection,
        Self::Bracket,
    ];

    /// Key used for this style in the `[colors]` config table.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Keyword => "keyword",
            Self::String => "string",
            Self::Comment => "comment",
            Self::Number => "number",
            Self::Function => "function",
            Self::Type => "type",
            Self::Constant => "constant",
            Self::Decorator => "decorator",
            Self::Operator => "operator",
            Self::LineNumber => "line_number",
            Self::Status => "status",
            Self::Message => "message",
            Self::Error => "error",
            Self::SearchMatch => "search_highlight",
            Self::Selection => "selection",
            Self::Bracket => "matching_bracket",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl TokenKind {
    /// The fixed kind → style table.
    #[must_use]
    pub const fn style(self) -> StyleId {
        match self {
            Self::Text | Self::Punctuation => StyleId::Default,
            Self::Keyword => StyleId::Keyword,
            Self::String => StyleId::String,
            Self::Comment => StyleId::Comment,
            Self::Number => StyleId::Number,
            Self::Function => StyleId::Function,
            Self::Type => StyleId::Type,
            Self::Constant => StyleId::Constant,
            Self::Macro | Self::Attribute => StyleId::Decorator,
            Self::Operator => StyleId::Operator,
        }
    }
}

/// One styled fragment of a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub style: StyleId,
}

pub type TokenLine = Vec<Token>;

// ---------------------------------------------------------------------------
// Tokenizer capability
// ---------------------------------------------------------------------------

/// Splits a line into classified fragments. The fragments concatenate back
/// to the input line.
pub trait Tokenizer {
    /// Identity used in cache keys. Two tokenizers with the same id must
    /// produce the same output for the same line.
    fn id(&self) -> &str;

    fn tokenize(&mut self, line: &str, language: &str) -> Vec<(String, TokenKind)>;
}

/// The tokenizer for `language`: tree-sitter for Rust, the keyword lexer for
/// languages it knows, plain text otherwise.
#[must_use]
pub fn tokenizer_for(language: &str) -> Box<dyn Tokenizer> {
    if language == "rust" {
        match TreeSitterTokenizer::rust() {
            Some(ts) => return Box::new(ts),
            None => tracing::warn!(target: "kiln::highlight", "rust grammar unavailable; using keyword lexer"),
        }
    }
    KeywordTokenizer::new(language).map_or_else(
        || Box::new(PlainTokenizer) as Box<dyn Tokenizer>,
        |k| Box::new(k) as Box<dyn Tokenizer>,
    )
}

/// Merge per-char kinds into maximal same-kind fragments.
fn group<F>(line: &str, mut kind_at: F) -> Vec<(String, TokenKind)>
where
    F: FnMut(usize) -> TokenKind,
{
    let mut out: Vec<(String, TokenKind)> = Vec::new();
    for (byte, ch) in line.char_indices() {
        let kind = kind_at(byte);
        match out.last_mut() {
            Some((text, k)) if *k == kind => text.push(ch),
            _ => out.push((ch.to_string(), kind)),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// PlainTokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTokenizer;

impl Tokenizer for PlainTokenizer {
    fn id(&self) -> &str {
        "plain"
    }

    fn tokenize(&mut self, line: &str, _language: &str) -> Vec<(String, TokenKind)> {
        vec![(line.to_string(), TokenKind::Text)]
    }
}

// ---------------------------------------------------------------------------
// TreeSitterTokenizer
// ---------------------------------------------------------------------------

/// Tree-sitter grammar plus its highlight query.
pub struct TreeSitterTokenizer {
    id: String,
    parser: Parser,
    query: Query,
    /// Kind for each capture index of `query`.
    capture_kinds: Vec<TokenKind>,
}

impl TreeSitterTokenizer {
    /// Rust via `tree-sitter-rust`'s bundled highlight query. `None` if the
    /// grammar or query fails to load.
    #[must_use]
    pub fn rust() -> Option<Self> {
        let language: tree_sitter::Language = tree_sitter_rust::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).ok()?;
        let query = Query::new(&language, tree_sitter_rust::HIGHLIGHTS_QUERY).ok()?;
        let capture_kinds = query
            .capture_names()
            .iter()
            .map(|name| capture_kind(name))
            .collect();
        Some(Self {
            id: "tree-sitter:rust".into(),
            parser,
            query,
            capture_kinds,
        })
    }
}

impl Tokenizer for TreeSitterTokenizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn tokenize(&mut self, line: &str, _language: &str) -> Vec<(String, TokenKind)> {
        let Some(tree) = self.parser.parse(line, None) else {
            return vec![(line.to_string(), TokenKind::Text)];
        };

        let mut kinds = vec![TokenKind::Text; line.len()];
        let mut cursor = QueryCursor::new();
        let mut captures = cursor.captures(&self.query, tree.root_node(), line.as_bytes());
        while let Some((m, _)) = captures.next() {
            for capture in m.captures {
                let kind = self.capture_kinds[capture.index as usize];
                if kind == TokenKind::Text {
                    continue;
                }
                let range = capture.node.byte_range();
                let end = range.end.min(kinds.len());
                let start = range.start.min(end);
                kinds[start..end].fill(kind);
            }
        }

        group(line, |byte| kinds[byte])
    }
}

/// Map a highlight-query capture name to a token kind.
#[allow(clippy::match_same_arms)]
fn capture_kind(name: &str) -> TokenKind {
    match name {
        "keyword" => TokenKind::Keyword,
        "string" | "escape" => TokenKind::String,
        "comment" | "comment.documentation" => TokenKind::Comment,
        "function" | "function.method" => TokenKind::Function,
        "function.macro" => TokenKind::Macro,
        "type" | "type.builtin" | "constructor" => TokenKind::Type,
        "constant" | "constant.builtin" => TokenKind::Constant,
        "attribute" => TokenKind::Attribute,
        "operator" => TokenKind::Operator,
        "punctuation.bracket" | "punctuation.delimiter" => TokenKind::Punctuation,
        _ => TokenKind::Text,
    }
}

// ---------------------------------------------------------------------------
// KeywordTokenizer
// ---------------------------------------------------------------------------

struct LanguageRules {
    keywords: &'static [&'static str],
    constants: &'static [&'static str],
    line_comment: &'static str,
}

const PYTHON: LanguageRules = LanguageRules {
    keywords: &[
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "finally", "for", "from", "global", "if", "import", "in",
        "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try", "while",
        "with", "yield",
    ],
    constants: &["True", "False", "None", "self"],
    line_comment: "#",
};

const C_LIKE: LanguageRules = LanguageRules {
    keywords: &[
        "break", "case", "catch", "class", "const", "continue", "default", "do", "else",
        "enum", "export", "extern", "for", "func", "function", "go", "if", "import", "let",
        "new", "package", "return", "static", "struct", "switch", "this", "throw", "try",
        "type", "typedef", "var", "void", "while",
    ],
    constants: &["true", "false", "null", "nil", "NULL", "undefined"],
    line_comment: "//",
};

const SHELL: LanguageRules = LanguageRules {
    keywords: &[
        "if", "then", "else", "elif", "fi", "for", "while", "do", "done", "case", "esac",
        "function", "in", "return", "local", "export",
    ],
    constants: &["true", "false"],
    line_comment: "#",
};

const TOML_LIKE: LanguageRules = LanguageRules {
    keywords: &[],
    constants: &["true", "false", "null", "yes", "no"],
    line_comment: "#",
};

fn rules_for(language: &str) -> Option<&'static LanguageRules> {
    match language {
        "python" => Some(&PYTHON),
        "rust" | "c" | "cpp" | "java" | "javascript" | "typescript" | "go" | "csharp" => {
            Some(&C_LIKE)
        }
        "shell" | "bash" => Some(&SHELL),
        "toml" | "yaml" => Some(&TOML_LIKE),
        _ => None,
    }
}

/// Keyword / number / string / comment lexer.
pub struct KeywordTokenizer {
    id: String,
    rules: &'static LanguageRules,
}

impl KeywordTokenizer {
    /// `None` for languages without lexer rules.
    #[must_use]
    pub fn new(language: &str) -> Option<Self> {
        rules_for(language).map(|rules| Self {
            id: format!("keywords:{language}"),
            rules,
        })
    }
}

impl Tokenizer for KeywordTokenizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn tokenize(&mut self, line: &str, _language: &str) -> Vec<(String, TokenKind)> {
        let chars: Vec<char> = line.chars().collect();
        let mut kinds = vec![TokenKind::Text; chars.len()];
        let comment: Vec<char> = self.rules.line_comment.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            let start = i;
            let kind = if !comment.is_empty() && chars[i..].starts_with(&comment) {
                i = chars.len();
                TokenKind::Comment
            } else if ch == '"' || ch == '\'' {
                i += 1;
                while i < chars.len() && chars[i] != ch {
                    i += if chars[i] == '\\' { 2 } else { 1 };
                }
                i = (i + 1).min(chars.len());
                TokenKind::String
            } else if ch.is_ascii_digit() {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '.' | '_')) {
                    i += 1;
                }
                TokenKind::Number
            } else if ch.is_alphabetic() || ch == '_' {
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                if self.rules.keywords.contains(&word.as_str()) {
                    TokenKind::Keyword
                } else if self.rules.constants.contains(&word.as_str()) {
                    TokenKind::Constant
                } else if chars.get(i) == Some(&'(') {
                    TokenKind::Function
                } else if ch.is_uppercase() {
                    TokenKind::Type
                } else {
                    TokenKind::Text
                }
            } else if "+-*/%=<>!&|^~".contains(ch) {
                i += 1;
                TokenKind::Operator
            } else if ch == '@' {
                while i + 1 < chars.len() && (chars[i + 1].is_alphanumeric() || matches!(chars[i + 1], '_' | '.')) {
                    i += 1;
                }
                i += 1;
                TokenKind::Attribute
            } else {
                i += 1;
                if ch.is_whitespace() { TokenKind::Text } else { TokenKind::Punctuation }
            };
            kinds[start..i].fill(kind);
        }

        let mut char_index = 0;
        let offsets: HashMap<usize, usize> = line
            .char_indices()
            .map(|(byte, _)| {
                let entry = (byte, char_index);
                char_index += 1;
                entry
            })
            .collect();
        group(line, |byte| offsets.get(&byte).map_or(TokenKind::Text, |&c| kinds[c]))
    }
}

// ---------------------------------------------------------------------------
// SyntaxHighlightCache
// ---------------------------------------------------------------------------

/// `(hash of line content, tokenizer id)`.
type CacheKey = (u64, String);

/// Bounded per-line token cache in front of one active tokenizer.
pub struct SyntaxHighlightCache {
    tokenizer: Box<dyn Tokenizer>,
    entries: HashMap<CacheKey, TokenLine>,
    order: VecDeque<CacheKey>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl SyntaxHighlightCache {
    #[must_use]
    pub fn new(tokenizer: Box<dyn Tokenizer>) -> Self {
        Self::with_capacity(tokenizer, CACHE_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(tokenizer: Box<dyn Tokenizer>, capacity: usize) -> Self {
        Self {
            tokenizer,
            entries: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    /// Swap the active tokenizer (language change). Existing entries stay;
    /// they simply stop matching because the id is part of the key.
    pub fn set_tokenizer(&mut self, tokenizer: Box<dyn Tokenizer>) {
        tracing::debug!(target: "kiln::highlight", from = self.tokenizer.id(), to = tokenizer.id(), "tokenizer switched");
        self.tokenizer = tokenizer;
    }

    #[must_use]
    pub fn tokenizer_id(&self) -> &str {
        self.tokenizer.id()
    }

    /// Styled fragments for `line`.
    pub fn highlight(&mut self, line: &str, language: &str) -> TokenLine {
        if line.trim().is_empty() {
            return vec![Token {
                text: line.to_string(),
                style: StyleId::Default,
            }];
        }

        let key = (hash_line(line), self.tokenizer.id().to_string());
        if let Some(tokens) = self.entries.get(&key) {
            self.hits += 1;
            return tokens.clone();
        }
        self.misses += 1;

        let tokens: TokenLine = self
            .tokenizer
            .tokenize(line, language)
            .into_iter()
            .map(|(text, kind)| Token {
                text,
                style: kind.style(),
            })
            .collect();

        self.entries.insert(key.clone(), tokens.clone());
        self.order.push_back(key);
        if self.entries.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(hits, misses)` since creation.
    #[must_use]
    pub const fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

fn hash_line(line: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    line.hash(&mut hasher);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
