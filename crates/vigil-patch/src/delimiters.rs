//! Inline script delimiter checks
//!
//! [`check_delimiters`] is a static validator: it skips string literals,
//! template literals and comments, and reports every unmatched or mismatched
//! bracket with its position. Nothing is rewritten.
//!
//! [`legacy_balance`] keeps the old blind behaviour (count and append
//! closers) for pages that depend on it. It cannot tell a brace in a string
//! from a real one, so it is only applied when explicitly enabled.
//!
//! Regular expression literals are not recognised; a `/[{]/` in code is
//! counted as an opening brace.

use crate::error::PatchError;
use serde::{Deserialize, Serialize};
use vigil_dom::{Document, NodeId};

/// A delimiter problem with its 1-based position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelimiterIssue {
    /// Opened and never closed
    Unclosed {
        /// Opening delimiter
        open: char,
        /// Line
        line: usize,
        /// Column
        column: usize,
    },
    /// Closed with nothing open
    Unexpected {
        /// Closing delimiter
        close: char,
        /// Line
        line: usize,
        /// Column
        column: usize,
    },
    /// Closed with the wrong delimiter
    Mismatched {
        /// Opening delimiter
        open: char,
        /// Line of the opening delimiter
        open_line: usize,
        /// Closing delimiter found
        close: char,
        /// Line
        line: usize,
        /// Column
        column: usize,
    },
    /// String or template literal without its closing quote
    UnterminatedString {
        /// Quote character
        quote: char,
        /// Line where the literal starts
        line: usize,
        /// Column where the literal starts
        column: usize,
    },
    /// Block comment without `*/`
    UnterminatedComment {
        /// Line where the comment starts
        line: usize,
        /// Column where the comment starts
        column: usize,
    },
}

impl DelimiterIssue {
    /// Line the issue is reported at
    #[must_use]
    pub fn line(&self) -> usize {
        match *self {
            Self::Unclosed { line, .. }
            | Self::Unexpected { line, .. }
            | Self::Mismatched { line, .. }
            | Self::UnterminatedString { line, .. }
            | Self::UnterminatedComment { line, .. } => line,
        }
    }
}

/// Result of [`check_delimiters`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelimiterReport {
    /// Problems in source order of detection
    pub issues: Vec<DelimiterIssue>,
}

impl DelimiterReport {
    /// Whether no problem was found
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pos {
    line: usize,
    column: usize,
}

#[derive(Debug, Clone, Copy)]
struct Open {
    ch: char,
    at: Pos,
    /// Set for the `{` of a `${` inside a template literal; holds where the
    /// template started so scanning can resume inside it.
    template: Option<Pos>,
}

#[derive(Debug, Clone, Copy)]
enum Mode {
    Code,
    Quoted { quote: char, at: Pos },
    Template { at: Pos },
    LineComment,
    BlockComment { at: Pos },
}

struct Cursor {
    chars: Vec<char>,
    index: usize,
    pos: Pos,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            index: 0,
            pos: Pos { line: 1, column: 1 },
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek(0) {
            self.index += 1;
            if c == '\n' {
                self.pos.line += 1;
                self.pos.column = 1;
            } else {
                self.pos.column += 1;
            }
        }
    }
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Validate bracket structure of a script body
#[must_use]
pub fn check_delimiters(text: &str) -> DelimiterReport {
    let mut cursor = Cursor::new(text);
    let mut stack: Vec<Open> = Vec::new();
    let mut issues = Vec::new();
    let mut mode = Mode::Code;

    while let Some(c) = cursor.peek(0) {
        let at = cursor.pos;
        let next = cursor.peek(1);
        match mode {
            Mode::Code => match c {
                '/' if next == Some('/') => {
                    mode = Mode::LineComment;
                    cursor.bump();
                }
                '/' if next == Some('*') => {
                    mode = Mode::BlockComment { at };
                    cursor.bump();
                }
                '\'' | '"' => mode = Mode::Quoted { quote: c, at },
                '`' => mode = Mode::Template { at },
                '(' | '[' | '{' => stack.push(Open { ch: c, at, template: None }),
                ')' | ']' | '}' => match stack.pop() {
                    None => issues.push(DelimiterIssue::Unexpected {
                        close: c,
                        line: at.line,
                        column: at.column,
                    }),
                    Some(open) => {
                        if closer_for(open.ch) != c {
                            issues.push(DelimiterIssue::Mismatched {
                                open: open.ch,
                                open_line: open.at.line,
                                close: c,
                                line: at.line,
                                column: at.column,
                            });
                        }
                        if let Some(start) = open.template {
                            mode = Mode::Template { at: start };
                        }
                    }
                },
                _ => {}
            },
            Mode::Quoted { quote, at: start } => {
                if c == '\\' {
                    cursor.bump();
                } else if c == quote {
                    mode = Mode::Code;
                } else if c == '\n' {
                    issues.push(DelimiterIssue::UnterminatedString {
                        quote,
                        line: start.line,
                        column: start.column,
                    });
                    mode = Mode::Code;
                }
            }
            Mode::Template { at: start } => {
                if c == '\\' {
                    cursor.bump();
                } else if c == '`' {
                    mode = Mode::Code;
                } else if c == '$' && next == Some('{') {
                    cursor.bump();
                    stack.push(Open {
                        ch: '{',
                        at: cursor.pos,
                        template: Some(start),
                    });
                    mode = Mode::Code;
                }
            }
            Mode::LineComment => {
                if c == '\n' {
                    mode = Mode::Code;
                }
            }
            Mode::BlockComment { .. } => {
                if c == '*' && next == Some('/') {
                    cursor.bump();
                    mode = Mode::Code;
                }
            }
        }
        cursor.bump();
    }

    match mode {
        Mode::Quoted { quote, at } => issues.push(DelimiterIssue::UnterminatedString {
            quote,
            line: at.line,
            column: at.column,
        }),
        Mode::Template { at } => issues.push(DelimiterIssue::UnterminatedString {
            quote: '`',
            line: at.line,
            column: at.column,
        }),
        Mode::BlockComment { at } => issues.push(DelimiterIssue::UnterminatedComment {
            line: at.line,
            column: at.column,
        }),
        Mode::Code | Mode::LineComment => {}
    }

    issues.extend(stack.into_iter().map(|open| DelimiterIssue::Unclosed {
        open: open.ch,
        line: open.at.line,
        column: open.at.column,
    }));

    DelimiterReport { issues }
}

fn missing_closers(text: &str, open: char, close: char) -> usize {
    let opens = text.chars().filter(|c| *c == open).count();
    let closes = text.chars().filter(|c| *c == close).count();
    opens.saturating_sub(closes)
}

/// Blindly append missing `}` then missing `)`
///
/// Counts every occurrence, including ones inside strings and comments.
#[must_use]
pub fn legacy_balance(text: &str) -> String {
    let braces = missing_closers(text, '{', '}');
    let parens = missing_closers(text, '(', ')');
    let mut out = String::with_capacity(text.len() + braces + parens);
    out.push_str(text);
    out.extend(std::iter::repeat('}').take(braces));
    out.extend(std::iter::repeat(')').take(parens));
    out
}

/// An inline script that failed the delimiter check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScriptFinding {
    /// The `<script>` element
    pub node: NodeId,
    /// What was found
    pub report: DelimiterReport,
}

fn inline_scripts(doc: &Document) -> Vec<NodeId> {
    doc.elements_by_tag("script")
        .into_iter()
        .filter(|s| !doc.has_attribute(*s, "src"))
        .filter(|s| {
            doc.attribute(*s, "type")
                .map_or(true, |t| t.is_empty() || t.contains("javascript") || t == "module")
        })
        .collect()
}

/// Check every inline script; returns only the unbalanced ones
#[must_use]
pub fn check_inline_scripts(doc: &Document) -> Vec<InlineScriptFinding> {
    inline_scripts(doc)
        .into_iter()
        .filter_map(|node| {
            let report = check_delimiters(&doc.text_content(node));
            if report.is_balanced() {
                None
            } else {
                tracing::warn!(node = %node, issues = report.issues.len(), "inline script has unbalanced delimiters");
                Some(InlineScriptFinding { node, report })
            }
        })
        .collect()
}

/// Apply [`legacy_balance`] to every inline script; returns how many changed
///
/// # Errors
/// Returns `PatchError::Dom` if a script body cannot be rewritten.
pub fn balance_inline_scripts(doc: &mut Document) -> Result<usize, PatchError> {
    let mut changed = 0;
    for node in inline_scripts(doc) {
        let text = doc.text_content(node);
        let balanced = legacy_balance(&text);
        if balanced.len() != text.len() {
            tracing::warn!(node = %node, appended = %&balanced[text.len()..], "appended closers to inline script");
            doc.set_text(node, balanced)?;
            changed += 1;
        }
    }
    Ok(changed)
}
