//! The scanner algebra: primitive recognizers and the combinators that
//! compose them.
//!
//! A [`Scanner`] is a tagged variant ([`ScannerKind`]) rather than an
//! open hierarchy of trait objects, so that the grammar-definition
//! compiler (`crate::parser`) can be a total function over a closed set
//! of shapes, and so the whole tree can be walked, displayed, and shared
//! (`Rc`) without dynamic dispatch anywhere except user action closures.

mod charclass;
mod combinators;
mod primitives;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::{Error, Result};
use crate::grammar::GrammarInner;
use crate::input::Input;
use crate::value::{Action, Match, Value};

pub use charclass::CharClass;

/// A reference-counted handle to a scanner, the unit every combinator is
/// built from.
pub type ScannerRef = Rc<Scanner>;

/// A single node in a scanner tree.
///
/// `capturing` is computed once, from the variant's operands, at
/// construction time and never changes afterwards (see the module-level
/// documentation and [`ScannerKind::Nonterminal`] for why this holds even
/// across forward references).
pub struct Scanner {
    kind: ScannerKind,
    capturing: bool,
    action: Option<Action>,
}

/// The behavior-defining tag of a [`Scanner`].
pub enum ScannerKind {
    /// Matches exactly one code point.
    Dot,
    /// Matches literal text.
    Literal(String),
    /// Matches one code point from a parsed character class.
    CharacterClass(CharClass),
    /// Matches a regular expression, anchored at the current position.
    Regex {
        /// The pattern as the caller wrote it (unanchored), kept around
        /// purely so the scanner can `Display` back to its source form.
        pattern: String,
        /// The same pattern, compiled with an `\A` anchor prefix.
        compiled: regex::Regex,
    },
    /// Consumes a run of whitespace characters; always succeeds.
    Spacing(Vec<char>),
    /// `[-+]? \d+`.
    Integer,
    /// One of three float shapes; see [`crate::scanner::primitives`].
    Float,
    /// Matches `open`, then up to an unescaped `close`.
    BoundedString {
        /// Opening delimiter.
        open: String,
        /// Closing delimiter.
        close: String,
    },
    /// Recognizes `left body right` but reports only `body`'s value.
    Bounded {
        /// The left delimiter.
        left: ScannerRef,
        /// The bounded content.
        body: ScannerRef,
        /// The right delimiter.
        right: ScannerRef,
    },
    /// Matches each child scanner in order, starting where the last one
    /// ended.
    Sequence(Vec<ScannerRef>),
    /// Matches the first child scanner that succeeds (ordered, no
    /// backtracking across a committed alternative).
    Choice(Vec<ScannerRef>),
    /// Greedy `{min, max}` repetition with an optional separator.
    Repeat {
        /// The repeated scanner.
        scanner: ScannerRef,
        /// Minimum repetitions required for success.
        min: usize,
        /// Maximum repetitions attempted; `None` is unbounded.
        max: Option<usize>,
        /// An optional separator scanned between repetitions.
        delimiter: Option<ScannerRef>,
    },
    /// Always succeeds; reports the inner match, or a zero-width default.
    Optional {
        /// The optional scanner.
        scanner: ScannerRef,
        /// An explicit default value, if the caller supplied one.
        default: Option<Rc<dyn std::any::Any>>,
    },
    /// Zero-width positive assertion.
    Lookahead(ScannerRef),
    /// Zero-width negative assertion.
    NegativeLookahead(ScannerRef),
    /// Marks its child as capturing from the perspective of its parent.
    Group(ScannerRef),
    /// A named, late-bound reference into a grammar.
    ///
    /// Always non-capturing in its own right, regardless of what it
    /// resolves to — this is what lets `capturing` be fixed at
    /// construction time even for forward and mutually recursive
    /// references. Callers wanting a nonterminal's value visible to an
    /// enclosing [`ScannerKind::Sequence`] or [`ScannerKind::Repeat`]
    /// wrap the reference in [`ScannerKind::Group`].
    Nonterminal {
        /// The grammar this name is looked up in, held weakly so that a
        /// grammar and its own nonterminals never form an owning cycle.
        grammar: Weak<RefCell<GrammarInner>>,
        /// The rule name.
        name: String,
    },
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl fmt::Display for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ScannerKind::Dot => write!(f, "."),
            ScannerKind::Literal(x) => write!(f, "{x:?}"),
            ScannerKind::CharacterClass(c) => write!(f, "[{}]", c.spec()),
            ScannerKind::Regex { pattern, .. } => write!(f, "/{pattern}/"),
            ScannerKind::Spacing(_) => write!(f, "Spacing"),
            ScannerKind::Integer => write!(f, "Integer"),
            ScannerKind::Float => write!(f, "Float"),
            ScannerKind::BoundedString { open, close } => {
                write!(f, "BoundedString({open:?}, {close:?})")
            }
            ScannerKind::Bounded { left, body, right } => {
                write!(f, "{left} {body} {right}")
            }
            ScannerKind::Sequence(xs) => {
                let parts: Vec<String> = xs.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" "))
            }
            ScannerKind::Choice(xs) => {
                let parts: Vec<String> = xs.iter().map(ToString::to_string).collect();
                write!(f, "{}", parts.join(" | "))
            }
            ScannerKind::Repeat {
                scanner,
                min,
                max,
                delimiter,
            } => {
                let max = max.map_or(String::new(), |m| m.to_string());
                let delim = delimiter
                    .as_ref()
                    .map_or(String::new(), |d| format!(":{d}"));
                write!(f, "{scanner}{{{min},{max}{delim}}}")
            }
            ScannerKind::Optional { scanner, .. } => write!(f, "{scanner}?"),
            ScannerKind::Lookahead(s) => write!(f, "&{s}"),
            ScannerKind::NegativeLookahead(s) => write!(f, "!{s}"),
            ScannerKind::Group(s) => write!(f, "({s})"),
            ScannerKind::Nonterminal { name, .. } => write!(f, "{name}"),
        }
    }
}

impl Scanner {
    fn new(kind: ScannerKind, capturing: bool) -> ScannerRef {
        Rc::new(Scanner {
            kind,
            capturing,
            action: None,
        })
    }

    /// Rebinds this scanner's action, returning a new scanner sharing
    /// the same `kind`/`capturing` (the underlying children, if any, are
    /// shared via `Rc` rather than cloned).
    pub fn with_action(self: &ScannerRef, action: Action) -> ScannerRef {
        Rc::new(Scanner {
            kind: self.kind.clone_shallow(),
            capturing: self.capturing,
            action: Some(action),
        })
    }

    /// Whether this scanner contributes a value to its parent.
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// The tag of this scanner.
    pub fn kind(&self) -> &ScannerKind {
        &self.kind
    }

    /// Matches exactly one code point.
    pub fn dot() -> ScannerRef {
        Scanner::new(ScannerKind::Dot, false)
    }

    /// Matches literal text `x`.
    pub fn literal(x: impl Into<String>) -> ScannerRef {
        Scanner::new(ScannerKind::Literal(x.into()), false)
    }

    /// Matches one code point from the parsed class `spec`.
    pub fn character_class(spec: impl AsRef<str>) -> ScannerRef {
        Scanner::new(
            ScannerKind::CharacterClass(CharClass::parse(spec.as_ref())),
            false,
        )
    }

    /// Compiles `pattern` and matches it anchored at the current
    /// position.
    pub fn regex(pattern: &str) -> Result<ScannerRef> {
        let compiled = compile_anchored_regex(pattern)?;
        Ok(Scanner::new(
            ScannerKind::Regex {
                pattern: pattern.to_string(),
                compiled,
            },
            false,
        ))
    }

    /// Consumes a run of characters in `ws` (default `" \t\n\r\x0b\x0c"`).
    pub fn spacing(ws: Option<&str>) -> ScannerRef {
        let ws: Vec<char> = ws.unwrap_or(" \t\n\r\x0b\x0c").chars().collect();
        Scanner::new(ScannerKind::Spacing(ws), false)
    }

    /// `[-+]? \d+`.
    pub fn integer() -> ScannerRef {
        Scanner::new(ScannerKind::Integer, false)
    }

    /// One of three float shapes; see the module documentation.
    pub fn float() -> ScannerRef {
        Scanner::new(ScannerKind::Float, false)
    }

    /// Matches `open`, then up to an unescaped `close`.
    pub fn bounded_string(open: impl Into<String>, close: impl Into<String>) -> ScannerRef {
        Scanner::new(
            ScannerKind::BoundedString {
                open: open.into(),
                close: close.into(),
            },
            false,
        )
    }

    /// `Sequence(left, body, right)` in terms of recognition, but the
    /// value is exactly `body`'s own match value.
    pub fn bounded(left: ScannerRef, body: ScannerRef, right: ScannerRef) -> ScannerRef {
        Scanner::new(ScannerKind::Bounded { left, body, right }, false)
    }

    /// Matches each scanner in order. Errors if `scanners` is empty.
    pub fn sequence(scanners: Vec<ScannerRef>) -> Result<ScannerRef> {
        if scanners.is_empty() {
            return Err(Error::EmptySequence);
        }
        let capturing = scanners.iter().any(|s| s.capturing);
        Ok(Scanner::new(ScannerKind::Sequence(scanners), capturing))
    }

    /// Matches the first alternative that succeeds. Errors if
    /// `alternatives` is empty.
    pub fn choice(alternatives: Vec<ScannerRef>) -> Result<ScannerRef> {
        if alternatives.is_empty() {
            return Err(Error::EmptyChoice);
        }
        let capturing = alternatives.iter().any(|s| s.capturing);
        Ok(Scanner::new(ScannerKind::Choice(alternatives), capturing))
    }

    /// Greedy `{min, max}` repetition of `scanner`, with an optional
    /// `delimiter` scanned between repetitions.
    pub fn repeat(
        scanner: ScannerRef,
        min: usize,
        max: Option<usize>,
        delimiter: Option<ScannerRef>,
    ) -> ScannerRef {
        let capturing = scanner.capturing || delimiter.as_ref().is_some_and(|d| d.capturing);
        Scanner::new(
            ScannerKind::Repeat {
                scanner,
                min,
                max,
                delimiter,
            },
            capturing,
        )
    }

    /// `scanner{0,}` — zero or more repetitions.
    pub fn zero_or_more(scanner: ScannerRef) -> ScannerRef {
        Scanner::repeat(scanner, 0, None, None)
    }

    /// `scanner{1,}` — one or more repetitions.
    pub fn one_or_more(scanner: ScannerRef) -> ScannerRef {
        Scanner::repeat(scanner, 1, None, None)
    }

    /// Always succeeds. Reports `scanner`'s match if it succeeds,
    /// otherwise a zero-width match carrying `default` (or, absent a
    /// default, `[]` if `scanner` is capturing and `""` otherwise).
    ///
    /// `default`, if supplied, must be type-erased rather than a
    /// borrowed `Value`: the scanner is built once and reused across
    /// many independently borrowed inputs.
    pub fn optional(scanner: ScannerRef, default: Option<Rc<dyn std::any::Any>>) -> ScannerRef {
        let capturing = scanner.capturing;
        Scanner::new(ScannerKind::Optional { scanner, default }, capturing)
    }

    /// Zero-width positive assertion.
    pub fn lookahead(scanner: ScannerRef) -> ScannerRef {
        Scanner::new(ScannerKind::Lookahead(scanner), false)
    }

    /// Zero-width negative assertion.
    pub fn negative_lookahead(scanner: ScannerRef) -> ScannerRef {
        Scanner::new(ScannerKind::NegativeLookahead(scanner), false)
    }

    /// Marks `scanner` as capturing from the perspective of its parent.
    /// Absent an action, wraps the child's value in a singleton list.
    pub fn group(scanner: ScannerRef) -> ScannerRef {
        Scanner::new(ScannerKind::Group(scanner), true)
    }

    /// A named, late-bound reference into `grammar`. Always
    /// non-capturing; wrap in [`Scanner::group`] to make its value
    /// visible to an enclosing sequence or repeat.
    pub(crate) fn nonterminal(
        grammar: Weak<RefCell<GrammarInner>>,
        name: impl Into<String>,
    ) -> ScannerRef {
        Scanner::new(
            ScannerKind::Nonterminal {
                grammar,
                name: name.into(),
            },
            false,
        )
    }

    /// Recognizer only: returns the end position of a match starting at
    /// `pos`, or `None` if this scanner does not match there.
    pub fn scan(&self, input: &Input<'_>, pos: usize) -> Option<usize> {
        combinators::scan(self, input, pos)
    }

    /// Full matcher: returns the end position and captured value of a
    /// match starting at `pos`.
    ///
    /// `Ok(None)` is an ordinary non-match. `Err` is reserved for the
    /// one condition only detectable at match time: an unresolved
    /// [`ScannerKind::Nonterminal`].
    pub fn match_<'a>(&self, input: &Input<'a>, pos: usize) -> Result<Option<Match<'a>>> {
        combinators::match_(self, input, pos)
    }

    pub(crate) fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub(crate) fn apply_action<'a>(&self, value: Value<'a>) -> Value<'a> {
        match &self.action {
            Some(action) => action(value),
            None => value,
        }
    }
}

impl ScannerKind {
    /// A shallow copy: composite variants share their children's `Rc`s
    /// rather than deep-cloning the subtree. Used only by
    /// [`Scanner::with_action`].
    fn clone_shallow(&self) -> ScannerKind {
        match self {
            ScannerKind::Dot => ScannerKind::Dot,
            ScannerKind::Literal(x) => ScannerKind::Literal(x.clone()),
            ScannerKind::CharacterClass(c) => ScannerKind::CharacterClass(c.clone()),
            ScannerKind::Regex { pattern, compiled } => ScannerKind::Regex {
                pattern: pattern.clone(),
                compiled: compiled.clone(),
            },
            ScannerKind::Spacing(ws) => ScannerKind::Spacing(ws.clone()),
            ScannerKind::Integer => ScannerKind::Integer,
            ScannerKind::Float => ScannerKind::Float,
            ScannerKind::BoundedString { open, close } => ScannerKind::BoundedString {
                open: open.clone(),
                close: close.clone(),
            },
            ScannerKind::Bounded { left, body, right } => ScannerKind::Bounded {
                left: left.clone(),
                body: body.clone(),
                right: right.clone(),
            },
            ScannerKind::Sequence(xs) => ScannerKind::Sequence(xs.clone()),
            ScannerKind::Choice(xs) => ScannerKind::Choice(xs.clone()),
            ScannerKind::Repeat {
                scanner,
                min,
                max,
                delimiter,
            } => ScannerKind::Repeat {
                scanner: scanner.clone(),
                min: *min,
                max: *max,
                delimiter: delimiter.clone(),
            },
            ScannerKind::Optional { scanner, default } => ScannerKind::Optional {
                scanner: scanner.clone(),
                default: default.clone(),
            },
            ScannerKind::Lookahead(s) => ScannerKind::Lookahead(s.clone()),
            ScannerKind::NegativeLookahead(s) => ScannerKind::NegativeLookahead(s.clone()),
            ScannerKind::Group(s) => ScannerKind::Group(s.clone()),
            ScannerKind::Nonterminal { grammar, name } => ScannerKind::Nonterminal {
                grammar: grammar.clone(),
                name: name.clone(),
            },
        }
    }
}

/// Compiles `pattern` wrapped so that it can only match starting at byte
/// offset 0 of whatever haystack it is later run against — the anchor
/// [`primitives::scan_regex`] relies on to honor "matches at `pos`, not
/// merely somewhere at or after `pos`".
fn compile_anchored_regex(pattern: &str) -> Result<regex::Regex> {
    Ok(regex::Regex::new(&format!("\\A(?:{pattern})"))?)
}
