//! The value a successful match produces, and the actions that transform
//! it.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// The value produced by a successful match.
///
/// A non-capturing scanner (or a capturing composite with no capturing
/// children) yields [`Value::Str`] — the raw matched substring. A
/// capturing composite with no action yields [`Value::List`] of its
/// children's values. A scanner with an action yields whatever that
/// action returned, wrapped as [`Value::Opaque`] unless the action
/// itself chose to return a `Str`/`List`.
#[derive(Clone)]
pub enum Value<'a> {
    /// A borrowed slice of the input.
    Str(&'a str),
    /// An ordered list of child values.
    List(Vec<Value<'a>>),
    /// An action's result, type-erased.
    ///
    /// Opaque because the same action closure is built once and reused
    /// across many independently borrowed inputs; it cannot itself carry
    /// the lifetime of any one particular match.
    Opaque(Rc<dyn Any>),
}

impl<'a> Value<'a> {
    /// The raw substring this value was built from, if it is a plain
    /// `Str`.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The child values, if this is a `List`.
    pub fn as_list(&self) -> Option<&[Value<'a>]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    /// Downcasts an `Opaque` value to a concrete type `T`.
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        match self {
            Value::Opaque(v) => v.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(v) => write!(f, "List({v:?})"),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            // Opaque values are compared by the test's own equality on
            // the concrete downcast type; there is no generic equality
            // for type-erased payloads.
            _ => false,
        }
    }
}

/// A user-supplied transform from a scanner's intrinsic value to the
/// value ultimately reported for that scanner.
///
/// Generic over the input lifetime via a higher-ranked bound rather than
/// parameterized by one, since a scanner tree (and the actions attached
/// to it) is built once and matched against many unrelated inputs.
pub type Action = Rc<dyn for<'a> Fn(Value<'a>) -> Value<'a>>;

/// The full result of a successful match: the consumed span and the
/// value produced for it.
#[derive(Clone, Debug)]
pub struct Match<'a> {
    group: &'a str,
    pos: usize,
    endpos: usize,
    value: Value<'a>,
}

impl<'a> Match<'a> {
    /// Builds a match result for the span `[pos, endpos)`, whose raw
    /// text (regardless of `value`) is `group`.
    pub fn new(group: &'a str, pos: usize, endpos: usize, value: Value<'a>) -> Self {
        Match {
            group,
            pos,
            endpos,
            value,
        }
    }

    /// The code-point position where the match started.
    pub fn start(&self) -> usize {
        self.pos
    }

    /// The code-point position where the match ended.
    pub fn end(&self) -> usize {
        self.endpos
    }

    /// The `[start, end)` span, in code points.
    pub fn span(&self) -> (usize, usize) {
        (self.pos, self.endpos)
    }

    /// The value produced for this match.
    pub fn value(&self) -> &Value<'a> {
        &self.value
    }

    /// Consumes the match, returning its value.
    pub fn into_value(self) -> Value<'a> {
        self.value
    }

    /// The raw substring of the whole match, regardless of `value`.
    pub fn group(&self) -> &'a str {
        self.group
    }
}
