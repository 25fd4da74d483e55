//! Dispatch for every [`ScannerKind`]: the recognizer (`scan`) and full
//! matcher (`match_`) entry points, plus the combinator semantics that
//! don't belong to a single primitive.

use crate::error::{Error, Result};
use crate::input::Input;
use crate::scanner::{Scanner, ScannerKind};
use crate::value::{Match, Value};

use super::primitives;

pub(super) fn scan(s: &Scanner, input: &Input<'_>, pos: usize) -> Option<usize> {
    match s.kind() {
        ScannerKind::Dot => primitives::scan_dot(input, pos),
        ScannerKind::Literal(x) => primitives::scan_literal(input, pos, x),
        ScannerKind::CharacterClass(c) => primitives::scan_character_class(input, pos, c),
        ScannerKind::Regex { compiled, .. } => primitives::scan_regex(input, pos, compiled),
        ScannerKind::Spacing(ws) => Some(primitives::scan_spacing(input, pos, ws)),
        ScannerKind::Integer => primitives::scan_integer(input, pos),
        ScannerKind::Float => primitives::scan_float(input, pos),
        ScannerKind::BoundedString { open, close } => {
            primitives::scan_bounded_string(input, pos, open, close)
        }
        ScannerKind::Bounded { left, body, right } => {
            let end = left.scan(input, pos)?;
            let end = body.scan(input, end)?;
            right.scan(input, end)
        }
        ScannerKind::Sequence(xs) => {
            let mut p = pos;
            for x in xs {
                p = x.scan(input, p)?;
            }
            Some(p)
        }
        ScannerKind::Choice(xs) => xs.iter().find_map(|x| x.scan(input, pos)),
        ScannerKind::Repeat {
            scanner,
            min,
            max,
            delimiter,
        } => scan_repeat(input, pos, scanner, *min, *max, delimiter.as_deref()),
        ScannerKind::Optional { scanner, .. } => Some(scanner.scan(input, pos).unwrap_or(pos)),
        ScannerKind::Lookahead(x) => x.scan(input, pos).map(|_| pos),
        ScannerKind::NegativeLookahead(x) => {
            if x.scan(input, pos).is_some() {
                None
            } else {
                Some(pos)
            }
        }
        ScannerKind::Group(x) => x.scan(input, pos),
        ScannerKind::Nonterminal { grammar, name } => {
            let grammar = grammar.upgrade()?;
            let target = grammar.borrow().get(name)?;
            target.scan(input, pos)
        }
    }
}

fn scan_repeat(
    input: &Input<'_>,
    pos: usize,
    scanner: &Scanner,
    min: usize,
    max: Option<usize>,
    delimiter: Option<&Scanner>,
) -> Option<usize> {
    let mut count = 0usize;
    let mut committed = pos;
    let mut next = scanner.scan(input, pos);
    while let Some(end) = next {
        if max.is_some_and(|m| count == m) {
            break;
        }
        committed = end;
        count += 1;
        next = match delimiter {
            Some(d) => match d.scan(input, committed) {
                Some(after_delim) => scanner.scan(input, after_delim),
                None => None,
            },
            None => scanner.scan(input, committed),
        };
    }
    if count >= min { Some(committed) } else { None }
}

pub(super) fn match_<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
) -> Result<Option<Match<'a>>> {
    match s.kind() {
        ScannerKind::Bounded { left, body, right } => match_bounded(s, input, pos, left, body, right),
        ScannerKind::Sequence(xs) => match_sequence(s, input, pos, xs),
        ScannerKind::Choice(xs) => match_choice(s, input, pos, xs),
        ScannerKind::Repeat {
            scanner,
            min,
            max,
            delimiter,
        } => match_repeat(s, input, pos, scanner, *min, *max, delimiter.as_deref()),
        ScannerKind::Optional { scanner, default } => {
            match_optional(s, input, pos, scanner, default.as_ref())
        }
        ScannerKind::Lookahead(x) => Ok(x
            .scan(input, pos)
            .map(|_| Match::new("", pos, pos, Value::Str("")))),
        ScannerKind::NegativeLookahead(x) => Ok(if x.scan(input, pos).is_some() {
            None
        } else {
            Some(Match::new("", pos, pos, Value::Str("")))
        }),
        ScannerKind::Group(x) => match_group(s, input, pos, x),
        ScannerKind::Nonterminal { grammar, name } => match_nonterminal(s, input, pos, grammar, name),
        // Every other variant is a plain recognizer: the value defaults
        // to the raw matched substring, then the scanner's own action
        // (if any) is applied.
        _ => match scan(s, input, pos) {
            None => Ok(None),
            Some(end) => {
                let text = input.slice(pos, end).expect("scan endpos within input");
                let value = s.apply_action(Value::Str(text));
                Ok(Some(Match::new(text, pos, end, value)))
            }
        },
    }
}

fn match_bounded<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    left: &Scanner,
    body: &Scanner,
    right: &Scanner,
) -> Result<Option<Match<'a>>> {
    let Some(after_left) = left.scan(input, pos) else {
        return Ok(None);
    };
    let Some(m) = body.match_(input, after_left)? else {
        return Ok(None);
    };
    let Some(end) = right.scan(input, m.end()) else {
        return Ok(None);
    };
    let text = input.slice(pos, end).expect("scan endpos within input");
    let value = s.apply_action(m.into_value());
    Ok(Some(Match::new(text, pos, end, value)))
}

/// Folds one child match into a `Sequence`/`Repeat` accumulator: a
/// capturing child with no action of its own extends the accumulator
/// with its elements if its value is actually a list, otherwise (and
/// always, for a child carrying an action) the value is appended whole.
///
/// The reference implementation unconditionally extends whenever the
/// child has no action, which can panic if that child is itself a
/// capturing `Choice` that selected a non-capturing (raw-string)
/// alternative. This checks the value's actual shape instead.
fn fold_child<'a>(acc: &mut Vec<Value<'a>>, child: &Scanner, value: Value<'a>) {
    if child.action().is_none() {
        match value {
            Value::List(items) => acc.extend(items),
            other => acc.push(other),
        }
    } else {
        acc.push(value);
    }
}

fn match_sequence<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    xs: &[super::ScannerRef],
) -> Result<Option<Match<'a>>> {
    let mut acc = Vec::new();
    let mut end = pos;
    for child in xs {
        if child.is_capturing() {
            let Some(m) = child.match_(input, end)? else {
                return Ok(None);
            };
            end = m.end();
            fold_child(&mut acc, child, m.into_value());
        } else {
            let Some(next) = child.scan(input, end) else {
                return Ok(None);
            };
            end = next;
        }
    }
    let text = input.slice(pos, end).expect("scan endpos within input");
    let value = if s.is_capturing() {
        Value::List(acc)
    } else {
        Value::Str(text)
    };
    Ok(Some(Match::new(text, pos, end, s.apply_action(value))))
}

fn match_choice<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    xs: &[super::ScannerRef],
) -> Result<Option<Match<'a>>> {
    for child in xs {
        if let Some(m) = child.match_(input, pos)? {
            let text = m.group();
            let end = m.end();
            let value = s.apply_action(m.into_value());
            return Ok(Some(Match::new(text, pos, end, value)));
        }
    }
    Ok(None)
}

fn match_repeat<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    scanner: &Scanner,
    min: usize,
    max: Option<usize>,
    delimiter: Option<&Scanner>,
) -> Result<Option<Match<'a>>> {
    let mut acc = Vec::new();
    let mut count = 0usize;
    let mut end = pos;
    let mut next = scanner.match_(input, end)?;
    while let Some(m) = next {
        if max.is_some_and(|max| count == max) {
            break;
        }
        end = m.end();
        count += 1;
        if scanner.is_capturing() {
            fold_child(&mut acc, scanner, m.into_value());
        }
        next = match delimiter {
            Some(d) => {
                if d.is_capturing() {
                    match d.match_(input, end)? {
                        Some(dm) => {
                            let after = dm.end();
                            fold_child(&mut acc, d, dm.into_value());
                            scanner.match_(input, after)?
                        }
                        None => None,
                    }
                } else {
                    match d.scan(input, end) {
                        Some(after) => scanner.match_(input, after)?,
                        None => None,
                    }
                }
            }
            None => scanner.match_(input, end)?,
        };
    }
    if count < min {
        return Ok(None);
    }
    let text = input.slice(pos, end).expect("scan endpos within input");
    let value = if s.is_capturing() {
        Value::List(acc)
    } else {
        Value::Str(text)
    };
    Ok(Some(Match::new(text, pos, end, s.apply_action(value))))
}

fn match_optional<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    scanner: &Scanner,
    default: Option<&std::rc::Rc<dyn std::any::Any>>,
) -> Result<Option<Match<'a>>> {
    if let Some(m) = scanner.match_(input, pos)? {
        return Ok(Some(m));
    }
    let value = match default {
        Some(d) => Value::Opaque(d.clone()),
        None if scanner.is_capturing() => Value::List(Vec::new()),
        None => Value::Str(""),
    };
    let value = s.apply_action(value);
    Ok(Some(Match::new("", pos, pos, value)))
}

fn match_group<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    x: &Scanner,
) -> Result<Option<Match<'a>>> {
    let Some(m) = x.match_(input, pos)? else {
        return Ok(None);
    };
    let text = m.group();
    let end = m.end();
    let inner = m.into_value();
    let value = match s.action() {
        Some(action) => action(inner),
        None => Value::List(vec![inner]),
    };
    Ok(Some(Match::new(text, pos, end, value)))
}

fn match_nonterminal<'a>(
    s: &Scanner,
    input: &Input<'a>,
    pos: usize,
    grammar: &std::rc::Weak<std::cell::RefCell<crate::grammar::GrammarInner>>,
    name: &str,
) -> Result<Option<Match<'a>>> {
    let grammar = grammar
        .upgrade()
        .ok_or_else(|| Error::UnboundNonterminal(name.to_string()))?;
    let target = grammar
        .borrow()
        .get(name)
        .ok_or_else(|| Error::UnboundNonterminal(name.to_string()))?;
    let Some(m) = target.match_(input, pos)? else {
        return Ok(None);
    };
    let text = m.group();
    let end = m.end();
    let value = s.apply_action(m.into_value());
    Ok(Some(Match::new(text, pos, end, value)))
}
