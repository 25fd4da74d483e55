//! The grammar-definition front end: an intermediate representation
//! (`Expr`) for parsed rule bodies, a compiler from that representation
//! into a [`Scanner`](crate::scanner::Scanner) tree, and two readers —
//! [`extended`] and [`peg`] — that parse the two bundled surface
//! syntaxes into it.
//!
//! The readers are themselves built from the scanner/combinator algebra
//! rather than hand-written recursive descent: each syntax's grammar of
//! grammars is expressed as a small bootstrap [`Grammar`], with its one
//! genuinely recursive production (`Group`, since a parenthesized group
//! can contain another parenthesized group) tied together through that
//! grammar's own [`Grammar::nonterminal`] — the same mechanism every
//! ordinary recursive user grammar uses.

use std::any::Any;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::grammar::Grammar;
use crate::input::Input;
use crate::scanner::{Scanner, ScannerRef};
use crate::value::Value;

pub mod extended;
pub mod peg;

/// An unbounded repeat, as written in `{m,n:delim}` / `{n}` syntax.
pub const UNBOUNDED: i64 = -1;

/// The intermediate representation a grammar-definition rule body
/// compiles to on its way to a [`Scanner`] tree.
#[derive(Clone, Debug)]
pub enum Expr {
    /// `.`
    Dot,
    /// `"…"` / `'…'`
    Literal(String),
    /// `[…]`
    CharacterClass(String),
    /// `/…/`, or (strict PEG only) `~"…"` / `~'…'`
    Regex(String),
    /// A bare identifier referencing another rule.
    Nonterminal(String),
    /// `(…)`
    Group(Box<Expr>),
    /// `&…`
    Lookahead(Box<Expr>),
    /// `!…`
    NegativeLookahead(Box<Expr>),
    /// `…?`
    Optional(Box<Expr>),
    /// `…*`
    ZeroOrMore(Box<Expr>),
    /// `…+`
    OneOrMore(Box<Expr>),
    /// `…{min,max:delimiter}` (extended syntax only)
    Repeat {
        /// The repeated expression.
        inner: Box<Expr>,
        /// Minimum repetitions.
        min: i64,
        /// Maximum repetitions, or [`UNBOUNDED`].
        max: i64,
        /// An optional separator expression.
        delimiter: Option<Box<Expr>>,
    },
    /// `A B C` — collapses to its single element when `len() == 1`,
    /// matching the reference readers' own minor optimization.
    Sequence(Vec<Expr>),
    /// `A | B | C` (or `A / B / C` in strict PEG)
    Choice(Vec<Expr>),
}

/// A prefix operator recognized between a term and its primary.
#[derive(Clone, Copy, Debug)]
enum Prefix {
    Lookahead,
    NegativeLookahead,
}

/// A suffix operator recognized after a term's primary.
#[derive(Clone, Debug)]
enum Suffix {
    ZeroOrMore,
    OneOrMore,
    Optional,
    Repeat {
        min: i64,
        max: i64,
        delimiter: Option<Box<Expr>>,
    },
}

/// Applies an optional prefix and optional suffix operator to `term`,
/// suffix first, then prefix — matching the order the reference readers
/// apply them in.
fn make_term(prefix: Option<Prefix>, term: Expr, suffix: Option<Suffix>) -> Expr {
    let term = match suffix {
        None => term,
        Some(Suffix::ZeroOrMore) => Expr::ZeroOrMore(Box::new(term)),
        Some(Suffix::OneOrMore) => Expr::OneOrMore(Box::new(term)),
        Some(Suffix::Optional) => Expr::Optional(Box::new(term)),
        Some(Suffix::Repeat { min, max, delimiter }) => Expr::Repeat {
            inner: Box::new(term),
            min,
            max,
            delimiter,
        },
    };
    match prefix {
        None => term,
        Some(Prefix::Lookahead) => Expr::Lookahead(Box::new(term)),
        Some(Prefix::NegativeLookahead) => Expr::NegativeLookahead(Box::new(term)),
    }
}

/// A sequence/choice of one element collapses to that element, exactly
/// as the reference readers do.
fn make_list(exprs: Vec<Expr>, wrap: fn(Vec<Expr>) -> Expr) -> Expr {
    let mut exprs = exprs;
    if exprs.len() == 1 {
        exprs.pop().expect("len checked above")
    } else {
        wrap(exprs)
    }
}

/// Compiles a parsed expression tree into a live scanner tree bound to
/// `target` (so that any `Expr::Nonterminal` inside it resolves against
/// the grammar the definition is actually being installed into, not the
/// bootstrap reader grammar that parsed the definition's text).
pub(crate) fn compile_expr(target: &Grammar, expr: &Expr) -> Result<ScannerRef> {
    Ok(match expr {
        Expr::Dot => Scanner::dot(),
        Expr::Literal(s) => Scanner::literal(s.clone()),
        Expr::CharacterClass(s) => Scanner::character_class(s),
        Expr::Regex(pattern) => Scanner::regex(pattern)?,
        Expr::Nonterminal(name) => target.nonterminal(name.clone()),
        Expr::Group(inner) => Scanner::group(compile_expr(target, inner)?),
        Expr::Lookahead(inner) => Scanner::lookahead(compile_expr(target, inner)?),
        Expr::NegativeLookahead(inner) => {
            Scanner::negative_lookahead(compile_expr(target, inner)?)
        }
        Expr::Optional(inner) => Scanner::optional(compile_expr(target, inner)?, None),
        Expr::ZeroOrMore(inner) => Scanner::zero_or_more(compile_expr(target, inner)?),
        Expr::OneOrMore(inner) => Scanner::one_or_more(compile_expr(target, inner)?),
        Expr::Repeat {
            inner,
            min,
            max,
            delimiter,
        } => {
            let scanner = compile_expr(target, inner)?;
            let max = if *max < 0 { None } else { Some(*max as usize) };
            let delimiter = delimiter
                .as_deref()
                .map(|d| compile_expr(target, d))
                .transpose()?;
            Scanner::repeat(scanner, (*min).max(0) as usize, max, delimiter)
        }
        Expr::Sequence(xs) => {
            let children = xs
                .iter()
                .map(|x| compile_expr(target, x))
                .collect::<Result<Vec<_>>>()?;
            Scanner::sequence(children)?
        }
        Expr::Choice(xs) => {
            let children = xs
                .iter()
                .map(|x| compile_expr(target, x))
                .collect::<Result<Vec<_>>>()?;
            Scanner::choice(children)?
        }
    })
}

/// Parses `x` (its sign already consumed by whatever matched `[-+]?`, if
/// any) as an `i64`. `x` is always ASCII digits here, per
/// [`Scanner::integer`]'s contract, except for a leading `+` that Rust's
/// own integer parser doesn't accept.
fn parse_int(x: &str) -> i64 {
    x.strip_prefix('+').unwrap_or(x).parse().expect("digits")
}

fn opaque<T: 'static>(v: T) -> Value<'static> {
    Value::Opaque(Rc::new(v) as Rc<dyn Any>)
}

fn downcast<T: Clone + 'static>(v: &Value<'_>) -> Option<T> {
    v.downcast_ref::<T>().cloned()
}

/// Where a surface syntax's textual differences live: the rule
/// separator (`=` vs `<-`), the alternation separator (`|` vs `/`), the
/// set of quote characters accepted for string literals, the accepted
/// regex-literal delimiter pairs, and whether `{...}` repeat syntax is
/// recognized at all (strict PEG has no counterpart for it).
struct Syntax {
    rule_sep: &'static str,
    alt_sep: &'static str,
    literal_quotes: &'static [char],
    regex_forms: &'static [(&'static str, &'static str, usize, usize)],
    allow_brace_repeat: bool,
}

/// Whitespace interspersed with `#`-to-end-of-line comments, repeated
/// until neither matches any further. Built as ordinary spacing, then a
/// repeated `"#" (!"\n" .)* ` followed by more spacing, rather than a
/// naive `Repeat(Choice(Spacing, Comment))`, since `Spacing` always
/// succeeds (even consuming nothing) and would make that repeat spin
/// forever; the comment branch here always consumes at least the `#`
/// itself, so each iteration strictly advances.
fn ws_reader() -> ScannerRef {
    let comment = Scanner::sequence(vec![
        Scanner::literal("#"),
        Scanner::repeat(
            Scanner::sequence(vec![
                Scanner::negative_lookahead(Scanner::literal("\n")),
                Scanner::dot(),
            ])
            .expect("two elements"),
            0,
            None,
            None,
        ),
        Scanner::spacing(None),
    ])
    .expect("three elements");
    Scanner::sequence(vec![Scanner::spacing(None), Scanner::repeat(comment, 0, None, None)])
        .expect("two elements")
}

/// Builds the bootstrap reader grammar for a given surface syntax. The
/// returned [`Grammar`]'s start rule parses a whole definition into a
/// `Value::List` of `("Rule", name, Expr)`-shaped
/// [`Value::Opaque`]`<(String, Expr)>` entries.
fn build_reader(syntax: &Syntax) -> Result<Grammar> {
    let reader = Grammar::new(Some("GrammarReader"));
    let ws = ws_reader();

    let int_reader = Scanner::group(Scanner::integer());
    let int_reader = int_reader.with_action(Rc::new(|v: Value<'_>| match v {
        Value::Str(s) => opaque(parse_int(s)),
        other => other,
    }));
    let id_reader = Scanner::regex(r"[-a-zA-Z_][-a-zA-Z0-9_]*")?;

    let dot_reader =
        Scanner::group(Scanner::literal(".")).with_action(Rc::new(|_| opaque(Expr::Dot)));

    let mut literal_readers = Vec::new();
    for &q in syntax.literal_quotes {
        let quote = q.to_string();
        let r = Scanner::group(Scanner::bounded_string(quote.clone(), quote));
        literal_readers.push(r.with_action(Rc::new(move |v: Value<'_>| match v {
            Value::Str(s) => opaque(Expr::Literal(s[1..s.len() - 1].to_string())),
            other => other,
        })));
    }

    let charclass_reader = Scanner::group(Scanner::bounded_string("[", "]")).with_action(Rc::new(
        |v: Value<'_>| match v {
            Value::Str(s) => opaque(Expr::CharacterClass(s[1..s.len() - 1].to_string())),
            other => other,
        },
    ));

    let mut regex_readers = Vec::new();
    for &(open, close, strip_head, strip_tail) in syntax.regex_forms {
        let r = Scanner::group(Scanner::bounded_string(open, close));
        regex_readers.push(r.with_action(Rc::new(move |v: Value<'_>| match v {
            Value::Str(s) => opaque(Expr::Regex(s[strip_head..s.len() - strip_tail].to_string())),
            other => other,
        })));
    }

    let rule_sep = syntax.rule_sep;
    let nonterminal_reader = {
        let ws = ws.clone();
        let guard = Scanner::negative_lookahead(
            Scanner::sequence(vec![ws, Scanner::literal(rule_sep)]).expect("two elements"),
        );
        let inner = Scanner::sequence(vec![Scanner::group(id_reader.clone()), guard])
            .expect("two elements");
        Scanner::group(inner).with_action(Rc::new(|v: Value<'_>| match v {
            Value::List(mut xs) if xs.len() == 1 => {
                let name = xs.remove(0);
                let name = name.as_str().expect("Id is non-capturing/raw").to_string();
                opaque(Expr::Nonterminal(name))
            }
            other => other,
        }))
    };

    let group_ref = reader.nonterminal("Group");

    let mut primary_alts = vec![dot_reader];
    primary_alts.extend(literal_readers);
    primary_alts.push(charclass_reader);
    primary_alts.extend(regex_readers);
    primary_alts.push(group_ref);
    primary_alts.push(nonterminal_reader);
    let primary_reader = Scanner::choice(primary_alts)?;

    let lookahead_reader = Scanner::group(Scanner::literal("&"))
        .with_action(Rc::new(|_| opaque(Prefix::Lookahead)));
    let neg_lookahead_reader = Scanner::group(Scanner::literal("!"))
        .with_action(Rc::new(|_| opaque(Prefix::NegativeLookahead)));
    let prefix_reader =
        Scanner::choice(vec![lookahead_reader, neg_lookahead_reader])?;

    let zero_or_more_reader = Scanner::group(Scanner::literal("*"))
        .with_action(Rc::new(|_| opaque(Suffix::ZeroOrMore)));
    let one_or_more_reader = Scanner::group(Scanner::literal("+"))
        .with_action(Rc::new(|_| opaque(Suffix::OneOrMore)));
    let optional_reader = Scanner::group(Scanner::literal("?"))
        .with_action(Rc::new(|_| opaque(Suffix::Optional)));

    let mut suffix_alts = vec![zero_or_more_reader, one_or_more_reader, optional_reader];
    if syntax.allow_brace_repeat {
        // "{" (?: (Integer) (?: "," (Integer) )? )? (?: ":" (Term) )? "}"
        //
        // `int_reader` and `primary_reader` are already `Group`-shaped
        // (capturing on their own), so no extra `Group` wrapping is
        // needed around them here for a `Sequence` to pick up their
        // value.
        let min_part = Scanner::optional(int_reader.clone(), Some(Rc::new(0i64) as Rc<dyn Any>));
        let max_part = Scanner::optional(
            Scanner::sequence(vec![Scanner::literal(","), int_reader.clone()])
                .expect("two elements"),
            Some(Rc::new(UNBOUNDED) as Rc<dyn Any>),
        );
        let delim_part = Scanner::optional(
            Scanner::sequence(vec![Scanner::literal(":"), primary_reader.clone()])
                .expect("two elements"),
            Some(Rc::new(()) as Rc<dyn Any>),
        );
        let body =
            Scanner::sequence(vec![min_part, max_part, delim_part]).expect("three elements");
        let repeat_reader = Scanner::bounded(
            Scanner::literal("{"),
            body,
            Scanner::literal("}"),
        )
        .with_action(Rc::new(|v: Value<'_>| match v {
            Value::List(xs) => {
                let mut it = xs.into_iter();
                let min = extract_repeat_min(it.next());
                let max = extract_repeat_max(it.next());
                let delimiter = extract_repeat_delim(it.next());
                opaque(Suffix::Repeat { min, max, delimiter })
            }
            other => other,
        }));
        suffix_alts.push(repeat_reader);
    }
    let suffix_reader = Scanner::choice(suffix_alts)?;

    let term_reader = Scanner::sequence(vec![
        Scanner::group(Scanner::optional(prefix_reader, None)),
        Scanner::group(primary_reader),
        Scanner::group(Scanner::optional(suffix_reader, None)),
    ])
    .expect("three elements")
    .with_action(Rc::new(|v: Value<'_>| match v {
        Value::List(xs) if xs.len() == 3 => {
            let mut it = xs.into_iter();
            let prefix = downcast::<Prefix>(&it.next().unwrap());
            let term = it.next().unwrap();
            let term: Expr = downcast::<Expr>(&term).expect("PrimaryReader yields an Expr");
            let suffix = extract_suffix(it.next());
            opaque(make_term(prefix, term, suffix))
        }
        other => other,
    }));

    let sequence_reader = Scanner::repeat(
        Scanner::group(term_reader),
        1,
        None,
        Some(ws.clone()),
    )
    .with_action(Rc::new(|v: Value<'_>| match v {
        Value::List(xs) => {
            let exprs: Vec<Expr> = xs
                .into_iter()
                .map(|x| downcast::<Expr>(&x).expect("TermReader yields an Expr"))
                .collect();
            opaque(make_list(exprs, Expr::Sequence))
        }
        other => other,
    }));

    let alt_sep = Scanner::sequence(vec![ws.clone(), Scanner::literal(syntax.alt_sep), ws.clone()])
        .expect("three elements");
    let choice_reader = Scanner::repeat(Scanner::group(sequence_reader), 1, None, Some(alt_sep))
        .with_action(Rc::new(|v: Value<'_>| match v {
            Value::List(xs) => {
                let exprs: Vec<Expr> = xs
                    .into_iter()
                    .map(|x| downcast::<Expr>(&x).expect("SequenceReader yields an Expr"))
                    .collect();
                opaque(make_list(exprs, Expr::Choice))
            }
            other => other,
        }));

    let group_reader = Scanner::bounded(
        Scanner::sequence(vec![Scanner::literal("("), ws.clone()]).expect("two elements"),
        choice_reader.clone(),
        Scanner::sequence(vec![ws.clone(), Scanner::literal(")")]).expect("two elements"),
    )
    .with_action(Rc::new(|v: Value<'_>| {
        let inner = downcast::<Expr>(&v).expect("ChoiceReader yields an Expr");
        opaque(Expr::Group(Box::new(inner)))
    }));
    reader.set("Group", group_reader);

    let rule_reader = Scanner::sequence(vec![
        ws.clone(),
        Scanner::group(id_reader),
        ws.clone(),
        Scanner::literal(rule_sep),
        ws.clone(),
        Scanner::group(choice_reader),
    ])
    .expect("six elements")
    .with_action(Rc::new(|v: Value<'_>| match v {
        Value::List(xs) if xs.len() == 2 => {
            let mut it = xs.into_iter();
            let name = it.next().unwrap();
            let name = name.as_str().expect("Id is raw text").to_string();
            let expr = downcast::<Expr>(&it.next().unwrap()).expect("ChoiceReader yields an Expr");
            opaque((name, expr))
        }
        other => other,
    }));

    let rules_reader = Scanner::repeat(Scanner::group(rule_reader), 1, None, Some(ws.clone()))
        .with_action(Rc::new(|v: Value<'_>| match v {
            Value::List(xs) => {
                let rules: Vec<(String, Expr)> = xs
                    .into_iter()
                    .map(|x| downcast::<(String, Expr)>(&x).expect("RuleReader yields a rule"))
                    .collect();
                opaque(rules)
            }
            other => other,
        }));
    // A trailing `ws` here (rather than leaving it to the caller) lets a
    // definition end in blank lines or a `#` comment with nothing after
    // it, which `Grammar::to_string()`'s own trailing newline relies on.
    let grammar_reader = Scanner::sequence(vec![Scanner::group(rules_reader), ws.clone()])
        .expect("two elements")
        .with_action(Rc::new(|v: Value<'_>| match v {
            Value::List(mut xs) if xs.len() == 1 => xs.remove(0),
            other => other,
        }));
    reader.set("GrammarReader", grammar_reader);

    Ok(reader)
}

fn extract_suffix(v: Option<Value<'_>>) -> Option<Suffix> {
    match v {
        Some(Value::Opaque(o)) => o.downcast_ref::<Suffix>().cloned(),
        _ => None,
    }
}

// `min_part`/`max_part`/`delim_part` are each an `Optional` directly
// wrapping either `int_reader` or a two-element `Sequence` whose only
// capturing child is `int_reader`/`primary_reader`; `Sequence`'s fold
// already unwraps that inner one-element list, so every element of
// `body`'s own accumulator is always a bare (non-list) value — a
// `Value::Opaque<i64>`/`Value::Opaque<Expr>` on a match, or the
// `Optional`'s own default sentinel otherwise.

fn extract_repeat_min(v: Option<Value<'_>>) -> i64 {
    v.as_ref().and_then(downcast::<i64>).unwrap_or(0)
}

fn extract_repeat_max(v: Option<Value<'_>>) -> i64 {
    v.as_ref().and_then(downcast::<i64>).unwrap_or(UNBOUNDED)
}

fn extract_repeat_delim(v: Option<Value<'_>>) -> Option<Box<Expr>> {
    v.as_ref().and_then(downcast::<Expr>).map(Box::new)
}

fn parse_with(syntax: &Syntax, source: &str) -> Result<Vec<(String, Expr)>> {
    let reader = build_reader(syntax)?;
    let input = Input::new(source);
    let Some(m) = reader.match_(&input, 0)? else {
        return Err(Error::InvalidDefinition(source.to_string()));
    };
    if m.end() != input.len() {
        return Err(Error::InvalidDefinition(source.to_string()));
    }
    downcast::<Vec<(String, Expr)>>(m.value())
        .ok_or_else(|| Error::InvalidDefinition(source.to_string()))
}

pub(crate) fn compile_rules(
    target: &Grammar,
    rules: Vec<(String, Expr)>,
) -> Result<Vec<(String, ScannerRef)>> {
    rules
        .into_iter()
        .map(|(name, expr)| Ok((name, compile_expr(target, &expr)?)))
        .collect()
}
