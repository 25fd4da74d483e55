//! End-to-end JSON parsing, built two ways: entirely by hand out of
//! scanner combinators, and compiled from a textual grammar definition
//! with actions bound on afterwards. Mirrors the two approaches side by
//! side the way the canonical JSON example in the grammar-definition
//! reference does, targeting `serde_json::Value` as the domain object
//! the actions build.

use std::rc::Rc;

use grammarian::scanner::Scanner;
use grammarian::{Action, Grammar, Input, Value};
use serde_json::json;

fn init() {
    let _ = env_logger::try_init();
}

fn wrap(v: serde_json::Value) -> Value<'static> {
    Value::Opaque(Rc::new(v))
}

fn unwrap(v: &Value<'_>) -> serde_json::Value {
    v.downcast_ref::<serde_json::Value>()
        .cloned()
        .unwrap_or_else(|| panic!("expected a JSON value, got {v:?}"))
}

/// `BoundedString` does not decode escape sequences, so this uses a
/// literal non-ASCII character rather than a `\uXXXX` escape to still
/// exercise multi-byte code points without depending on decoding this
/// crate doesn't implement.
const SAMPLE: &str = r#"{"bool":[true,false],"n":{"f":-0.14e3,"i":1},"s":"x","u":"ä","z":null}"#;

fn expected() -> serde_json::Value {
    json!({
        "bool": [true, false],
        "n": {"f": -140.0, "i": 1},
        "s": "x",
        "u": "ä",
        "z": null,
    })
}

/// Builds the JSON grammar entirely out of hand-composed combinators,
/// the way a host with no use for the textual syntax would.
fn build_by_hand() -> Grammar {
    let g = Grammar::new(Some("Start"));
    let ws = Scanner::spacing(None);
    let comma = Scanner::literal(",");

    let str_scanner = Scanner::group(Scanner::bounded_string("\"", "\"")).with_action(Rc::new(
        |v: Value<'_>| match v {
            Value::Str(s) => wrap(json!(s[1..s.len() - 1])),
            other => other,
        },
    ));
    let float_scanner =
        Scanner::group(Scanner::float()).with_action(Rc::new(|v: Value<'_>| match v {
            Value::Str(s) => wrap(json!(s.parse::<f64>().expect("well-formed float"))),
            other => other,
        }));
    let int_scanner =
        Scanner::group(Scanner::integer()).with_action(Rc::new(|v: Value<'_>| match v {
            Value::Str(s) => wrap(json!(s.parse::<i64>().expect("well-formed integer"))),
            other => other,
        }));
    let true_scanner =
        Scanner::group(Scanner::literal("true")).with_action(Rc::new(|_| wrap(json!(true))));
    let false_scanner =
        Scanner::group(Scanner::literal("false")).with_action(Rc::new(|_| wrap(json!(false))));
    let null_scanner =
        Scanner::group(Scanner::literal("null")).with_action(Rc::new(|_| wrap(json!(null))));

    let value_ref = g.nonterminal("Value");

    let object = Scanner::group(Scanner::bounded(
        Scanner::literal("{"),
        Scanner::repeat(
            Scanner::group(
                Scanner::sequence(vec![
                    ws.clone(),
                    str_scanner.clone(),
                    ws.clone(),
                    Scanner::literal(":"),
                    ws.clone(),
                    Scanner::group(value_ref.clone()),
                    ws.clone(),
                ])
                .expect("non-empty"),
            ),
            0,
            None,
            Some(comma.clone()),
        ),
        Scanner::literal("}"),
    ))
    .with_action(Rc::new(|v: Value<'_>| match v {
        Value::List(pairs) => {
            let entries: serde_json::Map<String, serde_json::Value> = pairs
                .into_iter()
                .map(|pair| {
                    let Value::List(mut kv) = pair else {
                        panic!("each entry is a [key, value] pair")
                    };
                    let value = unwrap(&kv.pop().expect("value"));
                    let key = match unwrap(&kv.pop().expect("key")) {
                        serde_json::Value::String(s) => s,
                        other => panic!("object key must be a string, got {other:?}"),
                    };
                    (key, value)
                })
                .collect();
            wrap(serde_json::Value::Object(entries))
        }
        other => other,
    }));

    let array = Scanner::group(Scanner::bounded(
        Scanner::sequence(vec![Scanner::literal("["), ws.clone()]).expect("non-empty"),
        Scanner::repeat(
            Scanner::group(value_ref.clone()),
            0,
            None,
            Some(Scanner::sequence(vec![ws.clone(), comma, ws.clone()]).expect("non-empty")),
        ),
        Scanner::sequence(vec![ws.clone(), Scanner::literal("]")]).expect("non-empty"),
    ))
    .with_action(Rc::new(|v: Value<'_>| match v {
        Value::List(xs) => wrap(serde_json::Value::Array(xs.iter().map(unwrap).collect())),
        other => other,
    }));

    g.set(
        "Value",
        Scanner::choice(vec![
            object.clone(),
            array.clone(),
            str_scanner,
            true_scanner,
            false_scanner,
            null_scanner,
            float_scanner,
            int_scanner,
        ])
        .expect("non-empty"),
    );
    g.set("Start", Scanner::choice(vec![object, array]).expect("non-empty"));
    g
}

/// Builds the same grammar from its textual definition, binding actions
/// on afterwards by name.
fn build_from_definition() -> Grammar {
    let g = Grammar::new(Some("Start"));
    g.read(
        r#"
        Start    = Object | Array
        Object   = "{" Spacing
                   ((DQString) Spacing ":" Spacing (Value)){:Comma}
                   Spacing "}"
        Array    = "[" Spacing
                   (Value){:Comma}
                   Spacing "]"
        Value    = Object | Array | DQString
                 | TrueVal | FalseVal | NullVal | Float | Integer
        TrueVal  = "true"
        FalseVal = "false"
        NullVal  = "null"
        Comma    = Spacing "," Spacing
        "#,
    )
    .expect("well-formed grammar definition");

    g.update_actions([
        (
            "Object".to_string(),
            Rc::new(|v: Value<'_>| match v {
                Value::List(pairs) => {
                    let entries: serde_json::Map<String, serde_json::Value> = pairs
                        .into_iter()
                        .map(|pair| {
                            let Value::List(mut kv) = pair else {
                                panic!("each entry is a [key, value] pair")
                            };
                            let value = unwrap(&kv.pop().expect("value"));
                            let key = match unwrap(&kv.pop().expect("key")) {
                                serde_json::Value::String(s) => s,
                                other => panic!("object key must be a string, got {other:?}"),
                            };
                            (key, value)
                        })
                        .collect();
                    wrap(serde_json::Value::Object(entries))
                }
                other => other,
            }) as Action,
        ),
        (
            "Array".to_string(),
            Rc::new(|v: Value<'_>| match v {
                Value::List(xs) => wrap(serde_json::Value::Array(xs.iter().map(unwrap).collect())),
                other => other,
            }) as Action,
        ),
        (
            "DQString".to_string(),
            Rc::new(|v: Value<'_>| match v {
                Value::Str(s) => wrap(json!(s[1..s.len() - 1])),
                other => other,
            }) as Action,
        ),
        (
            "TrueVal".to_string(),
            Rc::new(|_: Value<'_>| wrap(json!(true))) as Action,
        ),
        (
            "FalseVal".to_string(),
            Rc::new(|_: Value<'_>| wrap(json!(false))) as Action,
        ),
        (
            "NullVal".to_string(),
            Rc::new(|_: Value<'_>| wrap(json!(null))) as Action,
        ),
        (
            "Float".to_string(),
            Rc::new(|v: Value<'_>| match v {
                Value::Str(s) => wrap(json!(s.parse::<f64>().expect("well-formed float"))),
                other => other,
            }) as Action,
        ),
        (
            "Integer".to_string(),
            Rc::new(|v: Value<'_>| match v {
                Value::Str(s) => wrap(json!(s.parse::<i64>().expect("well-formed integer"))),
                other => other,
            }) as Action,
        ),
    ])
    .expect("every named rule above was installed by `read`");
    g
}

#[test]
fn hand_built_grammar_parses_the_sample_document() {
    init();
    let g = build_by_hand();
    let input = Input::new(SAMPLE);
    let m = g.match_(&input, 0).unwrap().expect("sample document matches");
    assert_eq!(m.span(), (0, input.len()));
    assert_eq!(unwrap(m.value()), expected());
}

#[test]
fn definition_grammar_parses_the_sample_document() {
    init();
    let g = build_from_definition();
    let input = Input::new(SAMPLE);
    let m = g.match_(&input, 0).unwrap().expect("sample document matches");
    assert_eq!(m.span(), (0, input.len()));
    assert_eq!(unwrap(m.value()), expected());
}

#[test]
fn rejects_malformed_documents() {
    init();
    let g = build_by_hand();
    let input = Input::new(r#"{"a": }"#);
    assert!(g.match_(&input, 0).unwrap().is_none());
}
