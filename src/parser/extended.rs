//! The extended grammar-definition syntax: `Name = a b | c`, `"literal"`
//! string quoting only, `/regex/` literals, and `{min,max:delimiter}`
//! repeat suffixes in place of bare `*`/`+`/`?`.

use super::{Syntax, compile_rules, parse_with};
use crate::error::Result;
use crate::grammar::Grammar;
use crate::scanner::ScannerRef;

static SYNTAX: Syntax = Syntax {
    rule_sep: "=",
    alt_sep: "|",
    literal_quotes: &['"'],
    regex_forms: &[("/", "/", 1, 1)],
    allow_brace_repeat: true,
};

/// Parses `source` and compiles each rule it defines against `target`.
pub(crate) fn compile(target: &Grammar, source: &str) -> Result<Vec<(String, ScannerRef)>> {
    let rules = parse_with(&SYNTAX, source)?;
    compile_rules(target, rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;

    fn init() {
        let _ = env_logger::try_init();
    }

    #[test]
    fn compiles_a_simple_rule() {
        init();
        let g = Grammar::new(None);
        g.read("Start = \"a\" \"b\"").unwrap();
        let input = Input::new("ab");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 2));
    }

    #[test]
    fn compiles_alternation_and_repeat() {
        init();
        let g = Grammar::new(None);
        g.read("Start = (\"a\" | \"b\"){1,}").unwrap();
        let input = Input::new("aabba");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 5));
    }

    #[test]
    fn compiles_recursive_rules() {
        init();
        let g = Grammar::new(None);
        g.read("Start = \"(\" (Start)? \")\"").unwrap();
        let input = Input::new("((()))");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 6));
    }

    #[test]
    fn rejects_trailing_garbage() {
        init();
        let g = Grammar::new(None);
        assert!(g.read("Start = \"a\" )").is_err());
    }

    #[test]
    fn skips_hash_comments() {
        init();
        let g = Grammar::new(None);
        g.read(
            "# leading comment\n\
             Start = \"a\" # trailing comment\n\
                     \"b\" # another\n\
             # comment-only line\n",
        )
        .unwrap();
        let input = Input::new("ab");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 2));
    }
}
