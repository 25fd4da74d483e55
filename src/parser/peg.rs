//! The strict PEG grammar-definition syntax: `Name <- a b / c`, single-
//! or double-quoted string literals, `/regex/` or `~"regex"`/`~'regex'`
//! literals, and no `{min,max:delimiter}` repeat suffix (only the usual
//! `*`/`+`/`?`).

use super::{Syntax, compile_rules, parse_with};
use crate::error::Result;
use crate::grammar::Grammar;
use crate::scanner::ScannerRef;

static SYNTAX: Syntax = Syntax {
    rule_sep: "<-",
    alt_sep: "/",
    literal_quotes: &['"', '\''],
    regex_forms: &[("/", "/", 1, 1), ("~\"", "\"", 2, 1), ("~'", "'", 2, 1)],
    allow_brace_repeat: false,
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
        g.read_peg("Start <- 'a' 'b'").unwrap();
        let input = Input::new("ab");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 2));
    }

    #[test]
    fn compiles_alternation_and_star() {
        init();
        let g = Grammar::new(None);
        g.read_peg("Start <- ('a' / 'b')+").unwrap();
        let input = Input::new("aabba");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 5));
    }

    #[test]
    fn compiles_tilde_quoted_regex() {
        init();
        let g = Grammar::new(None);
        g.read_peg("Start <- ~\"[0-9]+\"").unwrap();
        let input = Input::new("123abc");
        let m = g.match_(&input, 0).unwrap().unwrap();
        assert_eq!(m.span(), (0, 3));
    }

    #[test]
    fn has_no_brace_repeat_syntax() {
        init();
        let g = Grammar::new(None);
        assert!(g.read_peg("Start <- 'a'{1,2}").is_err());
    }
}
