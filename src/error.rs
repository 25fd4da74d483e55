//! Error types returned by grammar construction, compilation, and
//! matching.

/// The result type used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A grammar-construction, compilation, or matching error.
///
/// Ordinary recognition failure ("this scanner did not match here") is
/// never represented by this type: it is represented by `None`/`Ok(None)`
/// at the call site. `Error` is reserved for conditions the caller must
/// fix, either in a grammar definition or in the scanner tree itself.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A [`Nonterminal`](crate::scanner::ScannerKind::Nonterminal)
    /// resolved, at match time, to a rule name no longer bound in its
    /// grammar (or to a grammar that has been dropped).
    #[error("unbound nonterminal '{0}'")]
    UnboundNonterminal(String),

    /// An action or override referenced a rule name that does not exist
    /// in the grammar.
    #[error("unknown rule '{0}'")]
    UnknownRule(String),

    /// A `Sequence` was constructed with zero children.
    #[error("sequence must have at least one element")]
    EmptySequence,

    /// A `Choice` was constructed with zero alternatives.
    #[error("choice must have at least one alternative")]
    EmptyChoice,

    /// A textual grammar definition failed to parse.
    #[error("invalid grammar definition: {0}")]
    InvalidDefinition(String),

    /// The intermediate-representation compiler encountered a tag it
    /// does not recognize. Unreachable via the two bundled readers;
    /// retained defensively for custom front ends.
    #[error("unknown expression tag '{0}'")]
    UnknownTag(String),

    /// [`split`](crate::split) encountered a trailing, unterminated
    /// backslash escape.
    #[error("runaway escape at end of input")]
    RunawayEscape,

    /// A `Regex` scanner, or a grammar-definition regex literal, failed
    /// to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}
