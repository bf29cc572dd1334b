use earlex_lexer::{Lexer, TokenConstructor, TokenSpec};

use crate::parser::parse;

mod ast;
mod parser;
mod tokenizer;

/// Builds a token specification from a regular expression. The pattern is
/// parsed up front and compiled onto the lexer's states between the initial
/// state and a fresh final state bound to `then`.
///
/// Supported syntax: literals, `.`, escapes (`\n \r \t \s \c \w \d` and
/// literal escapes of any printable character), concatenation, alternation
/// `|`, the quantifiers `? * +`, grouping `(...)`, and character classes
/// `[...]` / `[^...]` with characters, escapes and ranges. Patterns are
/// written in printable ASCII; the compiled machine itself matches arbitrary
/// codepoints.
pub fn regex<T: 'static>(pattern: impl Into<String>, then: TokenConstructor<T>) -> TokenSpec<T> {
    let pattern = pattern.into();
    Box::new(move |l: &mut Lexer<T>| {
        let end = l.state();
        l.accept(end, then);

        let tokens = tokenizer::LEXICON.tokenize(&pattern).force()?;
        let expr = parse(&*parser::RULES, tokens)?;

        expr.compile(l, 0, end);
        Ok(())
    })
}
