use earlex_lexer::Lexer;
use once_cell::sync::Lazy;

use crate::grammar::Syntax;
use crate::token::Token;

/// `[`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeftBracket;
/// `]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RightBracket;
/// `-`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Minus;
/// `^`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Caret;
/// `(`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LeftParen;
/// `)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RightParen;
/// `|`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Vertical;
/// `.`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Dot;
/// `?`, `*` or `+`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Quantifier(pub(crate) char);
/// Backslash followed by a printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Escaped(pub(crate) char);
/// Any other printable character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Character(pub(crate) char);

macro_rules! leaf_syntax {
    ($($ty:ty),* $(,)?) => {
        $(impl Syntax for $ty {})*
    };
}

leaf_syntax!(
    LeftBracket,
    RightBracket,
    Minus,
    Caret,
    LeftParen,
    RightParen,
    Vertical,
    Dot,
    Quantifier,
    Escaped,
    Character,
);

/// Machine lexing the regex surface syntax itself. Patterns are printable
/// ASCII; the operator finals are declared before the catch-all character
/// final so they win the one-character ties.
pub(crate) static LEXICON: Lazy<Lexer<Box<dyn Token>>> = Lazy::new(|| {
    let mut l: Lexer<Box<dyn Token>> = Lexer::default();

    single_char(&mut l, '[', || Box::new(LeftBracket));
    single_char(&mut l, ']', || Box::new(RightBracket));
    single_char(&mut l, '-', || Box::new(Minus));
    single_char(&mut l, '^', || Box::new(Caret));
    single_char(&mut l, '(', || Box::new(LeftParen));
    single_char(&mut l, ')', || Box::new(RightParen));
    single_char(&mut l, '|', || Box::new(Vertical));
    single_char(&mut l, '.', || Box::new(Dot));

    let quantifier = l.state();
    l.rune(0, quantifier, '*');
    l.rune(0, quantifier, '?');
    l.rune(0, quantifier, '+');
    l.accept(
        quantifier,
        Box::new(|_, text| Ok(Box::new(Quantifier(head(text))))),
    );

    let escape_mid = l.state();
    let escape_end = l.state();
    l.rune(0, escape_mid, '\\');
    l.range(escape_mid, escape_end, ' ', '~');
    l.accept(
        escape_end,
        Box::new(|_, text| Ok(Box::new(Escaped(head(&text[1..]))))),
    );

    let any = l.state();
    l.range(0, any, ' ', '~');
    l.accept(any, Box::new(|_, text| Ok(Box::new(Character(head(text))))));

    l
});

fn single_char(l: &mut Lexer<Box<dyn Token>>, r: char, tok: fn() -> Box<dyn Token>) {
    let s = l.state();
    l.rune(0, s, r);
    l.accept(s, Box::new(move |_, _| Ok(tok())));
}

fn head(text: &str) -> char {
    text.chars().next().expect("lexer matches are never empty")
}
