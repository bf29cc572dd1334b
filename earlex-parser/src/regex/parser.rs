use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::ast::{CharRange, Charset, Choice, Expr, Nest, Repeat, Run, Seq, Term};
use super::tokenizer::{
    Caret, Character, Dot, Escaped, LeftBracket, LeftParen, Minus, Quantifier, RightBracket,
    RightParen, Vertical,
};
use crate::grammar::{Grammar, Rules};
use crate::parser::error::RuleError;

/// Rule set for the regex surface syntax, the first client of the parser
/// core. The layering expr ⊃ run ⊃ term gives `|` the lowest precedence,
/// then concatenation, then the postfix quantifiers.
pub(crate) struct RegexRules {
    /// Named escape classes: `\n`, `\r`, `\t`, `\s`, `\c`, `\w`, `\d`.
    classes: HashMap<char, Charset>,
}

pub(crate) static RULES: Lazy<RegexRules> = Lazy::new(RegexRules::default);

impl Default for RegexRules {
    fn default() -> Self {
        let mut classes = HashMap::new();
        classes.insert('n', Charset::single('\n'));
        classes.insert('r', Charset::single('\r'));
        classes.insert('t', Charset::single('\t'));
        classes.insert(
            's',
            Charset {
                ranges: vec![
                    CharRange::single('\n'),
                    CharRange::single('\t'),
                    CharRange::single(' '),
                ],
            },
        );
        classes.insert(
            'c',
            Charset {
                ranges: vec![
                    CharRange {
                        start: 'a',
                        end: 'z',
                    },
                    CharRange {
                        start: 'A',
                        end: 'Z',
                    },
                    CharRange::single('_'),
                ],
            },
        );
        classes.insert(
            'w',
            Charset {
                ranges: vec![
                    CharRange {
                        start: 'a',
                        end: 'z',
                    },
                    CharRange {
                        start: 'A',
                        end: 'Z',
                    },
                    CharRange {
                        start: '0',
                        end: '9',
                    },
                    CharRange::single('_'),
                ],
            },
        );
        classes.insert(
            'd',
            Charset {
                ranges: vec![CharRange {
                    start: '0',
                    end: '9',
                }],
            },
        );
        Self { classes }
    }
}

impl RegexRules {
    /// Class named by an escape inside a character class; unknown escapes
    /// are the literal character.
    fn class(&self, c: char) -> Charset {
        self.classes
            .get(&c)
            .cloned()
            .unwrap_or_else(|| Charset::single(c))
    }
}

impl Grammar for RegexRules {
    type Target = Expr;
    type Output = Expr;

    fn define(rules: &mut Rules<Self>) {
        rules.rule("char", |_, (c,): (Character,)| {
            Term::Match(CharRange::single(c.0))
        });
        rules.rule(
            "charset",
            |_, (_, set, _): (LeftBracket, Charset, RightBracket)| set.eval(),
        );
        rules.rule("charset_bar", |_, (_,): (Vertical,)| Charset::single('|'));
        rules.rule("charset_char", |_, (c,): (Character,)| Charset::single(c.0));
        rules.rule(
            "charset_choice",
            |_, (mut left, right): (Charset, Charset)| {
                left.ranges.extend(right.ranges);
                left
            },
        );
        rules.rule("charset_dot", |_, (_,): (Dot,)| Charset::single('.'));
        rules.rule("charset_esc", |host: &Self, (c,): (Escaped,)| host.class(c.0));
        rules.rule("charset_quantity", |_, (q,): (Quantifier,)| {
            Charset::single(q.0)
        });
        rules.rule(
            "charset_range",
            |_, (left, _, right): (Character, Minus, Character)| Charset {
                ranges: vec![CharRange {
                    start: left.0,
                    end: right.0,
                }],
            },
        );
        rules.rule(
            "choice",
            |_, (left, _, right): (Run, Vertical, Run)| Choice {
                left: Box::new(Expr::Run(left)),
                right: Box::new(Expr::Run(right)),
            },
        );
        rules.rule("dot", |_, (_,): (Dot,)| {
            Term::Match(CharRange {
                start: '\0',
                end: char::MAX,
            })
        });
        rules.rule("escaped", |host: &Self, (c,): (Escaped,)| {
            match host.classes.get(&c.0) {
                Some(set) => set.clone().eval(),
                None => Term::Match(CharRange::single(c.0)),
            }
        });
        rules.rule(
            "group",
            |_, (_, expr, _): (LeftParen, Expr, RightParen)| Term::Nest(Nest(Box::new(expr))),
        );
        rules.rule(
            "inverse_charset",
            |_, (_, _, set, _): (LeftBracket, Caret, Charset, RightBracket)| {
                set.inverse().eval()
            },
        );
        rules.rule(
            "more_choice",
            |_, (left, _, right): (Choice, Vertical, Run)| Choice {
                left: Box::new(Expr::Choice(left)),
                right: Box::new(Expr::Run(right)),
            },
        );
        rules.rule("quantifier", |_, (term, q): (Term, Quantifier)| {
            quantified(term, q.0)
        });
        rules.rule("range", |_, (_,): (Minus,)| {
            Term::Match(CharRange::single('-'))
        });
        rules.rule("seq", |_, (left, right): (Run, Run)| {
            Run::Seq(Seq {
                left: Box::new(left),
                right: Box::new(right),
            })
        });
    }

    fn parse(&self, value: Expr) -> Result<Expr, RuleError> {
        Ok(value)
    }
}

/// `e?` and `e*` admit the empty run; `e+` is the bare loop.
fn quantified(term: Term, q: char) -> Run {
    match q {
        '?' => Run::Term(Term::Nest(Nest(Box::new(Expr::Choice(Choice {
            left: Box::new(Expr::Run(Run::Term(term))),
            right: Box::new(Expr::Run(Run::Empty)),
        }))))),
        '+' => Run::Repeat(Repeat(Box::new(term))),
        '*' => Run::Term(Term::Nest(Nest(Box::new(Expr::Choice(Choice {
            left: Box::new(Expr::Run(Run::Repeat(Repeat(Box::new(term))))),
            right: Box::new(Expr::Run(Run::Empty)),
        }))))),
        q => unreachable!("quantifier token {q:?}"),
    }
}
