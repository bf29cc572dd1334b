use earlex_lexer::Lexer;
use earlex_parser::{parse, regex, Grammar, RuleError, Rules, Scanner, Syntax, SymbolId, Token};

#[derive(Debug)]
struct Val(i64);
#[derive(Debug)]
struct Plus;
#[derive(Debug)]
struct Times;
#[derive(Debug, Default)]
struct Blank;

impl Syntax for Val {}
impl Syntax for Plus {}
impl Syntax for Times {}

#[derive(Debug)]
struct Term(i64);
#[derive(Debug)]
struct Sum(i64);

impl Syntax for Term {}
impl Syntax for Sum {}

#[derive(Debug)]
enum Expr {
    Sum(Sum),
    Term(Term),
}

impl Syntax for Expr {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.variant(Expr::Sum);
        scanner.variant(Expr::Term);
    }
}

impl Expr {
    fn value(&self) -> i64 {
        match self {
            Expr::Sum(s) => s.0,
            Expr::Term(t) => t.0,
        }
    }
}

/// expr := expr '+' term | term; term := term '*' val | val
struct Arith;

impl Grammar for Arith {
    type Target = Expr;
    type Output = i64;

    fn define(rules: &mut Rules<Self>) {
        rules.rule("sum", |_, (left, _, right): (Expr, Plus, Term)| {
            Sum(left.value() + right.0)
        });
        rules.rule("product", |_, (left, _, right): (Term, Times, Val)| {
            Term(left.0 * right.0)
        });
        rules.rule("value", |_, (v,): (Val,)| Term(v.0));
    }

    fn parse(&self, value: Expr) -> Result<i64, RuleError> {
        Ok(value.value())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let lexicon = Lexer::new([
        regex(
            r"\d+",
            Box::new(|_, text| Ok(Box::new(Val(text.parse()?)) as Box<dyn Token>)),
        ),
        regex(r"\+", Box::new(|_, _| Ok(Box::new(Plus) as Box<dyn Token>))),
        regex(r"\*", Box::new(|_, _| Ok(Box::new(Times) as Box<dyn Token>))),
        regex(r"\s+", Box::new(|_, _| Ok(Box::new(Blank) as Box<dyn Token>))),
    ])?;

    for input in ["3 + 4 * 3 + 1", "3 + 4 +"] {
        let tokens = lexicon
            .tokenize(input)
            .force()?
            .into_iter()
            .filter(|tok| !tok.as_any().is::<Blank>())
            .collect();

        match parse(&Arith, tokens) {
            Ok(value) => println!("{input} = {value}"),
            Err(err) => println!("{input}: {err}"),
        }
    }

    Ok(())
}
