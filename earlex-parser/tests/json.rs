//! End-to-end exercise: a regex lexicon feeding a grammar for a JSON subset,
//! with a user-defined delimited-list helper grammar.

use std::collections::HashMap;
use std::marker::PhantomData;

use earlex_lexer::Lexer;
use earlex_parser::{
    parse, regex, Grammar, RuleError, Rules, Scanner, Syntax, SymbolId, Token,
};

// A reusable possibly-empty delimited list: `ε | T (D T)*`. The non-empty
// case collects the head and a sequence of delimiter-prefixed tails.

struct Listed<T, D> {
    items: Vec<T>,
    sep: PhantomData<fn(D)>,
}

struct ListedTail<T, D> {
    value: T,
    sep: PhantomData<fn(D)>,
}

impl<T: Syntax, D: Syntax> Syntax for Listed<T, D> {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.helper_rule("listed(none)", |(): ()| Listed::<T, D> {
            items: Vec::new(),
            sep: PhantomData,
        });
        scanner.helper_rule(
            "listed(some)",
            |(head, tail): (T, Vec<ListedTail<T, D>>)| {
                let mut items = vec![head];
                items.extend(tail.into_iter().map(|t| t.value));
                Listed::<T, D> {
                    items,
                    sep: PhantomData,
                }
            },
        );
    }
}

impl<T: Syntax, D: Syntax> Syntax for ListedTail<T, D> {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.helper_rule("listed(tail)", |(_, value): (D, T)| ListedTail::<T, D> {
            value,
            sep: PhantomData,
        });
    }
}

// Tokens.

#[derive(Debug, Default)]
struct ObjectStart;
#[derive(Debug, Default)]
struct ObjectEnd;
#[derive(Debug, Default)]
struct ArrayStart;
#[derive(Debug, Default)]
struct ArrayEnd;
#[derive(Debug, Default)]
struct Comma;
#[derive(Debug, Default)]
struct Colon;
#[derive(Debug, Default)]
struct Blank;
#[derive(Debug)]
struct NumberTok(f64);
#[derive(Debug)]
struct StringTok(String);

impl Syntax for ObjectStart {}
impl Syntax for ObjectEnd {}
impl Syntax for ArrayStart {}
impl Syntax for ArrayEnd {}
impl Syntax for Comma {}
impl Syntax for Colon {}
impl Syntax for NumberTok {}
impl Syntax for StringTok {}

fn unit<T: Default + std::fmt::Debug + Send + Sync + 'static>(
) -> earlex_lexer::TokenConstructor<Box<dyn Token>> {
    Box::new(|_, _| Ok(Box::new(T::default())))
}

fn lexicon() -> Lexer<Box<dyn Token>> {
    Lexer::new([
        regex(r"{", unit::<ObjectStart>()),
        regex(r"}", unit::<ObjectEnd>()),
        regex(r"\[", unit::<ArrayStart>()),
        regex(r"\]", unit::<ArrayEnd>()),
        regex(r",", unit::<Comma>()),
        regex(r":", unit::<Colon>()),
        regex(r"\s+", unit::<Blank>()),
        regex(
            r"\d+(\.\d+)?",
            Box::new(|_, text| Ok(Box::new(NumberTok(text.parse()?)) as Box<dyn Token>)),
        ),
        regex(
            r#""([^"]|\\.)*""#,
            Box::new(|_, text| Ok(Box::new(StringTok(unquote(text))) as Box<dyn Token>)),
        ),
    ])
    .unwrap()
}

fn unquote(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text[1..text.len() - 1].chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(esc) = chars.next() {
                out.push(esc);
            }
            continue;
        }
        out.push(c);
    }
    out
}

// Document model.

#[derive(Debug, Clone, PartialEq)]
enum Json {
    Number(f64),
    String(String),
    Array(Vec<Json>),
    Object(HashMap<String, Json>),
}

#[derive(Debug)]
struct JsonNumber(f64);
#[derive(Debug)]
struct JsonString(String);
#[derive(Debug)]
struct Field {
    name: String,
    value: Json,
}

impl Syntax for JsonNumber {}
impl Syntax for JsonString {}
impl Syntax for Field {}

impl Syntax for Json {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.variant(|n: JsonNumber| Json::Number(n.0));
        scanner.variant(|s: JsonString| Json::String(s.0));
    }
}

struct JsonGrammar;

impl Grammar for JsonGrammar {
    type Target = Json;
    type Output = Json;

    fn define(rules: &mut Rules<Self>) {
        rules.rule("number", |_, (tok,): (NumberTok,)| JsonNumber(tok.0));
        rules.rule("string", |_, (tok,): (StringTok,)| JsonString(tok.0));
        rules.rule(
            "array",
            |_, (_, items, _): (ArrayStart, Listed<Json, Comma>, ArrayEnd)| {
                Json::Array(items.items)
            },
        );
        rules.rule(
            "object",
            |_, (_, fields, _): (ObjectStart, Listed<Field, Comma>, ObjectEnd)| {
                Json::Object(
                    fields
                        .items
                        .into_iter()
                        .map(|f| (f.name, f.value))
                        .collect(),
                )
            },
        );
        rules.rule(
            "field",
            |_, (name, _, value): (StringTok, Colon, Json)| Field {
                name: name.0,
                value,
            },
        );
    }

    fn parse(&self, value: Json) -> Result<Json, RuleError> {
        Ok(value)
    }
}

fn decode(text: &str) -> Json {
    let tokens = lexicon()
        .tokenize(text)
        .force()
        .unwrap()
        .into_iter()
        .filter(|tok| !tok.as_any().is::<Blank>())
        .collect();
    parse(&JsonGrammar, tokens).unwrap()
}

fn obj(fields: impl IntoIterator<Item = (&'static str, Json)>) -> Json {
    Json::Object(
        fields
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
    )
}

#[test]
fn decodes_a_nested_document() {
    let document = decode(
        r#"{"id": 1234, "items": [{"id": 775, "name": "item1", "qty": 5}]}"#,
    );

    assert_eq!(
        document,
        obj([
            ("id", Json::Number(1234.0)),
            (
                "items",
                Json::Array(vec![obj([
                    ("id", Json::Number(775.0)),
                    ("name", Json::String("item1".into())),
                    ("qty", Json::Number(5.0)),
                ])])
            ),
        ])
    );
}

#[test]
fn decodes_empty_containers() {
    assert_eq!(decode("[]"), Json::Array(Vec::new()));
    assert_eq!(decode("{}"), obj([]));
    assert_eq!(
        decode(r#"[[], {}, 1]"#),
        Json::Array(vec![Json::Array(Vec::new()), obj([]), Json::Number(1.0)])
    );
}

#[test]
fn decodes_escapes_and_floats() {
    let document = decode(r#"{"quote": "a \" b", "pi": 3.25}"#);
    assert_eq!(
        document,
        obj([
            ("quote", Json::String("a \" b".into())),
            ("pi", Json::Number(3.25)),
        ])
    );
}

#[test]
fn rejects_a_malformed_document() {
    let tokens = lexicon()
        .tokenize(r#"{"id": , 1}"#)
        .force()
        .unwrap()
        .into_iter()
        .filter(|tok| !tok.as_any().is::<Blank>())
        .collect();
    assert!(parse(&JsonGrammar, tokens).is_err());
}
