use std::any::Any;

use crate::grammar::{Grammar, Syntax};
use crate::scan;
use crate::token::Token;

use self::error::ParseError;

mod builder;
mod chart;
pub mod error;

/// Parses `tokens` with the rule set `G`, returning the grammar's
/// post-processed result.
///
/// The grammar's symbol graph is built on the first parse of each grammar
/// type and shared by all later parses, from any thread. The parse itself is
/// synchronous and allocates only for the duration of the call.
pub fn parse<G: Grammar>(
    grammar: &G,
    tokens: Vec<Box<dyn Token>>,
) -> Result<G::Output, ParseError> {
    let graph = scan::graph_for::<G>();
    let mut matcher = chart::Matcher::new(graph, tokens);
    matcher.run()?;
    let value = matcher.into_builder().build(grammar as &dyn Any)?;
    grammar
        .parse(G::Target::from_value(value))
        .map_err(ParseError::Rule)
}
