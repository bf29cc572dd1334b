use std::any::Any;
use std::sync::Arc;

use super::chart::Item;
use super::error::ParseError;
use crate::symbol::{RuleGraph, RuleId, SymbolId};
use crate::token::{Token, Value};

/// A completed item viewed from its starting position, tagged with where its
/// match ended.
#[derive(Debug, Clone, Copy)]
struct Completed {
    rule: RuleId,
    end: usize,
}

/// One node of the chosen derivation: either a consumed input token or a
/// rule over child spans.
enum Span {
    Token(usize),
    Node { rule: RuleId, children: Vec<Span> },
}

/// Rebuilds one derivation from the completed chart and evaluates it.
///
/// The chart is inverted so each position lists the completed items that
/// started there, ordered by declaration index and then by nearest end.
/// That ordering is the whole ambiguity policy: the earliest-declared rule
/// wins, and among its matches the shortest one.
pub(crate) struct Builder {
    graph: Arc<RuleGraph>,
    state: Vec<Vec<Completed>>,
    toks: Vec<Option<Box<dyn Token>>>,
}

impl Builder {
    pub(crate) fn new(graph: Arc<RuleGraph>, chart: Vec<Vec<Item>>, toks: Vec<Box<dyn Token>>) -> Self {
        let mut state = vec![Vec::new(); chart.len()];
        for (end, set) in chart.iter().enumerate() {
            for item in set {
                if item.progress != graph.rules[item.rule].deps.len() {
                    continue;
                }
                state[item.origin].push(Completed {
                    rule: item.rule,
                    end,
                });
            }
        }
        for bucket in &mut state {
            bucket.sort_by(|a, b| {
                graph.rules[a.rule]
                    .index
                    .cmp(&graph.rules[b.rule].index)
                    .then(a.end.cmp(&b.end))
            });
        }
        Self {
            graph,
            state,
            toks: toks.into_iter().map(Some).collect(),
        }
    }

    /// Picks the canonical derivation and evaluates it against `host`.
    pub(crate) fn build(mut self, host: &dyn Any) -> Result<Value, ParseError> {
        let end = self.toks.len();
        let top = self.state[0]
            .iter()
            .copied()
            .find(|c| self.graph.rules[c.rule].implements == self.graph.start && c.end == end)
            .ok_or(ParseError::FailedMatch)?;
        let span = self.find_span(top, 0).ok_or(ParseError::FailedMatch)?;
        self.eval(host, span)
    }

    fn find_span(&self, found: Completed, at: usize) -> Option<Span> {
        let children = self.find_children(&self.graph.rules[found.rule].deps, at, found.end)?;
        Some(Span::Node {
            rule: found.rule,
            children,
        })
    }

    /// Finds a contiguous run of child spans covering `deps` between `at`
    /// and `end`, backtracking through the candidate lists.
    fn find_children(&self, deps: &[SymbolId], at: usize, end: usize) -> Option<Vec<Span>> {
        let Some((&dep, rest)) = deps.split_first() else {
            return (at == end).then(Vec::new);
        };
        if self.graph.symbols[dep].terminal.is_some() {
            self.token_span(dep, rest, at, end)
        } else {
            self.rule_span(dep, rest, at, end)
        }
    }

    fn rule_span(&self, dep: SymbolId, rest: &[SymbolId], at: usize, end: usize) -> Option<Vec<Span>> {
        for &found in &self.state[at] {
            if self.graph.rules[found.rule].implements != dep {
                continue;
            }
            let Some(next) = self.find_children(rest, found.end, end) else {
                continue;
            };
            let Some(inner) = self.find_span(found, at) else {
                continue;
            };
            let mut spans = vec![inner];
            spans.extend(next);
            return Some(spans);
        }
        None
    }

    fn token_span(&self, dep: SymbolId, rest: &[SymbolId], at: usize, end: usize) -> Option<Vec<Span>> {
        let tok = self.toks.get(at)?.as_ref()?;
        if Some(tok.tag()) != self.graph.symbols[dep].terminal {
            return None;
        }
        let next = self.find_children(rest, at + 1, end)?;
        let mut spans = vec![Span::Token(at)];
        spans.extend(next);
        Some(spans)
    }

    /// Evaluates a span bottom-up: token spans yield their captured token,
    /// rule spans evaluate their children and invoke the action.
    fn eval(&mut self, host: &dyn Any, span: Span) -> Result<Value, ParseError> {
        match span {
            Span::Token(at) => Ok(self.toks[at]
                .take()
                .expect("token consumed by two spans")
                .into_any()),
            Span::Node { rule, children } => {
                let mut args = Vec::with_capacity(children.len());
                for child in children {
                    args.push(self.eval(host, child)?);
                }
                let action = Arc::clone(&self.graph.rules[rule].action);
                action(host, args).map_err(ParseError::Rule)
            }
        }
    }
}
