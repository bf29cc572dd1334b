use std::sync::Arc;

use super::builder::Builder;
use super::error::ParseError;
use crate::symbol::{RuleGraph, RuleId, SymbolId};
use crate::token::Token;

/// A partially matched production: the rule, the input position its match
/// began at, and how many dependencies have been matched so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Item {
    pub(crate) rule: RuleId,
    pub(crate) origin: usize,
    pub(crate) progress: usize,
}

impl Item {
    fn advanced(self) -> Self {
        Self {
            progress: self.progress + 1,
            ..self
        }
    }
}

/// Earley chart recognizer: one item set per input position, each processed
/// as a dynamic worklist running prediction, scanning and completion.
pub(crate) struct Matcher {
    graph: Arc<RuleGraph>,
    chart: Vec<Vec<Item>>,
    toks: Vec<Box<dyn Token>>,
    cur: usize,
}

impl Matcher {
    pub(crate) fn new(graph: Arc<RuleGraph>, toks: Vec<Box<dyn Token>>) -> Self {
        Self {
            graph,
            chart: vec![Vec::new()],
            toks,
            cur: 0,
        }
    }

    /// Recognizes the token sequence, leaving the completed chart behind for
    /// the derivation builder.
    pub(crate) fn run(&mut self) -> Result<(), ParseError> {
        let start = self.graph.start;
        self.predict(start);
        for at in 0..self.toks.len() {
            self.chart.push(Vec::new());
            self.step(at);
            self.cur += 1;
        }
        self.final_step();
        self.matches()
    }

    fn step(&mut self, at: usize) {
        let graph = Arc::clone(&self.graph);
        let tag = self.toks[at].tag();
        let mut i = 0;
        while i < self.chart[self.cur].len() {
            let item = self.chart[self.cur][i];
            i += 1;
            let Some(next) = self.next_dep(item) else {
                self.complete(item);
                continue;
            };
            let symbol = &graph.symbols[next];
            if let Some(terminal) = symbol.terminal {
                if terminal == tag {
                    self.add_to(self.cur + 1, item.advanced());
                }
                continue;
            }
            if symbol.nullable {
                self.add_to(self.cur, item.advanced());
            }
            self.predict(next);
        }
    }

    /// Completion-only pass over the last set: flushes completions that hang
    /// off trailing nullable matches. Nothing is scanned.
    fn final_step(&mut self) {
        let graph = Arc::clone(&self.graph);
        let mut i = 0;
        while i < self.chart[self.cur].len() {
            let item = self.chart[self.cur][i];
            i += 1;
            let Some(next) = self.next_dep(item) else {
                self.complete(item);
                continue;
            };
            if graph.symbols[next].nullable {
                self.add_to(self.cur, item.advanced());
                self.predict(next);
            }
        }
    }

    /// Checks acceptance and shapes the failure: the first empty item set
    /// pins the offending token; a nonempty final set without an accepting
    /// item means the input stopped too early.
    fn matches(&mut self) -> Result<(), ParseError> {
        let last = self.chart.len() - 1;
        if self.chart[last].is_empty() {
            for at in 1..self.chart.len() {
                if !self.chart[at].is_empty() {
                    continue;
                }
                tracing::debug!(token = at - 1, "recognizer rejected input");
                return Err(ParseError::UnexpectedToken(self.toks.swap_remove(at - 1)));
            }
        }
        for item in &self.chart[last] {
            let rule = &self.graph.rules[item.rule];
            if rule.implements != self.graph.start {
                continue;
            }
            if item.origin != 0 || item.progress != rule.deps.len() {
                continue;
            }
            return Ok(());
        }
        Err(ParseError::UnexpectedEnd)
    }

    fn predict(&mut self, symbol: SymbolId) {
        let graph = Arc::clone(&self.graph);
        for &rule in &graph.symbols[symbol].productions {
            self.add_to(
                self.cur,
                Item {
                    rule,
                    origin: self.cur,
                    progress: 0,
                },
            );
        }
    }

    /// Advances every item in the completed item's origin set that was
    /// waiting on the symbol it produces. Items appended to the origin set
    /// afterwards are picked up by the outer worklist.
    fn complete(&mut self, item: Item) {
        let implements = self.graph.rules[item.rule].implements;
        let waiting = self.chart[item.origin].len();
        for i in 0..waiting {
            let candidate = self.chart[item.origin][i];
            let Some(next) = self.next_dep(candidate) else {
                continue;
            };
            if next == implements {
                self.add_to(self.cur, candidate.advanced());
            }
        }
    }

    fn next_dep(&self, item: Item) -> Option<SymbolId> {
        self.graph.rules[item.rule].deps.get(item.progress).copied()
    }

    /// Set-semantics insert: the chart never holds the same item twice.
    fn add_to(&mut self, pos: usize, item: Item) {
        let set = &mut self.chart[pos];
        if !set.contains(&item) {
            set.push(item);
        }
    }

    pub(crate) fn into_builder(self) -> Builder {
        Builder::new(self.graph, self.chart, self.toks)
    }
}
