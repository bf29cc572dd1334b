use std::any::{Any, TypeId};
use std::sync::Arc;

use crate::parser::error::RuleError;
use crate::token::Value;

/// Index of a symbol in its grammar's arena. Stable for the lifetime of the
/// grammar; rules refer to symbols exclusively through it, which keeps the
/// inherently cyclic symbol graph free of reference cycles.
pub type SymbolId = usize;

/// Index of a rule in its grammar's arena.
pub(crate) type RuleId = usize;

/// Erased rule action: receives the grammar host and the evaluated child
/// values, in dependency order.
pub(crate) type Action = Arc<dyn Fn(&dyn Any, Vec<Value>) -> Result<Value, RuleError> + Send + Sync>;

/// Declaration index given to synthesized sequence rules, sorting them ahead
/// of every declared rule.
pub(crate) const AUTO_RULE_INDEX: i32 = -1;

/// A terminal or nonterminal of the grammar.
pub(crate) struct Symbol {
    /// Whether the symbol derives the empty sequence.
    pub(crate) nullable: bool,
    /// Set iff the symbol has no productions and therefore stands for an
    /// input token of this dynamic type.
    pub(crate) terminal: Option<TypeId>,
    /// Rules producing this symbol.
    pub(crate) productions: Vec<RuleId>,
    /// Host type name, for diagnostics.
    pub(crate) name: &'static str,
}

/// One production.
pub(crate) struct Rule {
    /// Symbol this rule produces.
    pub(crate) implements: SymbolId,
    /// Symbols to match, in order.
    pub(crate) deps: Vec<SymbolId>,
    /// Callback evaluating the rule over its matched children.
    pub(crate) action: Action,
    /// Declaration order; the derivation builder breaks ambiguity toward the
    /// smallest index.
    pub(crate) index: i32,
    /// Rule name, for diagnostics.
    pub(crate) name: &'static str,
}

/// Immutable symbol and rule arenas for one grammar type, built once and
/// shared by every parse of that grammar.
pub(crate) struct RuleGraph {
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) start: SymbolId,
}
