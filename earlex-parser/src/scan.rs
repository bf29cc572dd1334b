use std::any::TypeId;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use once_cell::sync::Lazy;

use crate::grammar::{Grammar, Operands, Rules, Syntax};
use crate::symbol::{Action, Rule, RuleGraph, RuleId, Symbol, SymbolId, AUTO_RULE_INDEX};

/// Bound on nested `declare` calls. Parametric helpers that keep minting new
/// parameterisations of themselves can never terminate; this turns that bug
/// into a diagnosable panic.
const MAX_DECLARE_DEPTH: usize = 128;

static GRAPHS: Lazy<Mutex<HashMap<TypeId, Arc<RuleGraph>>>> = Lazy::new(Default::default);

/// Returns the shared symbol graph for `G`, scanning the rule set on first
/// touch. The cache lock is held across the scan, so every grammar type is
/// scanned exactly once per process; the published graph is immutable and
/// read without further synchronisation.
pub(crate) fn graph_for<G: Grammar>() -> Arc<RuleGraph> {
    let mut cache = GRAPHS.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(graph) = cache.get(&TypeId::of::<G>()) {
        return Arc::clone(graph);
    }
    let graph = Arc::new(scan::<G>());
    cache.insert(TypeId::of::<G>(), Arc::clone(&graph));
    graph
}

fn scan<G: Grammar>() -> RuleGraph {
    let mut rules = Rules::<G>::new();
    let start = rules.scanner().symbol::<G::Target>();
    G::define(&mut rules);

    let mut scanner = rules.into_scanner();
    scanner.expand_variants();
    scanner.mark_nullable();
    scanner.mark_terminals();

    assert!(
        !scanner.symbols[start].productions.is_empty(),
        "start symbol {} has no productions",
        scanner.symbols[start].name
    );

    tracing::debug!(
        grammar = std::any::type_name::<G>(),
        symbols = scanner.symbols.len(),
        rules = scanner.rules.len(),
        "scanned grammar"
    );

    RuleGraph {
        symbols: scanner.symbols,
        rules: scanner.rules,
        start,
    }
}

/// Collects symbols and productions while a rule set is being declared.
///
/// Grammar authors meet the scanner inside [`Syntax::declare`], where a type
/// can contribute variant edges and helper productions of its own.
pub struct Scanner {
    symbols: Vec<Symbol>,
    rules: Vec<Rule>,
    by_type: HashMap<TypeId, SymbolId>,
    variants: Vec<VariantEdge>,
    next_index: i32,
    depth: usize,
}

/// Values of `covers` also stand for the sum type `variant`.
struct VariantEdge {
    variant: SymbolId,
    covers: SymbolId,
    up: Arc<dyn Fn(crate::token::Value) -> crate::token::Value + Send + Sync>,
}

impl Scanner {
    pub(crate) fn new() -> Self {
        Self {
            symbols: Vec::new(),
            rules: Vec::new(),
            by_type: HashMap::new(),
            variants: Vec::new(),
            next_index: 0,
            depth: 0,
        }
    }

    /// Returns the symbol for `T`, creating it and running `T`'s
    /// declarations on first reference. Symbols deduplicate on the type, so
    /// every mention of e.g. the same helper parameterisation resolves to
    /// one symbol.
    pub fn symbol<T: Syntax>(&mut self) -> SymbolId {
        if let Some(&id) = self.by_type.get(&TypeId::of::<T>()) {
            return id;
        }
        assert!(
            self.depth < MAX_DECLARE_DEPTH,
            "grammar declarations nest too deeply; is a helper grammar circular?"
        );
        let id = self.symbols.len();
        self.symbols.push(Symbol {
            nullable: false,
            terminal: None,
            productions: Vec::new(),
            name: std::any::type_name::<T>(),
        });
        self.by_type.insert(TypeId::of::<T>(), id);
        self.depth += 1;
        T::declare(self, id);
        self.depth -= 1;
        id
    }

    /// Records that values of the concrete type `C` also stand for the sum
    /// type `V`. After declaration finishes, every production of `C` is
    /// copied onto `V` with `up` folded into its action.
    pub fn variant<C: Syntax, V: Syntax>(&mut self, up: impl Fn(C) -> V + Send + Sync + 'static) {
        let covers = self.symbol::<C>();
        let variant = self.symbol::<V>();
        self.variants.push(VariantEdge {
            variant,
            covers,
            up: Arc::new(move |value| up(C::from_value(value)).into_value()),
        });
    }

    /// Registers a production whose action needs no grammar host, the shape
    /// taken by reusable helper grammars.
    pub fn helper_rule<A, R>(&mut self, name: &'static str, action: impl Fn(A) -> R + Send + Sync + 'static)
    where
        A: Operands,
        R: Syntax,
    {
        let deps = A::declare(self);
        let implements = self.symbol::<R>();
        let index = self.take_index();
        self.push_rule(
            implements,
            deps,
            name,
            index,
            Arc::new(move |_, values| Ok(action(A::extract(values)).into_value())),
        );
    }

    pub(crate) fn host_rule(
        &mut self,
        implements: SymbolId,
        deps: Vec<SymbolId>,
        name: &'static str,
        action: Action,
    ) {
        let index = self.take_index();
        self.push_rule(implements, deps, name, index, action);
    }

    /// Synthesizes the two productions backing a sequence symbol: the empty
    /// sequence, and appending one element to a shorter sequence. Matching
    /// left-recursively makes insertion order equal input order.
    pub(crate) fn sequence_rules<T: Syntax>(&mut self, seq: SymbolId) {
        let elem = self.symbol::<T>();
        let name = std::any::type_name::<Vec<T>>();
        self.push_rule(
            seq,
            Vec::new(),
            name,
            AUTO_RULE_INDEX,
            Arc::new(|_, _| Ok(Vec::<T>::new().into_value())),
        );
        self.push_rule(
            seq,
            vec![seq, elem],
            name,
            AUTO_RULE_INDEX,
            Arc::new(|_, values| {
                let mut values = values.into_iter();
                let mut items =
                    Vec::<T>::from_value(values.next().expect("sequence rule takes two operands"));
                items.push(T::from_value(
                    values.next().expect("sequence rule takes two operands"),
                ));
                Ok(items.into_value())
            }),
        );
    }

    fn push_rule(
        &mut self,
        implements: SymbolId,
        deps: Vec<SymbolId>,
        name: &'static str,
        index: i32,
        action: Action,
    ) {
        let id: RuleId = self.rules.len();
        self.rules.push(Rule {
            implements,
            deps,
            action,
            index,
            name,
        });
        self.symbols[implements].productions.push(id);
    }

    fn take_index(&mut self) -> i32 {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    /// Copies the productions of every covered symbol onto its sum types,
    /// transitively. Each sum type is expanded at most once, so mutually
    /// covering types terminate.
    fn expand_variants(&mut self) {
        let mut expanded = vec![false; self.symbols.len()];
        for i in 0..self.variants.len() {
            let variant = self.variants[i].variant;
            self.expand_variant(&mut expanded, variant);
        }
    }

    fn expand_variant(&mut self, expanded: &mut [bool], variant: SymbolId) {
        if expanded[variant] {
            return;
        }
        expanded[variant] = true;

        let edges: Vec<usize> = (0..self.variants.len())
            .filter(|&i| self.variants[i].variant == variant)
            .collect();

        for i in edges {
            let covered = self.variants[i].covers;
            if covered == variant {
                continue;
            }
            if self.variants.iter().any(|e| e.variant == covered) {
                self.expand_variant(expanded, covered);
            }
            let up = Arc::clone(&self.variants[i].up);
            for rule in self.symbols[covered].productions.clone() {
                let deps = self.rules[rule].deps.clone();
                let name = self.rules[rule].name;
                let index = self.rules[rule].index;
                let inner = Arc::clone(&self.rules[rule].action);
                let up = Arc::clone(&up);
                self.push_rule(
                    variant,
                    deps,
                    name,
                    index,
                    Arc::new(move |host, values| inner(host, values).map(|value| up(value))),
                );
            }
        }
    }

    /// Least-fixpoint nullability: a symbol is nullable iff some production
    /// of it has only nullable dependencies, bootstrapped by the empty-deps
    /// rules. Runs after variant expansion so a sum type covering a nullable
    /// symbol is itself nullable.
    fn mark_nullable(&mut self) {
        let mut users: Vec<Vec<RuleId>> = vec![Vec::new(); self.symbols.len()];
        let mut queue = VecDeque::new();

        for (id, rule) in self.rules.iter().enumerate() {
            for &dep in &rule.deps {
                users[dep].push(id);
            }
            if rule.deps.is_empty() && !self.symbols[rule.implements].nullable {
                self.symbols[rule.implements].nullable = true;
                queue.push_back(rule.implements);
            }
        }

        while let Some(sym) = queue.pop_front() {
            for i in 0..users[sym].len() {
                let rule = users[sym][i];
                let implements = self.rules[rule].implements;
                if self.symbols[implements].nullable {
                    continue;
                }
                if self.rules[rule]
                    .deps
                    .iter()
                    .any(|&dep| !self.symbols[dep].nullable)
                {
                    continue;
                }
                self.symbols[implements].nullable = true;
                queue.push_back(implements);
            }
        }
    }

    /// Tags every production-less symbol as a terminal of its host type.
    fn mark_terminals(&mut self) {
        for (&type_id, &id) in &self.by_type {
            if self.symbols[id].productions.is_empty() {
                self.symbols[id].terminal = Some(type_id);
            }
        }
    }
}
