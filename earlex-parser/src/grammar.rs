use std::marker::PhantomData;
use std::sync::Arc;

use crate::parser::error::RuleError;
use crate::scan::Scanner;
use crate::symbol::SymbolId;
use crate::token::Value;

/// A rule set describing how token sequences become values.
///
/// Implementations register one production per grammar rule in
/// [`Grammar::define`] and post-process the finished start value in
/// [`Grammar::parse`]. The rule set is reflected into an internal symbol
/// graph once per type and cached process-wide, so `define` must be
/// deterministic and must not itself invoke [`parse`](crate::parse).
pub trait Grammar: Sized + 'static {
    /// Type produced by the start symbol.
    type Target: Syntax;

    /// Final result of a parse.
    type Output;

    /// Registers the productions of this rule set.
    fn define(rules: &mut Rules<Self>);

    /// Post-processing hook invoked on the completed start value. This is
    /// the one place for whole-tree validation or conversion.
    fn parse(&self, value: Self::Target) -> Result<Self::Output, RuleError>;
}

/// How a host type participates in a grammar.
///
/// Most types want the empty implementation: they become a plain symbol,
/// which ends up terminal exactly when no production produces it. Types that
/// bring productions of their own override [`Syntax::declare`]:
///
/// - `Vec<T>` registers the left-recursive accumulation rules, so sequences
///   collect elements in input order;
/// - sum types register [`Scanner::variant`] edges for the concrete types
///   they cover;
/// - reusable sub-grammars such as [`Delimited`](crate::Delimited) register
///   [`Scanner::helper_rule`] productions, once per distinct
///   parameterisation.
pub trait Syntax: Sized + 'static {
    /// Whether this symbol is a synthesized sequence. Rules may consume
    /// sequences but not produce them.
    const SEQUENCE: bool = false;

    /// Registers productions contributed by the type itself. Runs once, on
    /// the first reference to the type within a grammar.
    fn declare(scanner: &mut Scanner, symbol: SymbolId) {
        let _ = (scanner, symbol);
    }

    /// Wraps a finished value for the parse tree.
    fn into_value(self) -> Value {
        Box::new(self)
    }

    /// Recovers the typed value from a parse tree value.
    fn from_value(value: Value) -> Self {
        *value
            .downcast::<Self>()
            .unwrap_or_else(|_| panic!("parse value is not a {}", std::any::type_name::<Self>()))
    }
}

impl<T: Syntax> Syntax for Vec<T> {
    const SEQUENCE: bool = true;

    fn declare(scanner: &mut Scanner, symbol: SymbolId) {
        scanner.sequence_rules::<T>(symbol);
    }
}

/// Typed production-registration surface handed to [`Grammar::define`].
pub struct Rules<G> {
    scanner: Scanner,
    grammar: PhantomData<fn(G)>,
}

impl<G: Grammar> Rules<G> {
    pub(crate) fn new() -> Self {
        Self {
            scanner: Scanner::new(),
            grammar: PhantomData,
        }
    }

    pub(crate) fn scanner(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    pub(crate) fn into_scanner(self) -> Scanner {
        self.scanner
    }

    /// Registers the production `A -> R`: the operand tuple lists the
    /// dependency symbols in match order, the return type is the produced
    /// symbol. Registration order is significant: when an input has several
    /// derivations, the earliest-declared rule wins.
    ///
    /// # Panics
    ///
    /// When `R` is a sequence type; sequences may only appear as operands.
    pub fn rule<A, R>(&mut self, name: &'static str, action: impl Fn(&G, A) -> R + Send + Sync + 'static)
    where
        A: Operands,
        R: Syntax,
    {
        self.try_rule(name, move |host, args| Ok(action(host, args)));
    }

    /// Fallible form of [`Rules::rule`]; an error fails the whole parse.
    pub fn try_rule<A, R>(
        &mut self,
        name: &'static str,
        action: impl Fn(&G, A) -> Result<R, RuleError> + Send + Sync + 'static,
    ) where
        A: Operands,
        R: Syntax,
    {
        assert!(
            !R::SEQUENCE,
            "rule {name} produces a sequence; sequences may only be consumed"
        );
        let deps = A::declare(&mut self.scanner);
        let implements = self.scanner.symbol::<R>();
        self.scanner.host_rule(
            implements,
            deps,
            name,
            Arc::new(move |host, values| {
                let host = host
                    .downcast_ref::<G>()
                    .expect("rule invoked with a foreign grammar host");
                action(host, A::extract(values)).map(Syntax::into_value)
            }),
        );
    }
}

/// Tuple of rule operands. Implemented for tuples of [`Syntax`] types up to
/// arity eight.
pub trait Operands: Sized + 'static {
    /// Ensures one symbol per operand, in order.
    fn declare(scanner: &mut Scanner) -> Vec<SymbolId>;

    /// Rebuilds the typed operands from the evaluated child values.
    fn extract(values: Vec<Value>) -> Self;
}

macro_rules! operand_tuples {
    ($(($($ty:ident),*)),* $(,)?) => {$(
        impl<$($ty: Syntax),*> Operands for ($($ty,)*) {
            fn declare(scanner: &mut Scanner) -> Vec<SymbolId> {
                let _ = &scanner;
                vec![$(scanner.symbol::<$ty>()),*]
            }

            fn extract(values: Vec<Value>) -> Self {
                let mut values = values.into_iter();
                let _ = &mut values;
                ($($ty::from_value(values.next().expect("operand count mismatch")),)*)
            }
        }
    )*};
}

operand_tuples![
    (),
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
    (A, B, C, D, E, F, G),
    (A, B, C, D, E, F, G, H),
];
