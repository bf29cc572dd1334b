use std::marker::PhantomData;

use crate::grammar::Syntax;
use crate::scan::Scanner;
use crate::symbol::SymbolId;

/// One or more `T`s separated by `D`s, collected in input order. The
/// delimiter type only steers matching; its values are dropped.
///
/// Usable as a rule operand by any grammar; the backing productions are
/// registered once per `(T, D)` pair.
pub struct Delimited<T, D> {
    pub items: Vec<T>,
    sep: PhantomData<fn(D)>,
}

impl<T, D> Delimited<T, D> {
    fn one(item: T) -> Self {
        Self {
            items: vec![item],
            sep: PhantomData,
        }
    }
}

impl<T: Syntax, D: Syntax> Syntax for Delimited<T, D> {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.helper_rule("delimited(one)", |(item,): (T,)| Self::one(item));
        scanner.helper_rule(
            "delimited(many)",
            |(mut init, _, item): (Self, D, T)| {
                init.items.push(item);
                init
            },
        );
    }
}

/// Zero or one `T`.
pub struct Optional<T> {
    pub value: Option<T>,
}

impl<T: Syntax> Syntax for Optional<T> {
    fn declare(scanner: &mut Scanner, _symbol: SymbolId) {
        scanner.helper_rule("optional(none)", |(): ()| Self { value: None });
        scanner.helper_rule("optional(some)", |(value,): (T,)| Self { value: Some(value) });
    }
}
