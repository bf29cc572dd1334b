use std::any::{Any, TypeId};
use std::fmt;

/// Dynamically typed value flowing through a parse: a captured input token or
/// the result of a rule action.
pub type Value = Box<dyn Any>;

/// An input token.
///
/// Implemented for every `Debug + Send + Sync` type; the token's dynamic type
/// is the terminal symbol it matches, so one Rust type per kind of token is
/// the expected shape.
pub trait Token: fmt::Debug + Send + Sync {
    /// Type tag matched against terminal symbols.
    fn tag(&self) -> TypeId;

    /// Borrows the token for inspection, e.g. in error handlers.
    fn as_any(&self) -> &dyn Any;

    /// Moves the token into the parse tree.
    fn into_any(self: Box<Self>) -> Value;
}

impl<T: fmt::Debug + Send + Sync + 'static> Token for T {
    fn tag(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Value {
        self
    }
}

/// Builds a `Vec<Box<dyn Token>>` from a list of token values.
#[macro_export]
macro_rules! tokens {
    ($($tok:expr),* $(,)?) => {
        vec![$(Box::new($tok) as Box<dyn $crate::Token>),*]
    };
}
