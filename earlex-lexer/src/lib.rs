pub use lexer::{
    error::{LexError, SpecError},
    Automaton, Lexer, StateId, Stream, TokenConstructor, TokenSpec,
};

mod lexer;
