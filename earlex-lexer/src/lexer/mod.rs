use self::error::{LexError, SpecError};

pub mod error;

/// Id of a state in the machine. State `0` always exists and is the state the
/// machine starts in at the beginning of every token.
pub type StateId = usize;

/// Nondeterministic finite automaton driven over an input text to produce a
/// stream of tokens.
///
/// The machine is described by declaring states and the transitions between
/// them. Reading resolves ties by preferring the longest match; equally long
/// matches go to the final state that was declared first.
pub struct Lexer<T> {
    /// Transitions taken without consuming input, closed under transitivity.
    close_transitions: Vec<CloseTransition>,
    /// Transitions consuming one codepoint within an inclusive range.
    move_transitions: Vec<MoveTransition>,
    /// Accepting states paired with their token constructors, in declaration
    /// order. The declaration order is the tie-break between equally long
    /// matches.
    final_states: Vec<FinalState<T>>,
    /// Highest state id handed out so far.
    max_state: StateId,
}

struct CloseTransition {
    given: StateId,
    then: StateId,
}

struct MoveTransition {
    given: StateId,
    then: StateId,
    min: char,
    max: char,
}

struct FinalState<T> {
    given: StateId,
    then: TokenConstructor<T>,
}

/// Callback invoked when the machine stops in a final state. It receives the
/// byte offset of the match and the matched text, and produces the token.
pub type TokenConstructor<T> = Box<dyn Fn(usize, &str) -> Result<T, SpecError> + Send + Sync>;

/// A fragment of a lexer declaration: registers the states, transitions and
/// final state for one kind of token.
pub type TokenSpec<T> = Box<dyn FnOnce(&mut Lexer<T>) -> Result<(), SpecError>>;

/// Object-safe declaration surface of a [`Lexer`], used by clients that
/// compile some other description (such as a regular expression) down to
/// machine states.
pub trait Automaton {
    /// Creates a fresh state.
    fn state(&mut self) -> StateId;

    /// Declares that reading any codepoint in `min..=max` in `from` enters
    /// `to`.
    fn range(&mut self, from: StateId, to: StateId, min: char, max: char);

    /// Declares that entering `from` immediately also enters `to`.
    fn empty(&mut self, from: StateId, to: StateId);

    /// Declares that reading exactly `r` in `from` enters `to`.
    fn rune(&mut self, from: StateId, to: StateId, r: char) {
        self.range(from, to, r, r);
    }
}

impl<T> Default for Lexer<T> {
    fn default() -> Self {
        Self {
            close_transitions: Vec::new(),
            move_transitions: Vec::new(),
            final_states: Vec::new(),
            max_state: 0,
        }
    }
}

impl<T> Lexer<T> {
    /// Builds a machine by applying each token specification in turn to an
    /// empty machine.
    ///
    /// # Fails
    ///
    /// When a specification fails, e.g. because a regular expression does not
    /// parse.
    pub fn new(specs: impl IntoIterator<Item = TokenSpec<T>>) -> Result<Self, SpecError> {
        let mut lexer = Self::default();
        for spec in specs {
            spec(&mut lexer)?;
        }
        Ok(lexer)
    }

    /// Creates a fresh state.
    pub fn state(&mut self) -> StateId {
        self.max_state += 1;
        self.max_state
    }

    /// Declares that reading exactly `r` in `from` enters `to`.
    pub fn rune(&mut self, from: StateId, to: StateId, r: char) {
        self.range(from, to, r, r);
    }

    /// Declares that reading any codepoint in `min..=max` (inclusive) in
    /// `from` enters `to`.
    pub fn range(&mut self, from: StateId, to: StateId, min: char, max: char) {
        self.move_transitions.push(MoveTransition {
            given: from,
            then: to,
            min,
            max,
        });
    }

    /// Declares that entering `from` immediately also enters `to`.
    ///
    /// The registered empty transitions are kept closed under transitivity:
    /// linking `a` to `b` also links `a` to everything reachable from `b`,
    /// and everything that reaches `a` to `b`. Duplicates are dropped.
    pub fn empty(&mut self, from: StateId, to: StateId) {
        let mut pending = Vec::new();
        for t in &self.close_transitions {
            if t.given == from && t.then == to {
                return;
            }
            if t.given == to {
                pending.push((from, t.then));
            }
            if t.then == from {
                pending.push((t.given, to));
            }
        }
        self.close_transitions.push(CloseTransition {
            given: from,
            then: to,
        });
        for (given, then) in pending {
            self.empty(given, then);
        }
    }

    /// Marks `state` as accepting and attaches the constructor invoked when
    /// the machine stops there.
    ///
    /// Two different finals firing at the same maximum length resolve to the
    /// one declared first; machine authors should not rely on this and are
    /// better off avoiding the ambiguity.
    pub fn accept(&mut self, state: StateId, then: TokenConstructor<T>) {
        self.final_states.push(FinalState { given: state, then });
    }

    /// Begins executing the machine against `src`.
    pub fn tokenize<'a>(&'a self, src: &'a str) -> Stream<'a, T> {
        Stream {
            prog: self,
            src,
            src_pos: 0,
            this: vec![false; self.max_state + 1],
            next: vec![false; self.max_state + 1],
            done: false,
        }
    }
}

impl<T> Automaton for Lexer<T> {
    fn state(&mut self) -> StateId {
        Lexer::state(self)
    }

    fn range(&mut self, from: StateId, to: StateId, min: char, max: char) {
        Lexer::range(self, from, to, min, max);
    }

    fn empty(&mut self, from: StateId, to: StateId) {
        Lexer::empty(self, from, to);
    }
}

/// Execution of a [`Lexer`] over one input text.
///
/// The stream yields `Result` tokens; the first error is also the last item.
/// Input that no token matches simply ends the stream: callers that care
/// about trailing garbage compare how far the stream got against the input
/// length.
pub struct Stream<'a, T> {
    prog: &'a Lexer<T>,
    src: &'a str,
    src_pos: usize,
    this: Vec<bool>,
    next: Vec<bool>,
    done: bool,
}

impl<T> Iterator for Stream<'_, T> {
    type Item = Result<T, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.exec() {
            Some(Ok(tok)) => Some(Ok(tok)),
            Some(Err(err)) => {
                self.done = true;
                Some(Err(err))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

impl<T> Stream<'_, T> {
    /// Runs the stream to completion and collects the tokens.
    pub fn force(self) -> Result<Vec<T>, LexError> {
        let mut res = Vec::new();
        for tok in self {
            res.push(tok?);
        }
        Ok(res)
    }

    /// Executes the machine once from the current cursor, emitting the
    /// longest token it can.
    fn exec(&mut self) -> Option<Result<T, LexError>> {
        let mut pos = self.src_pos;
        let start = pos;
        let mut end = pos;
        let mut fin: Option<usize> = None;
        let mut running = true;

        self.this.fill(false);
        self.this[0] = true;

        while running {
            running = false;
            self.next.fill(false);

            self.close_state();
            self.detect_final(&mut fin, &mut end, pos);

            let Some(c) = self.src[pos..].chars().next() else {
                break;
            };

            self.move_state(&mut running, c);

            std::mem::swap(&mut self.this, &mut self.next);
            pos += c.len_utf8();
        }

        let fin = fin?;
        let text = &self.src[start..end];
        self.src_pos = end;

        match (self.prog.final_states[fin].then)(start, text) {
            Ok(tok) => Some(Ok(tok)),
            Err(source) => {
                tracing::trace!(at = start, text, "token constructor rejected match");
                Some(Err(LexError { at: start, source }))
            }
        }
    }

    /// Closes the live set under empty transitions.
    fn close_state(&mut self) {
        for op in &self.prog.close_transitions {
            if !self.this[op.given] {
                continue;
            }
            self.this[op.then] = true;
        }
    }

    /// Records the best final state live at `pos`: longest match first, then
    /// earliest declaration.
    fn detect_final(&self, fin: &mut Option<usize>, end: &mut usize, pos: usize) {
        for (i, op) in self.prog.final_states.iter().enumerate() {
            if !self.this[op.given] {
                continue;
            }
            if pos > *end || (pos == *end && fin.is_some_and(|f| i < f)) {
                *end = pos;
                *fin = Some(i);
            }
        }
    }

    /// Applies every consuming transition enabled by `c` to build the next
    /// live set.
    fn move_state(&mut self, running: &mut bool, c: char) {
        for op in &self.prog.move_transitions {
            if !self.this[op.given] {
                continue;
            }
            if c < op.min || c > op.max {
                continue;
            }
            self.next[op.then] = true;
            *running = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Automaton, Lexer, StateId};

    #[derive(Debug, Clone, PartialEq)]
    enum Tok {
        Ident(String),
        Int(i64),
        Float(f64),
        Sep,
    }

    /// identifier: [a-z][a-z0-9]*, integer: [0-9]+, float: [0-9]+\.[0-9]+,
    /// sep: '.'
    fn word_machine() -> Lexer<Tok> {
        let mut l = Lexer::default();

        let id_head = l.state();
        let id_cont = l.state();
        l.range(0, id_head, 'a', 'z');
        l.range(id_head, id_cont, 'a', 'z');
        l.range(id_head, id_cont, '0', '9');
        l.range(id_cont, id_cont, 'a', 'z');
        l.range(id_cont, id_cont, '0', '9');
        l.accept(id_head, Box::new(|_, text| Ok(Tok::Ident(text.into()))));
        l.empty(id_cont, id_head);

        let int_end = l.state();
        l.range(0, int_end, '0', '9');
        l.range(int_end, int_end, '0', '9');
        l.accept(int_end, Box::new(|_, text| Ok(Tok::Int(text.parse()?))));

        let frac_dot = l.state();
        let frac_end = l.state();
        l.rune(int_end, frac_dot, '.');
        l.range(frac_dot, frac_end, '0', '9');
        l.range(frac_end, frac_end, '0', '9');
        l.accept(frac_end, Box::new(|_, text| Ok(Tok::Float(text.parse()?))));

        let sep = l.state();
        l.rune(0, sep, '.');
        l.accept(sep, Box::new(|_, _| Ok(Tok::Sep)));

        l
    }

    #[test]
    fn tokenize() {
        for (input, expected) in [
            ("hello", vec![Tok::Ident("hello".into())]),
            ("123", vec![Tok::Int(123)]),
            ("123.4", vec![Tok::Float(123.4)]),
            (
                "123.up",
                vec![Tok::Int(123), Tok::Sep, Tok::Ident("up".into())],
            ),
        ] {
            let tokens = word_machine().tokenize(input).force().unwrap();
            assert_eq!(tokens, expected, "input {input:?}");
        }
    }

    #[test]
    fn tokenize_stops_at_garbage() {
        let machine = word_machine();
        let mut stream = machine.tokenize("ab#cd");
        assert_eq!(stream.next().unwrap().unwrap(), Tok::Ident("ab".into()));
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
    }

    #[test]
    fn constructor_error_is_sticky() {
        let mut l: Lexer<u32> = Lexer::default();
        let s = l.state();
        l.range(0, s, 'a', 'z');
        l.accept(s, Box::new(|_, _| Err("nope".into())));

        let mut stream = l.tokenize("ab");
        assert!(stream.next().unwrap().is_err());
        assert!(stream.next().is_none());
    }

    #[test]
    fn empty_transitions_chain() {
        let mut l: Lexer<u32> = Lexer::default();

        let s1 = l.state();
        let s2 = l.state();
        let s3 = l.state();
        let end = l.state();

        l.accept(end, Box::new(|_, _| Ok(1)));

        l.empty(s1, s2);
        l.empty(s2, s3);
        l.empty(0, s1);

        l.rune(s3, end, '0');

        let tokens = l.tokenize("0").force().unwrap();
        assert_eq!(tokens, vec![1]);
    }

    #[test]
    fn longest_match_beats_declaration_order() {
        // An earlier final that matches a shorter prefix loses to a later
        // one matching a longer prefix.
        let mut l: Lexer<&'static str> = Lexer::default();

        let short = l.state();
        l.rune(0, short, 'a');
        l.accept(short, Box::new(|_, _| Ok("short")));

        let long_mid = l.state();
        let long_end = l.state();
        l.rune(0, long_mid, 'a');
        l.rune(long_mid, long_end, 'b');
        l.accept(long_end, Box::new(|_, _| Ok("long")));

        assert_eq!(l.tokenize("ab").force().unwrap(), vec!["long"]);
        assert_eq!(l.tokenize("ac").force().unwrap(), vec!["short"]);
    }

    #[test]
    fn declaration_order_breaks_length_ties() {
        let mut l: Lexer<&'static str> = Lexer::default();

        let first = l.state();
        l.rune(0, first, 'a');
        l.accept(first, Box::new(|_, _| Ok("first")));

        let second = l.state();
        l.rune(0, second, 'a');
        l.accept(second, Box::new(|_, _| Ok("second")));

        assert_eq!(l.tokenize("a").force().unwrap(), vec!["first"]);
    }

    #[test]
    fn automaton_object_surface() {
        let mut l: Lexer<u8> = Lexer::default();
        let end = {
            let ops: &mut dyn Automaton = &mut l;
            let end = ops.state();
            ops.rune(0, end, 'x');
            end
        };
        l.accept(end, Box::new(|_, _| Ok(0)));
        assert_eq!(l.tokenize("x").force().unwrap(), vec![0]);
    }

    /// Digits-or-letters inputs split into maximal single-kind chunks.
    mod properties {
        use super::super::Lexer;
        use proptest::prelude::*;

        #[derive(Debug, PartialEq)]
        enum Chunk {
            Word(String),
            Number(String),
        }

        fn chunk_machine() -> Lexer<Chunk> {
            let mut l = Lexer::default();

            let w = l.state();
            l.range(0, w, 'a', 'z');
            l.range(w, w, 'a', 'z');
            l.accept(w, Box::new(|_, text| Ok(Chunk::Word(text.into()))));

            let n = l.state();
            l.range(0, n, '0', '9');
            l.range(n, n, '0', '9');
            l.accept(n, Box::new(|_, text| Ok(Chunk::Number(text.into()))));

            l
        }

        proptest! {
            #[test]
            fn maximal_munch_covers_input(input in "[a-z0-9]{1,32}") {
                let machine = chunk_machine();
                let chunks = machine.tokenize(&input).force().unwrap();

                let mut rebuilt = String::new();
                let mut last_numeric = None;
                for chunk in &chunks {
                    let (text, numeric) = match chunk {
                        Chunk::Word(t) => (t, false),
                        Chunk::Number(t) => (t, true),
                    };
                    prop_assert!(!text.is_empty());
                    // adjacent chunks of the same kind would not be maximal
                    prop_assert_ne!(Some(numeric), last_numeric);
                    last_numeric = Some(numeric);
                    rebuilt.push_str(text);
                }
                prop_assert_eq!(rebuilt, input);
            }
        }
    }

    #[test]
    fn state_ids_are_dense() {
        let mut l: Lexer<Tok> = Lexer::default();
        let ids: Vec<StateId> = (0..4).map(|_| l.state()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }
}
