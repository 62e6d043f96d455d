use {
    crate::core::{
        parse::{
            category::Category,
            grammar::{Grammar, Rule, RuleId},
        },
        scan::Token,
        semiring::Semiring,
    },
    std::{
        collections::{BTreeMap, HashMap},
        fmt,
    },
};

/// Identity of an Earley item: `[rule, origin, position, dot]`.
///
/// Scores are not part of the identity; they live in the chart, keyed by it.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct State {
    pub rule: RuleId,
    pub origin: usize,
    pub position: usize,
    pub dot: usize,
}

impl State {
    pub fn new(rule: RuleId, origin: usize, position: usize, dot: usize) -> Self {
        State {
            rule,
            origin,
            position,
            dot,
        }
    }

    /// The same item with the dot moved over one symbol, ending at `position`.
    pub(crate) fn advance(&self, position: usize) -> Self {
        State {
            rule: self.rule,
            origin: self.origin,
            position,
            dot: self.dot + 1,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "#{} @{} ({}, {})",
            self.rule.index(),
            self.dot,
            self.origin,
            self.position
        )
    }
}

/// How the dot of a state was moved over its last symbol.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Child {
    /// The token at this index was scanned.
    Scanned(usize),
    /// This complete state was attached.
    Completed(State),
    /// The symbol derived ε.
    Nulled,
}

/// The best derivation found so far for a state.
///
/// A predicted state has neither predecessor nor child. Any other state was
/// reached from `predecessor` through `child`.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct Viterbi<W> {
    pub score: W,
    pub predecessor: Option<State>,
    pub child: Option<Child>,
}

impl<W> Viterbi<W> {
    pub(crate) fn predicted(score: W) -> Self {
        Viterbi {
            score,
            predecessor: None,
            child: None,
        }
    }

    pub(crate) fn step(score: W, predecessor: State, child: Child) -> Self {
        Viterbi {
            score,
            predecessor: Some(predecessor),
            child: Some(child),
        }
    }
}

/// `base` is the part of `inner` not derived through a single nonterminal
/// child spanning the whole state; only it is passed on through `R_U`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Scores<W> {
    pub forward: W,
    pub inner: W,
    pub base: W,
}

impl<W: Copy> Scores<W> {
    pub fn zero<S: Semiring<Element = W>>(sr: &S) -> Self {
        Scores {
            forward: sr.zero(),
            inner: sr.zero(),
            base: sr.zero(),
        }
    }
}

/// What the chart engine needs to know about a state's rule and dot.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Shape {
    pub complete: bool,
    pub lhs: Option<usize>,
    pub next: Option<usize>,
    pub predicts: bool,
}

struct StateSet<W> {
    states: Vec<State>,
    scores: Vec<Scores<W>>,
    viterbi: Vec<Option<Viterbi<W>>>,
    slots: HashMap<State, usize>,
    active_on: HashMap<usize, Vec<usize>>,
    completed_from: BTreeMap<usize, Vec<usize>>,
}

impl<W> StateSet<W> {
    fn new() -> Self {
        StateSet {
            states: Vec::new(),
            scores: Vec::new(),
            viterbi: Vec::new(),
            slots: HashMap::new(),
            active_on: HashMap::new(),
            completed_from: BTreeMap::new(),
        }
    }
}

/// The state sets of one parse, positions `0..=tokens.len()`.
///
/// Each position is an arena: states are appended, never moved, and addressed
/// by `(position, slot)`. Later positions refer back to earlier ones only
/// through `State` identities stored in Viterbi annotations.
pub struct Chart<'a, S: Semiring, E> {
    grammar: &'a Grammar<S>,
    tokens: &'a [Token<E>],
    start_rule: Rule<S::Element>,
    sets: Vec<StateSet<S::Element>>,
}

impl<'a, S: Semiring, E> Chart<'a, S, E> {
    pub(crate) fn new(grammar: &'a Grammar<S>, tokens: &'a [Token<E>], start: Category) -> Self {
        let sr = grammar.semiring();
        Chart {
            grammar,
            tokens,
            start_rule: Rule::new(1.0, sr.one(), Category::Start, vec![start]),
            sets: (0..=tokens.len()).map(|_| StateSet::new()).collect(),
        }
    }

    pub fn grammar(&self) -> &'a Grammar<S> {
        self.grammar
    }

    pub fn tokens(&self) -> &'a [Token<E>] {
        self.tokens
    }

    /// Number of positions, one more than the number of tokens.
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Id of the synthetic `<start> → start` rule seeded at position 0.
    pub fn start_rule_id(&self) -> RuleId {
        RuleId(self.grammar.rules().len())
    }

    pub fn start_state(&self) -> State {
        State::new(self.start_rule_id(), 0, 0, 0)
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule<S::Element>> {
        if id == self.start_rule_id() {
            Some(&self.start_rule)
        } else {
            self.grammar.rule(id)
        }
    }

    pub fn get_states(&self, position: usize) -> &[State] {
        match self.sets.get(position) {
            None => &[],
            Some(set) => &set.states,
        }
    }

    pub fn contains(&self, state: &State) -> bool {
        self.slot(state).is_some()
    }

    pub fn get_forward_score(&self, state: &State) -> Option<S::Element> {
        self.slot(state)
            .map(|slot| self.sets[state.position].scores[slot].forward)
    }

    pub fn get_inner_score(&self, state: &State) -> Option<S::Element> {
        self.slot(state)
            .map(|slot| self.sets[state.position].scores[slot].inner)
    }

    pub fn get_viterbi_score(&self, state: &State) -> Option<&Viterbi<S::Element>> {
        self.slot(state)
            .and_then(|slot| self.sets[state.position].viterbi[slot].as_ref())
    }

    /// Complete states at `position` whose rule rewrites `category`.
    pub fn get_completed_states(&self, position: usize, category: &Category) -> Vec<State> {
        self.get_states(position)
            .iter()
            .filter(|state| match self.rule(state.rule) {
                None => false,
                Some(rule) => state.dot == rule.rhs().len() && rule.lhs() == category,
            })
            .cloned()
            .collect()
    }

    pub fn is_complete(&self, state: &State) -> bool {
        match self.rule(state.rule) {
            None => false,
            Some(rule) => state.dot >= rule.rhs().len(),
        }
    }

    pub fn next_symbol(&self, state: &State) -> Option<&Category> {
        self.rule(state.rule).and_then(|rule| rule.symbol_at(state.dot))
    }

    /// Renders a state with its dotted rule, e.g. `S → NP • VP (0, 2)`.
    pub fn state_string(&self, state: &State) -> String {
        match self.rule(state.rule) {
            None => state.to_string(),
            Some(rule) => {
                let mut rule_string = format!("{} →", rule.lhs());
                for (i, symbol) in rule.rhs().iter().enumerate() {
                    if i == state.dot {
                        rule_string.push_str(" •");
                    }
                    rule_string.push_str(&format!(" {}", symbol));
                }
                if state.dot == rule.rhs().len() {
                    rule_string.push_str(" •");
                }
                format!("{} ({}, {})", rule_string, state.origin, state.position)
            }
        }
    }

    /// One line per state: dotted rule, then forward, inner and Viterbi
    /// probabilities.
    pub fn dump(&self) -> Vec<String> {
        let sr = self.grammar.semiring();
        let mut lines = Vec::new();

        for (position, set) in self.sets.iter().enumerate() {
            lines.push(format!("SET {}", position));
            for (slot, state) in set.states.iter().enumerate() {
                let scores = &set.scores[slot];
                let viterbi = match set.viterbi[slot] {
                    None => String::from("-"),
                    Some(ref v) => format!("{:.6}", sr.to_probability(v.score)),
                };
                lines.push(format!(
                    "{} [fw {:.6}] [in {:.6}] [v {}]",
                    self.state_string(state),
                    sr.to_probability(scores.forward),
                    sr.to_probability(scores.inner),
                    viterbi
                ));
            }
        }

        lines
    }

    pub fn state_count(&self) -> usize {
        self.sets.iter().map(|set| set.states.len()).sum()
    }

    fn slot(&self, state: &State) -> Option<usize> {
        self.sets
            .get(state.position)
            .and_then(|set| set.slots.get(state).cloned())
    }

    pub(crate) fn shape(&self, state: &State) -> Shape {
        match self.rule(state.rule) {
            None => Shape {
                complete: false,
                lhs: None,
                next: None,
                predicts: false,
            },
            Some(rule) => Shape {
                complete: state.dot >= rule.rhs().len(),
                lhs: self.grammar.nonterminal_index(rule.lhs()),
                next: rule
                    .symbol_at(state.dot)
                    .and_then(|symbol| self.grammar.nonterminal_index(symbol)),
                predicts: state.origin < state.position
                    || (state.dot == 0 && *rule.lhs() == Category::Start),
            },
        }
    }

    pub(crate) fn state_at(&self, position: usize, slot: usize) -> State {
        self.sets[position].states[slot]
    }

    pub(crate) fn scores_at(&self, position: usize, slot: usize) -> Scores<S::Element> {
        self.sets[position].scores[slot]
    }

    pub(crate) fn viterbi_at(&self, position: usize, slot: usize) -> Option<Viterbi<S::Element>> {
        self.sets[position].viterbi[slot]
    }

    /// Incomplete states at `position` whose next symbol is nonterminal `nt`.
    pub(crate) fn active_on(&self, position: usize, nt: usize) -> &[usize] {
        self.sets[position]
            .active_on
            .get(&nt)
            .map(|slots| slots.as_slice())
            .unwrap_or(&[])
    }

    /// Complete states at `position` that start at `origin`, for `origin < position`.
    pub(crate) fn completed_from(&self, position: usize, origin: usize) -> &[usize] {
        self.sets[position]
            .completed_from
            .get(&origin)
            .map(|slots| slots.as_slice())
            .unwrap_or(&[])
    }

    /// The largest origin below `below` of any complete state at `position`.
    pub(crate) fn completed_origin_below(&self, position: usize, below: usize) -> Option<usize> {
        self.sets[position]
            .completed_from
            .range(..below)
            .next_back()
            .map(|(&origin, _)| origin)
    }

    /// Returns the slot of `state`, inserting it with zero scores if absent.
    pub(crate) fn get_or_create(&mut self, state: State) -> (usize, bool) {
        if let Some(slot) = self.slot(&state) {
            return (slot, false);
        }

        let shape = self.shape(&state);
        let zero = self.grammar.semiring().zero();
        let set = &mut self.sets[state.position];
        let slot = set.states.len();

        set.states.push(state);
        set.scores.push(Scores {
            forward: zero,
            inner: zero,
            base: zero,
        });
        set.viterbi.push(None);
        set.slots.insert(state, slot);

        if let Some(next) = shape.next {
            set.active_on.entry(next).or_insert_with(Vec::new).push(slot);
        }
        if shape.complete && state.origin < state.position {
            set.completed_from
                .entry(state.origin)
                .or_insert_with(Vec::new)
                .push(slot);
        }

        (slot, true)
    }

    pub(crate) fn add_scores(&mut self, position: usize, slot: usize, gain: Scores<S::Element>) {
        let sr = self.grammar.semiring();
        let scores = &mut self.sets[position].scores[slot];
        scores.forward = sr.plus(scores.forward, gain.forward);
        scores.inner = sr.plus(scores.inner, gain.inner);
        scores.base = sr.plus(scores.base, gain.base);
    }

    /// Replaces a state's Viterbi annotation if `candidate` scores strictly higher.
    pub(crate) fn offer_viterbi(
        &mut self,
        position: usize,
        slot: usize,
        candidate: Viterbi<S::Element>,
    ) -> bool {
        let sr = self.grammar.semiring();
        let current = &mut self.sets[position].viterbi[slot];

        let better = match *current {
            None => true,
            Some(ref existing) => {
                sr.compare(candidate.score, existing.score) == std::cmp::Ordering::Greater
            }
        };
        if better {
            *current = Some(candidate);
        }
        better
    }
}
