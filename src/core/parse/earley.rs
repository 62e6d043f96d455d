use {
    crate::core::{
        config::ParserConfig,
        parse::{
            category::Category,
            chart::{Chart, Child, Scores, State, Viterbi},
            grammar::{Grammar, RuleId},
            Error, ParseTree, Parser,
        },
        scan::Token,
        semiring::Semiring,
    },
    std::collections::VecDeque,
    stopwatch::Stopwatch,
};

/// Stolcke's probabilistic Earley parser.
///
/// Fills one chart per call; the grammar is only read, so a single grammar
/// can serve any number of parsers on any number of threads.
#[derive(Clone, Debug, Default)]
pub struct StolckeParser {
    config: ParserConfig,
}

impl StolckeParser {
    pub fn new(config: ParserConfig) -> Self {
        StolckeParser { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }
}

impl<S, E> Parser<S, E> for StolckeParser
where
    S: Semiring,
    E: AsRef<str> + Clone,
{
    fn parse<'a>(
        &self,
        start: &Category,
        grammar: &'a Grammar<S>,
        tokens: &'a [Token<E>],
    ) -> Result<Chart<'a, S, E>, Error> {
        if let Some(limit) = self.config.max_tokens {
            if tokens.len() > limit {
                warn!("Refusing to parse {} tokens, limit is {}", tokens.len(), limit);
                return Err(Error::InputTooLong {
                    tokens: tokens.len(),
                    limit,
                });
            }
        }

        let chart = fill_chart(start, grammar, tokens);

        if self.config.dump_chart {
            for line in chart.dump() {
                trace!("{}", line);
            }
        }

        Ok(chart)
    }
}

/// The single complete `<start>` state spanning the whole input.
pub fn top_level_state<S: Semiring, E>(chart: &Chart<S, E>) -> Result<State, Error> {
    let n = chart.len() - 1;
    let completed: Vec<State> = chart
        .get_completed_states(n, &Category::Start)
        .into_iter()
        .filter(|state| state.origin == 0)
        .collect();

    match completed.len() {
        0 => Err(Error::NoParse { tokens: n }),
        1 => Ok(completed[0]),
        count => {
            warn!("Found {} complete start states spanning {} tokens", count, n);
            Err(Error::AmbiguousParse { count })
        }
    }
}

/// Rebuilds the best derivation of `state` from the chart's Viterbi annotations.
///
/// Partly built nodes are kept on an explicit stack, so deep derivations
/// (long left- or right-recursive chains) do not grow the call stack.
pub fn viterbi_parse<S, E>(chart: &Chart<S, E>, state: &State) -> Result<ParseTree<E>, Error>
where
    S: Semiring,
    E: Clone,
{
    let mut stack: Vec<Node<E>> = vec![expand(chart, state)?];

    while let Some(node) = stack.last_mut() {
        match node.pending.pop() {
            Some(Pending::Ready(tree)) => node.children.push(tree),
            Some(Pending::Expand(child)) => {
                let child = expand(chart, &child)?;
                stack.push(child);
            }
            None => {
                let finished = match stack.pop() {
                    Some(node) => ParseTree::Internal {
                        category: node.category,
                        children: node.children,
                    },
                    None => break,
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(finished),
                    None => return Ok(finished),
                }
            }
        }
    }

    Err(Error::MissingDerivation(chart.state_string(state)))
}

/// A tree node whose children are still being rebuilt. `pending` holds the
/// remaining children rightmost first, so `pop` yields them in input order.
struct Node<E> {
    category: Category,
    children: Vec<ParseTree<E>>,
    pending: Vec<Pending<E>>,
}

enum Pending<E> {
    Ready(ParseTree<E>),
    Expand(State),
}

/// Follows the predecessor chain of `state` back to its prediction.
fn expand<S, E>(chart: &Chart<S, E>, state: &State) -> Result<Node<E>, Error>
where
    S: Semiring,
    E: Clone,
{
    let rule = chart.rule(state.rule).ok_or(Error::UnknownRule(state.rule))?;
    let mut pending = Vec::with_capacity(state.dot);
    let mut current = *state;

    loop {
        let at = current;
        let missing = || Error::MissingDerivation(chart.state_string(&at));
        let viterbi = chart.get_viterbi_score(&at).ok_or_else(missing)?;
        if at.dot == 0 {
            break;
        }

        let category = rule.symbol_at(at.dot - 1).ok_or_else(missing)?;
        pending.push(match viterbi.child {
            Some(Child::Scanned(index)) => Pending::Ready(ParseTree::Leaf {
                category: category.clone(),
                token: chart.tokens().get(index).cloned().ok_or_else(missing)?,
            }),
            Some(Child::Completed(child)) => Pending::Expand(child),
            Some(Child::Nulled) => {
                Pending::Ready(null_tree(chart.grammar(), category).ok_or_else(missing)?)
            }
            None => return Err(missing()),
        });
        current = viterbi.predecessor.ok_or_else(missing)?;
    }

    Ok(Node {
        category: rule.lhs().clone(),
        children: Vec::with_capacity(pending.len()),
        pending,
    })
}

/// The most probable ε-derivation of `category`. Its depth is bounded by the
/// number of nonterminals.
fn null_tree<S: Semiring, E>(grammar: &Grammar<S>, category: &Category) -> Option<ParseTree<E>> {
    let null = grammar.null(grammar.nonterminal_index(category)?)?;
    let children = grammar
        .rule(null.rule)?
        .rhs()
        .iter()
        .map(|symbol| null_tree(grammar, symbol))
        .collect::<Option<Vec<ParseTree<E>>>>()?;

    Some(ParseTree::Internal {
        category: category.clone(),
        children,
    })
}

pub(crate) fn fill_chart<'a, S, E>(
    start: &Category,
    grammar: &'a Grammar<S>,
    tokens: &'a [Token<E>],
) -> Chart<'a, S, E>
where
    S: Semiring,
    E: AsRef<str>,
{
    let sw = Stopwatch::start_new();
    let sr = grammar.semiring();
    let mut chart = Chart::new(grammar, tokens, start.clone());

    let seed = Scores {
        forward: sr.one(),
        inner: sr.one(),
        base: sr.zero(),
    };
    let start_state = chart.start_state();
    insert(
        &mut chart,
        start_state,
        seed,
        Some(Viterbi::predicted(sr.one())),
        &mut Vec::new(),
    );
    predict(&mut chart, 0);

    for position in 0..tokens.len() {
        scan(&mut chart, position);
        complete(&mut chart, position + 1);
        predict(&mut chart, position + 1);
        trace!(
            "Position {} holds {} states",
            position + 1,
            chart.get_states(position + 1).len()
        );
    }

    debug!(
        "Filled chart of {} states for {} tokens in {}ms",
        chart.state_count(),
        tokens.len(),
        sw.elapsed_ms()
    );

    chart
}

/// Adds `gain` and a Viterbi candidate to `state`, then carries both over
/// every nullable symbol after its dot, weighted by that symbol's null
/// probability and best null derivation. States whose Viterbi annotation
/// improved are pushed on to `improved`.
fn insert<S, E>(
    chart: &mut Chart<S, E>,
    mut state: State,
    mut gain: Scores<S::Element>,
    mut viterbi: Option<Viterbi<S::Element>>,
    improved: &mut Vec<State>,
) where
    S: Semiring,
{
    let grammar = chart.grammar();
    let sr = grammar.semiring();

    loop {
        let (slot, _) = chart.get_or_create(state);
        chart.add_scores(state.position, slot, gain);
        viterbi = match viterbi {
            Some(candidate) if chart.offer_viterbi(state.position, slot, candidate) => {
                improved.push(state);
                Some(candidate)
            }
            _ => None,
        };

        let null = match chart.shape(&state).next.and_then(|next| grammar.null(next)) {
            Some(null) => null,
            None => return,
        };
        if viterbi.is_none() && sr.is_zero(gain.forward) && sr.is_zero(gain.inner) {
            return;
        }

        gain = Scores {
            forward: sr.times(gain.forward, null.probability),
            inner: sr.times(gain.inner, null.probability),
            base: sr.times(gain.base, null.probability),
        };
        viterbi = viterbi.map(|v| Viterbi::step(sr.times(v.score, null.viterbi), state, Child::Nulled));
        state = state.advance(state.position);
    }
}

/// Moves every state at `position` expecting a terminal that matches the token
/// there into `position + 1`.
fn scan<S, E>(chart: &mut Chart<S, E>, position: usize)
where
    S: Semiring,
    E: AsRef<str>,
{
    let token = chart.tokens()[position].text();
    let mut scanned = Vec::new();

    for (slot, state) in chart.get_states(position).iter().enumerate() {
        let matches = match chart.next_symbol(state) {
            Some(Category::Terminal(terminal)) => terminal.matches(token),
            _ => false,
        };
        if !matches {
            continue;
        }

        let scores = chart.scores_at(position, slot);
        let viterbi = chart
            .viterbi_at(position, slot)
            .map(|v| Viterbi::step(v.score, *state, Child::Scanned(position)));
        let gain = Scores {
            base: scores.inner,
            ..scores
        };
        scanned.push((state.advance(position + 1), gain, viterbi));
    }

    let mut improved = Vec::new();
    for (target, gain, viterbi) in scanned {
        insert(chart, target, gain, viterbi, &mut improved);
    }
}

/// Attaches the complete states ending at `position` to the states waiting
/// for them, by decreasing origin.
///
/// The base score of a state starting at `origin` only grows while states
/// starting after `origin` are attached, so every complete state is attached
/// once, with its final score. Viterbi annotations of one origin are relaxed
/// until no unit step improves them.
fn complete<S, E>(chart: &mut Chart<S, E>, position: usize)
where
    S: Semiring,
{
    let mut below = position;

    while let Some(origin) = chart.completed_origin_below(position, below) {
        let mut index = 0;
        loop {
            let slot = match chart.completed_from(position, origin).get(index) {
                Some(&slot) => slot,
                None => break,
            };
            attach_scores(chart, position, slot);
            index += 1;
        }

        let mut agenda: VecDeque<State> = chart
            .completed_from(position, origin)
            .iter()
            .map(|&slot| chart.state_at(position, slot))
            .collect();
        while let Some(state) = agenda.pop_front() {
            for target in attach_viterbi(chart, &state) {
                if target.origin == origin && chart.is_complete(&target) {
                    agenda.push_back(target);
                }
            }
        }

        below = origin;
    }
}

/// Passes the base score of a complete state to every state waiting on a
/// nonterminal that derives its left-hand side through unit steps.
fn attach_scores<S, E>(chart: &mut Chart<S, E>, position: usize, slot: usize)
where
    S: Semiring,
{
    let grammar = chart.grammar();
    let sr = grammar.semiring();
    let state = chart.state_at(position, slot);
    let base = chart.scores_at(position, slot).base;
    let lhs = match chart.shape(&state).lhs {
        Some(lhs) if !sr.is_zero(base) => lhs,
        _ => return,
    };

    let mut attached = Vec::new();
    for &(expected, unit_score) in grammar.unit_star().incoming(lhs) {
        let child = sr.times(unit_score, base);
        for &parent_slot in chart.active_on(state.origin, expected) {
            let parent = chart.state_at(state.origin, parent_slot);
            let scores = chart.scores_at(state.origin, parent_slot);
            let inner = sr.times(scores.inner, child);
            // A parent that spans nothing makes this child the whole span.
            let base = if parent.origin < parent.position {
                inner
            } else {
                sr.zero()
            };
            attached.push((
                parent.advance(position),
                Scores {
                    forward: sr.times(scores.forward, child),
                    inner,
                    base,
                },
            ));
        }
    }

    let mut improved = Vec::new();
    for (target, gain) in attached {
        insert(chart, target, gain, None, &mut improved);
    }
}

/// Offers a complete state's Viterbi score to the states waiting on its
/// left-hand side, one unit step at a time so the rebuilt tree keeps every
/// intermediate node. Returns the states that improved.
fn attach_viterbi<S, E>(chart: &mut Chart<S, E>, state: &State) -> Vec<State>
where
    S: Semiring,
{
    let sr = chart.grammar().semiring();
    let mut improved = Vec::new();
    let (score, lhs) = match (chart.get_viterbi_score(state), chart.shape(state).lhs) {
        (Some(viterbi), Some(lhs)) => (viterbi.score, lhs),
        _ => return improved,
    };

    let mut candidates = Vec::new();
    for &parent_slot in chart.active_on(state.origin, lhs) {
        if let Some(parent_viterbi) = chart.viterbi_at(state.origin, parent_slot) {
            let parent = chart.state_at(state.origin, parent_slot);
            candidates.push((
                parent.advance(state.position),
                Viterbi::step(
                    sr.times(parent_viterbi.score, score),
                    parent,
                    Child::Completed(*state),
                ),
            ));
        }
    }

    for (target, candidate) in candidates {
        insert(chart, target, Scores::zero(sr), Some(candidate), &mut improved);
    }

    improved
}

/// Predicts, from every state at `position` that has consumed input (and
/// from the seed), the rules of all left corners of its next symbol. Each
/// rule is predicted once, with its forward score summed over predictors.
fn predict<S, E>(chart: &mut Chart<S, E>, position: usize)
where
    S: Semiring,
{
    let grammar = chart.grammar();
    let sr = grammar.semiring();
    let mut forwards: Vec<Option<S::Element>> = vec![None; grammar.rules().len()];
    let mut order: Vec<RuleId> = Vec::new();

    for (slot, state) in chart.get_states(position).iter().enumerate() {
        let shape = chart.shape(state);
        let expected = match shape.next {
            Some(next) if shape.predicts => next,
            _ => continue,
        };
        let forward = chart.scores_at(position, slot).forward;
        if sr.is_zero(forward) {
            continue;
        }

        for &(corner, corner_score) in grammar.left_star().outgoing(expected) {
            for &rule_id in grammar.rule_ids_for_index(corner) {
                if let Some(rule) = grammar.rule(rule_id) {
                    let gain = sr.times(forward, sr.times(corner_score, rule.weight()));
                    let entry = &mut forwards[rule_id.index()];
                    *entry = match *entry {
                        None => {
                            order.push(rule_id);
                            Some(gain)
                        }
                        Some(total) => Some(sr.plus(total, gain)),
                    };
                }
            }
        }
    }

    let mut improved = Vec::new();
    for rule_id in order {
        if let (Some(forward), Some(rule)) = (forwards[rule_id.index()], grammar.rule(rule_id)) {
            let gain = Scores {
                forward,
                inner: rule.weight(),
                base: sr.zero(),
            };
            insert(
                chart,
                State::new(rule_id, position, position, 0),
                gain,
                Some(Viterbi::predicted(rule.weight())),
                &mut improved,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        parse::grammar::GrammarBuilder,
        scan::tokenize,
        semiring::{LogSemiring, ProbabilitySemiring},
    };

    fn nt(name: &str) -> Category {
        Category::nonterminal(name)
    }

    fn t(text: &str) -> Category {
        Category::exact(text)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {} but was {}",
            expected,
            actual
        );
    }

    #[test]
    fn seed_and_predict() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder
            .add_rule(0.6, nt("S"), vec![t("a")])
            .add_rule(0.4, nt("S"), vec![nt("S"), nt("S")]);
        let grammar = builder.build().unwrap();
        let tokens = tokenize::<&str>(&[]);

        //exercise
        let chart = fill_chart(&nt("S"), &grammar, &tokens);

        //verify
        assert_eq!(chart.get_states(0).len(), 3);
        let predicted = State::new(RuleId(1), 0, 0, 0);
        assert_close(chart.get_forward_score(&predicted).unwrap(), 0.4 / 0.6);
        assert_close(chart.get_inner_score(&predicted).unwrap(), 0.4);
        assert!(top_level_state(&chart).is_err());
    }

    #[test]
    fn scan_mismatch_leaves_next_set_empty() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder.add_rule(1.0, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();
        let tokens = tokenize(&["b"]);

        //exercise
        let chart = fill_chart(&nt("S"), &grammar, &tokens);

        //verify
        assert!(chart.get_states(1).is_empty());
        match top_level_state(&chart) {
            Err(Error::NoParse { tokens }) => assert_eq!(tokens, 1),
            _ => panic!("expected no parse"),
        }
    }

    #[test]
    fn epsilon_rules() {
        //setup
        // S -> A b, A -> a (0.5) | ε (0.5)
        let mut builder = GrammarBuilder::new(LogSemiring);
        builder
            .add_rule(1.0, nt("S"), vec![nt("A"), t("b")])
            .add_rule(0.5, nt("A"), vec![t("a")])
            .add_rule(0.5, nt("A"), vec![]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let with_a = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["a", "b"]))
            .unwrap();
        let without_a = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["b"]))
            .unwrap();

        //verify
        assert_close(with_a.probability, 0.5);
        assert_close(without_a.probability, 0.5);
        assert_eq!(with_a.tree.to_string(), "[S[A[a]][b]]");
        assert_eq!(without_a.tree.to_string(), "[S[A][b]]");
    }

    #[test]
    fn nested_epsilon_rules() {
        //setup
        // S -> A B c, A -> ε, B -> A A
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder
            .add_rule(1.0, nt("S"), vec![nt("A"), nt("B"), t("c")])
            .add_rule(1.0, nt("A"), vec![])
            .add_rule(1.0, nt("B"), vec![nt("A"), nt("A")]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let res = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["c"]))
            .unwrap();
        let recognized = parser
            .recognize(&nt("S"), &grammar, &tokenize(&["c"]))
            .unwrap();

        //verify
        assert_close(res.probability, 1.0);
        assert_close(recognized, 1.0);
        assert_eq!(res.tree.to_string(), "[S[A][B[A][A]][c]]");
    }

    #[test]
    fn unit_chain_is_expanded_in_tree() {
        //setup
        let mut builder = GrammarBuilder::new(LogSemiring);
        builder
            .add_rule(1.0, nt("S"), vec![nt("A")])
            .add_rule(0.5, nt("A"), vec![nt("B")])
            .add_rule(0.5, nt("A"), vec![t("a")])
            .add_rule(1.0, nt("B"), vec![t("b")]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let res = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["b"]))
            .unwrap();

        //verify
        assert_close(res.probability, 0.5);
        assert_eq!(res.tree.to_string(), "[S[A[B[b]]]]");
    }

    #[test]
    fn recognize_sums_ambiguous_derivations() {
        //setup
        // S -> S S (0.4) | a (0.6), "a a a" has two derivations
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder
            .add_rule(0.6, nt("S"), vec![t("a")])
            .add_rule(0.4, nt("S"), vec![nt("S"), nt("S")]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let total = parser
            .recognize(&nt("S"), &grammar, &tokenize(&["a", "a", "a"]))
            .unwrap();
        let best = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["a", "a", "a"]))
            .unwrap();

        //verify
        let single = 0.6f64.powi(3) * 0.4f64.powi(2);
        assert_close(total, 2.0 * single);
        assert_close(best.probability, single);
    }

    #[test]
    fn recognize_without_parse() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder.add_rule(1.0, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();

        //exercise
        let res = StolckeParser::default().recognize(&nt("S"), &grammar, &tokenize(&["a", "a"]));

        //verify
        assert_eq!(res.unwrap(), 0.0);
    }

    #[test]
    fn failed_input_too_long() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder.add_rule(1.0, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();
        let mut config = ParserConfig::default();
        config.max_tokens = Some(1);
        let parser = StolckeParser::new(config);
        let tokens = tokenize(&["a", "a"]);

        //exercise
        let res = parser.parse(&nt("S"), &grammar, &tokens);

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "Input of 2 tokens exceeds the limit of 1"
        );
    }

    #[test]
    fn failed_viterbi_parse_of_absent_state() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder.add_rule(1.0, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();
        let tokens = tokenize(&["a"]);
        let chart = fill_chart(&nt("S"), &grammar, &tokens);

        //exercise
        let res = viterbi_parse(&chart, &State::new(RuleId(0), 1, 1, 1));
        let unknown = viterbi_parse(&chart, &State::new(RuleId(7), 0, 1, 1));

        //verify
        assert_eq!(
            format!("{}", res.err().unwrap()),
            "No derivation recorded for state 'S → a • (1, 1)'"
        );
        assert_eq!(
            format!("{}", unknown.err().unwrap()),
            "State refers to unknown rule #7"
        );
    }

    #[test]
    fn viterbi_parse_of_start_state_keeps_synthetic_root() {
        //setup
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder.add_rule(1.0, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();
        let tokens = tokenize(&["a"]);
        let chart = fill_chart(&nt("S"), &grammar, &tokens);

        //exercise
        let root = top_level_state(&chart).unwrap();
        let tree = viterbi_parse(&chart, &root).unwrap();

        //verify
        assert_eq!(tree.to_string(), "[<start>[S[a]]]");
    }

    #[test]
    fn nullable_recursion_terminates() {
        //setup
        // S -> S S (0.3) | a (0.4) | ε (0.3)
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder
            .from(nt("S"))
            .to(0.3, vec![nt("S"), nt("S")])
            .to(0.4, vec![t("a")])
            .epsilon(0.3);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();
        let sw = Stopwatch::start_new();

        //exercise
        let empty = parser.recognize(&nt("S"), &grammar, &tokenize::<&str>(&[])).unwrap();
        let single = parser.recognize(&nt("S"), &grammar, &tokenize(&["a"])).unwrap();
        let best = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["a"]))
            .unwrap();

        //verify
        // e = 0.3 + 0.3e² gives 1/3; inner("a") = 0.4 / (1 - 2 * 0.3e) = 0.5
        assert_close(empty, 1.0 / 3.0);
        assert_close(single, 0.5);
        assert_close(best.probability, 0.4);
        assert_eq!(best.tree.to_string(), "[S[a]]");
        assert!(sw.elapsed_ms() < 2_000);
    }

    #[test]
    fn nullable_prefix_is_a_unit_step() {
        //setup
        // S -> A S (0.5) | a (0.5), A -> ε
        let mut builder = GrammarBuilder::new(LogSemiring);
        builder
            .add_rule(0.5, nt("S"), vec![nt("A"), nt("S")])
            .add_rule(0.5, nt("S"), vec![t("a")])
            .add_rule(1.0, nt("A"), vec![]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let total = parser.recognize(&nt("S"), &grammar, &tokenize(&["a"])).unwrap();
        let best = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["a"]))
            .unwrap();

        //verify
        // inner = 0.5 + 0.5 * inner
        assert_close(total, 1.0);
        assert_close(best.probability, 0.5);
        assert_eq!(best.tree.to_string(), "[S[a]]");
    }

    #[test]
    fn nulled_symbols_keep_best_derivation() {
        //setup
        // S -> a B, B -> ε (0.2) | C C (0.8), C -> ε (0.9)
        let mut builder = GrammarBuilder::new(ProbabilitySemiring);
        builder
            .add_rule(1.0, nt("S"), vec![t("a"), nt("B")])
            .add_rule(0.2, nt("B"), vec![])
            .add_rule(0.8, nt("B"), vec![nt("C"), nt("C")])
            .add_rule(0.9, nt("C"), vec![]);
        let grammar = builder.build().unwrap();
        let parser = StolckeParser::default();

        //exercise
        let best = parser
            .viterbi_parse_with_score(&nt("S"), &grammar, &tokenize(&["a"]))
            .unwrap();
        let total = parser.recognize(&nt("S"), &grammar, &tokenize(&["a"])).unwrap();

        //verify
        assert_eq!(best.tree.to_string(), "[S[a][B[C][C]]]");
        assert_close(best.probability, 0.8 * 0.81);
        assert_close(total, 0.2 + 0.8 * 0.81);
    }

    #[test]
    fn deep_left_recursion_rebuilds_without_recursion() {
        //setup
        // S -> S a (0.5) | a (0.5)
        let mut builder = GrammarBuilder::new(LogSemiring);
        builder
            .add_rule(0.5, nt("S"), vec![nt("S"), t("a")])
            .add_rule(0.5, nt("S"), vec![t("a")]);
        let grammar = builder.build().unwrap();
        let n = 2_000;

        //exercise
        let tree = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(move || {
                let tokens = tokenize(&vec!["a"; n]);
                let chart = fill_chart(&nt("S"), &grammar, &tokens);
                let root = top_level_state(&chart).unwrap();
                viterbi_parse(&chart, &root).unwrap()
            })
            .unwrap()
            .join()
            .unwrap();

        //verify
        assert_eq!(tree.leaves().len(), n);
        assert_eq!(tree.category(), &Category::Start);
    }
}
