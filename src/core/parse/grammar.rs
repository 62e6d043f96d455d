use {
    crate::core::{
        parse::{
            category::Category,
            corner::StarClosure,
            nullable::{self, NullRule},
        },
        semiring::Semiring,
    },
    std::{
        collections::{HashMap, HashSet},
        error, fmt,
    },
};

/// Index of a rule within its grammar.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A weighted production `lhs → rhs`.
///
/// `weight` is `probability` encoded in the grammar's semiring.
#[derive(Clone, Debug)]
pub struct Rule<W> {
    lhs: Category,
    rhs: Vec<Category>,
    probability: f64,
    weight: W,
    error_rule: bool,
}

impl<W: Copy> Rule<W> {
    pub(crate) fn new(probability: f64, weight: W, lhs: Category, rhs: Vec<Category>) -> Self {
        Rule {
            lhs,
            rhs,
            probability,
            weight,
            error_rule: false,
        }
    }

    pub fn lhs(&self) -> &Category {
        &self.lhs
    }

    pub fn rhs(&self) -> &[Category] {
        &self.rhs
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn weight(&self) -> W {
        self.weight
    }

    /// Whether this rule was registered as a catch-all for unexpected tokens.
    pub fn is_error_rule(&self) -> bool {
        self.error_rule
    }

    pub fn is_epsilon(&self) -> bool {
        self.rhs.is_empty()
    }

    /// `X → Y` with `Y` a single nonterminal.
    pub fn is_unit_production(&self) -> bool {
        self.rhs.len() == 1 && !self.rhs[0].is_terminal()
    }

    pub fn symbol_at(&self, dot: usize) -> Option<&Category> {
        self.rhs.get(dot)
    }
}

impl<W> fmt::Display for Rule<W> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} →", self.lhs)?;
        if self.rhs.is_empty() {
            return write!(f, " ε");
        }
        for symbol in &self.rhs {
            write!(f, " {}", symbol)?;
        }
        Ok(())
    }
}

/// How a nullable nonterminal derives ε: its total null probability, the
/// score of its best null derivation and the rule that derivation starts with.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Null<W> {
    pub probability: W,
    pub viterbi: W,
    pub rule: RuleId,
}

/// An immutable, indexed set of rules bound to one semiring.
///
/// Besides lookup by left-hand side it carries what the chart engine needs
/// precomputed: null probabilities, left corners (for prediction) and unit
/// productions (for completion). Both closures count steps over nullable
/// neighbours, so the engine never completes empty constituents. Grammars are `Send + Sync` and can back any number of
/// concurrent parses.
pub struct Grammar<S: Semiring> {
    semiring: S,
    rules: Vec<Rule<S::Element>>,
    nonterminals: Vec<Category>,
    nt_indices: HashMap<Category, usize>,
    rules_by_lhs: Vec<Vec<RuleId>>,
    terminals: HashSet<Category>,
    null_probabilities: Vec<f64>,
    nulls: Vec<Option<Null<S::Element>>>,
    left_star: StarClosure<S::Element>,
    unit_star: StarClosure<S::Element>,
}

impl<S: Semiring> Grammar<S> {
    pub fn semiring(&self) -> &S {
        &self.semiring
    }

    pub fn rules(&self) -> &[Rule<S::Element>] {
        &self.rules
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule<S::Element>> {
        self.rules.get(id.0)
    }

    pub fn rules_for(&self, lhs: &Category) -> Vec<(RuleId, &Rule<S::Element>)> {
        match self.nt_indices.get(lhs) {
            None => Vec::new(),
            Some(&index) => self.rules_by_lhs[index]
                .iter()
                .map(|&id| (id, &self.rules[id.0]))
                .collect(),
        }
    }

    /// Looks up the id of the rule `lhs → rhs` with exactly this probability.
    pub fn find_rule(&self, probability: f64, lhs: &Category, rhs: &[Category]) -> Option<RuleId> {
        self.rules_for(lhs)
            .into_iter()
            .find(|(_, rule)| rule.probability == probability && rule.rhs.as_slice() == rhs)
            .map(|(id, _)| id)
    }

    pub fn is_terminal(&self, category: &Category) -> bool {
        category.is_terminal()
    }

    pub fn terminals(&self) -> &HashSet<Category> {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &[Category] {
        &self.nonterminals
    }

    /// `R_L(from, to)`: summed probability of `from` deriving a string whose
    /// leftmost symbol is `to`, through any number of left-corner steps.
    pub fn left_star_score(&self, from: &Category, to: &Category) -> Option<S::Element> {
        let from = *self.nt_indices.get(from)?;
        let to = *self.nt_indices.get(to)?;
        self.left_star.score(from, to)
    }

    /// `R_U(from, to)`: summed probability of `from ⇒* to` through unit steps,
    /// where `X → λ Y μ` is a unit step if `λ` and `μ` derive ε.
    pub fn unit_star_score(&self, from: &Category, to: &Category) -> Option<S::Element> {
        let from = *self.nt_indices.get(from)?;
        let to = *self.nt_indices.get(to)?;
        self.unit_star.score(from, to)
    }

    /// Probability that `category` derives the empty string.
    pub fn null_probability(&self, category: &Category) -> f64 {
        self.nt_indices
            .get(category)
            .map_or(0.0, |&index| self.null_probabilities[index])
    }

    pub(crate) fn null(&self, index: usize) -> Option<&Null<S::Element>> {
        self.nulls.get(index).and_then(|null| null.as_ref())
    }

    pub(crate) fn nonterminal_index(&self, category: &Category) -> Option<usize> {
        self.nt_indices.get(category).cloned()
    }

    pub(crate) fn rule_ids_for_index(&self, index: usize) -> &[RuleId] {
        &self.rules_by_lhs[index]
    }

    pub(crate) fn left_star(&self) -> &StarClosure<S::Element> {
        &self.left_star
    }

    pub(crate) fn unit_star(&self) -> &StarClosure<S::Element> {
        &self.unit_star
    }
}

struct PendingRule {
    probability: f64,
    lhs: Category,
    rhs: Vec<Category>,
    error_rule: bool,
}

pub struct GrammarBuilder<S: Semiring> {
    semiring: S,
    rules: Vec<PendingRule>,
}

impl<S: Semiring> GrammarBuilder<S> {
    pub fn new(semiring: S) -> Self {
        GrammarBuilder {
            semiring,
            rules: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, probability: f64, lhs: Category, rhs: Vec<Category>) -> &mut Self {
        self.rules.push(PendingRule {
            probability,
            lhs,
            rhs,
            error_rule: false,
        });
        self
    }

    pub fn add_certain_rule(&mut self, lhs: Category, rhs: Vec<Category>) -> &mut Self {
        self.add_rule(1.0, lhs, rhs)
    }

    /// Registers a (typically very improbable) rule that lets otherwise
    /// unparsable tokens through. The chart engine does not treat it specially.
    pub fn add_error_rule(&mut self, probability: f64, lhs: Category, rhs: Vec<Category>) -> &mut Self {
        self.rules.push(PendingRule {
            probability,
            lhs,
            rhs,
            error_rule: true,
        });
        self
    }

    pub fn from(&mut self, lhs: Category) -> NonTerminalBuilder<S> {
        NonTerminalBuilder { builder: self, lhs }
    }

    pub fn build(self) -> Result<Grammar<S>, BuildError> {
        let semiring = self.semiring;
        let mut seen: HashSet<(Category, Vec<Category>, u64)> = HashSet::new();
        let mut rules: Vec<Rule<S::Element>> = Vec::with_capacity(self.rules.len());

        for pending in self.rules {
            let mut rule = Rule::new(
                pending.probability,
                semiring.zero(),
                pending.lhs,
                pending.rhs,
            );
            rule.error_rule = pending.error_rule;
            check_rule(&rule)?;

            if !seen.insert((rule.lhs.clone(), rule.rhs.clone(), rule.probability.to_bits())) {
                return Err(BuildError::DuplicateRule(rule.to_string()));
            }

            rule.weight = semiring.from_probability(rule.probability);
            rules.push(rule);
        }

        let (nonterminals, nt_indices) = build_nonterminals(&rules);

        let mut rules_by_lhs: Vec<Vec<RuleId>> = vec![Vec::new(); nonterminals.len()];
        for (i, rule) in rules.iter().enumerate() {
            rules_by_lhs[nt_indices[&rule.lhs]].push(RuleId(i));
        }

        let terminals: HashSet<Category> = rules
            .iter()
            .flat_map(|rule| rule.rhs.iter())
            .filter(|symbol| symbol.is_terminal())
            .cloned()
            .collect();

        let null_rules = build_null_rules(&rules, &nt_indices);
        let null_probabilities = nullable::null_probabilities(&null_rules, nonterminals.len())
            .ok_or(BuildError::SingularClosure(ClosureKind::NullDerivation))?;
        let nulls: Vec<Option<Null<S::Element>>> =
            nullable::best_null_derivations(&null_rules, nonterminals.len())
                .into_iter()
                .zip(&null_probabilities)
                .map(|(best, &probability)| match best {
                    Some((viterbi, rule)) if probability > 0.0 => Some(Null {
                        probability: semiring.from_probability(probability),
                        viterbi: semiring.from_probability(viterbi),
                        rule: RuleId(rule),
                    }),
                    _ => None,
                })
                .collect();

        let left_relation = left_corner_relation(&rules, &nt_indices, &null_probabilities);
        let unit_relation = unit_relation(&rules, &nt_indices, &null_probabilities);

        let left_star = StarClosure::compute(&semiring, &left_relation)
            .ok_or(BuildError::SingularClosure(ClosureKind::LeftCorner))?;
        let unit_star = StarClosure::compute(&semiring, &unit_relation)
            .ok_or(BuildError::SingularClosure(ClosureKind::UnitProduction))?;

        debug!(
            "Built grammar with {} rules over {} nonterminals ({} nullable) and {} terminals",
            rules.len(),
            nonterminals.len(),
            nulls.iter().filter(|null| null.is_some()).count(),
            terminals.len()
        );

        Ok(Grammar {
            semiring,
            rules,
            nonterminals,
            nt_indices,
            rules_by_lhs,
            terminals,
            null_probabilities,
            nulls,
            left_star,
            unit_star,
        })
    }
}

fn check_rule<W: Copy>(rule: &Rule<W>) -> Result<(), BuildError> {
    if !rule.probability.is_finite() || rule.probability <= 0.0 || rule.probability > 1.0 {
        return Err(BuildError::InvalidProbability {
            rule: rule.to_string(),
            probability: rule.probability,
        });
    }

    if !rule.lhs.is_nonterminal() {
        return Err(BuildError::NonTerminalLhs(rule.lhs.to_string()));
    }

    if rule.rhs.iter().any(|symbol| *symbol == Category::Start) {
        return Err(BuildError::ReservedStart(rule.to_string()));
    }

    Ok(())
}

fn build_nonterminals<W>(rules: &[Rule<W>]) -> (Vec<Category>, HashMap<Category, usize>) {
    let mut nonterminals: Vec<Category> = Vec::new();
    let mut nt_indices: HashMap<Category, usize> = HashMap::new();

    let symbols = rules.iter().flat_map(|rule| {
        std::iter::once(&rule.lhs).chain(rule.rhs.iter().filter(|s| s.is_nonterminal()))
    });

    for symbol in symbols {
        if !nt_indices.contains_key(symbol) {
            nt_indices.insert(symbol.clone(), nonterminals.len());
            nonterminals.push(symbol.clone());
        }
    }

    (nonterminals, nt_indices)
}

fn build_null_rules<W>(rules: &[Rule<W>], nt_indices: &HashMap<Category, usize>) -> Vec<NullRule> {
    rules
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.rhs.iter().all(|symbol| symbol.is_nonterminal()))
        .map(|(id, rule)| NullRule {
            id,
            lhs: nt_indices[&rule.lhs],
            rhs: rule.rhs.iter().map(|symbol| nt_indices[symbol]).collect(),
            probability: rule.probability,
        })
        .collect()
}

/// Null probability of one right-hand side symbol; terminals never vanish.
fn null_of(symbol: &Category, nt_indices: &HashMap<Category, usize>, nulls: &[f64]) -> f64 {
    match nt_indices.get(symbol) {
        Some(&index) if symbol.is_nonterminal() => nulls[index],
        _ => 0.0,
    }
}

/// `P_L(X, Y)`: for every `X → λ Y μ` with `λ ⇒* ε`, `P(X → λ Y μ) · e(λ)`.
fn left_corner_relation<W>(
    rules: &[Rule<W>],
    nt_indices: &HashMap<Category, usize>,
    nulls: &[f64],
) -> Vec<Vec<f64>> {
    let n = nt_indices.len();
    let mut relation = vec![vec![0.0; n]; n];

    for rule in rules {
        let lhs = nt_indices[&rule.lhs];
        let mut prefix = rule.probability;
        for symbol in &rule.rhs {
            if !symbol.is_nonterminal() {
                break;
            }
            relation[lhs][nt_indices[symbol]] += prefix;
            prefix *= null_of(symbol, nt_indices, nulls);
            if prefix == 0.0 {
                break;
            }
        }
    }

    relation
}

/// `P_U(X, Y)`: for every `X → λ Y μ` with `λ μ ⇒* ε`, `P(X → λ Y μ) · e(λ) · e(μ)`.
fn unit_relation<W>(
    rules: &[Rule<W>],
    nt_indices: &HashMap<Category, usize>,
    nulls: &[f64],
) -> Vec<Vec<f64>> {
    let n = nt_indices.len();
    let mut relation = vec![vec![0.0; n]; n];

    for rule in rules {
        let lhs = nt_indices[&rule.lhs];
        for (i, symbol) in rule.rhs.iter().enumerate() {
            if !symbol.is_nonterminal() {
                continue;
            }
            let rest: f64 = rule
                .rhs
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, other)| null_of(other, nt_indices, nulls))
                .product();
            if rest > 0.0 {
                relation[lhs][nt_indices[symbol]] += rule.probability * rest;
            }
        }
    }

    relation
}

pub struct NonTerminalBuilder<'builder, S: Semiring> {
    builder: &'builder mut GrammarBuilder<S>,
    lhs: Category,
}

impl<'builder, S: Semiring> NonTerminalBuilder<'builder, S> {
    pub fn to(&mut self, probability: f64, rhs: Vec<Category>) -> &mut Self {
        self.builder.add_rule(probability, self.lhs.clone(), rhs);
        self
    }

    pub fn epsilon(&mut self, probability: f64) -> &mut Self {
        self.builder.add_rule(probability, self.lhs.clone(), Vec::new());
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ClosureKind {
    NullDerivation,
    LeftCorner,
    UnitProduction,
}

impl fmt::Display for ClosureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ClosureKind::NullDerivation => write!(f, "null-derivation"),
            ClosureKind::LeftCorner => write!(f, "left-corner"),
            ClosureKind::UnitProduction => write!(f, "unit-production"),
        }
    }
}

#[derive(Debug)]
pub enum BuildError {
    InvalidProbability { rule: String, probability: f64 },
    DuplicateRule(String),
    NonTerminalLhs(String),
    ReservedStart(String),
    SingularClosure(ClosureKind),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            BuildError::InvalidProbability {
                ref rule,
                probability,
            } => write!(
                f,
                "Rule '{}' has probability {}, expected a value in (0, 1]",
                rule, probability
            ),
            BuildError::DuplicateRule(ref rule) => {
                write!(f, "Rule '{}' was added more than once", rule)
            }
            BuildError::NonTerminalLhs(ref symbol) => {
                write!(f, "Left-hand side '{}' is not a nonterminal", symbol)
            }
            BuildError::ReservedStart(ref rule) => {
                write!(f, "Rule '{}' uses the reserved start symbol", rule)
            }
            BuildError::SingularClosure(kind) => write!(
                f,
                "The {} closure does not converge: a cycle carries a probability mass of one or more",
                kind
            ),
        }
    }
}

impl error::Error for BuildError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}
