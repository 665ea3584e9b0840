//! Cross-reference expansion over the call graph.
//!
//! Two modes share one traversal shape: a FIFO frontier of `(method, depth)`
//! pairs where each method is enqueued at most once. Plain expansion records
//! first-discovery depth. Score propagation pushes a decayed score from each
//! method to its callees and keeps the maximum a method ever receives.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use tracing::debug;

use crate::indexer::callgraph::{CallGraph, MethodTable};
use crate::query::scoring::IntrinsicScorer;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExpansionOptions {
    pub max_depth: usize,
    pub include_callers: bool,
    pub include_callees: bool,
}

impl Default for ExpansionOptions {
    fn default() -> Self {
        Self {
            max_depth: 2,
            include_callers: true,
            include_callees: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Plain expansion
// ---------------------------------------------------------------------------

/// Breadth-first closure of `seeds`, mapping each reached method to the
/// depth it was first discovered at, in discovery order.
///
/// Seeds sit at depth 0. A method at `depth >= max_depth` is recorded but not
/// expanded. With both directions enabled the walk follows callers and
/// callees from every reached method.
pub fn expand(
    graph: &CallGraph,
    seeds: &[usize],
    options: &ExpansionOptions,
) -> IndexMap<usize, usize> {
    let mut reached: IndexMap<usize, usize> = IndexMap::new();
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for &seed in seeds {
        if reached.insert(seed, 0).is_none() {
            queue.push_back((seed, 0));
        }
    }

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= options.max_depth {
            continue;
        }
        let callees: &[usize] = if options.include_callees {
            graph.callees(current)
        } else {
            &[]
        };
        let callers: &[usize] = if options.include_callers {
            graph.callers(current)
        } else {
            &[]
        };
        for &neighbor in callees.iter().chain(callers) {
            if !reached.contains_key(&neighbor) {
                reached.insert(neighbor, depth + 1);
                queue.push_back((neighbor, depth + 1));
            }
        }
    }

    debug!(
        seeds = seeds.len(),
        reached = reached.len(),
        max_depth = options.max_depth,
        "plain expansion finished"
    );
    reached
}

// ---------------------------------------------------------------------------
// Score propagation
// ---------------------------------------------------------------------------

/// Per-call score record. Scores only ever rise.
#[derive(Debug, Default)]
pub struct ScoreBoard {
    scores: IndexMap<usize, u64>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a seed's intrinsic score.
    pub fn seed(&mut self, idx: usize, score: u64) {
        let entry = self.scores.entry(idx).or_insert(score);
        *entry = (*entry).max(score);
    }

    /// Compare-and-set-to-max. Returns true when the stored score increased;
    /// an absent entry counts as zero.
    pub fn raise(&mut self, idx: usize, candidate: u64) -> bool {
        let existing = self.scores.get(&idx).copied().unwrap_or(0);
        if candidate > existing {
            self.scores.insert(idx, candidate);
            true
        } else {
            false
        }
    }

    pub fn get(&self, idx: usize) -> Option<u64> {
        self.scores.get(&idx).copied()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn into_scores(self) -> IndexMap<usize, u64> {
        self.scores
    }
}

/// Score `amount` handed from a method at `depth` to each of its callees.
pub fn decayed_amount(score: u64, factor: f64, depth: usize) -> u64 {
    let exponent = i32::try_from(depth + 1).unwrap_or(i32::MAX);
    (score as f64 * factor.powi(exponent)).floor() as u64
}

/// Propagate intrinsic seed scores down the callee relation.
///
/// A method popped at depth `d < max_depth` hands
/// `floor(score * factor^(d + 1))` to each callee. A callee keeps the
/// maximum it is ever offered and is enqueued only the first time its score
/// rises, so cycles terminate after at most one visit per method.
pub fn propagate_scores(
    table: &MethodTable,
    graph: &CallGraph,
    seeds: &[usize],
    scorer: &dyn IntrinsicScorer,
    propagation_factor: f64,
    max_depth: usize,
) -> IndexMap<usize, u64> {
    let mut board = ScoreBoard::new();
    for &seed in seeds {
        if let Some(method) = table.method(seed) {
            board.seed(seed, scorer.score(method));
        }
    }

    let mut visited: HashSet<usize> = seeds.iter().copied().collect();
    let mut queue: VecDeque<(usize, usize)> = seeds.iter().map(|&s| (s, 0)).collect();

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        let current_score = board.get(current).unwrap_or(0);
        let amount = decayed_amount(current_score, propagation_factor, depth);
        for &callee in graph.callees(current) {
            if board.raise(callee, amount) && visited.insert(callee) {
                debug!(
                    from = current,
                    to = callee,
                    amount,
                    depth = depth + 1,
                    "propagated score"
                );
                queue.push_back((callee, depth + 1));
            }
        }
    }

    debug!(
        seeds = seeds.len(),
        scored = board.len(),
        "score propagation finished"
    );
    board.into_scores()
}
