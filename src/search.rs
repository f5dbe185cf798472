use std::{
    cmp::Reverse,
    collections::HashMap,
    fmt,
    rc::Rc,
    time::Instant,
};

use priority_queue::PriorityQueue;
use tracing::{debug, info, info_span};

use crate::planning::{
    Action, Cost, MutexConfig, Phase, PlanningGraph, Problem, Recorder, Result, State,
    TimingRecorder,
};

/// State evaluation used to order the A* frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heuristic {
    /// 1 for every state, which turns A* into uniform cost search.
    Constant,
    /// Number of goal symbols that don't hold yet.
    IgnorePreconditions,
    /// Level sum of a planning graph built for the state. Not admissible.
    LevelSum(MutexConfig),
}

impl fmt::Display for Heuristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Heuristic::Constant => write!(f, "h_1"),
            Heuristic::IgnorePreconditions => write!(f, "h_ignore_preconditions"),
            Heuristic::LevelSum(_) => write!(f, "h_pg_levelsum"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    /// Actions in execution order.
    pub actions: Vec<Rc<Action>>,
    /// Number of states popped from the frontier.
    pub expanded: usize,
    /// Number of distinct states the search generated.
    pub generated: usize,
}

impl Solution {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Plan length: {}, expanded: {}, generated: {}",
            self.len(),
            self.expanded,
            self.generated
        )?;
        for action in &self.actions {
            writeln!(f, "{}", action)?;
        }
        Ok(())
    }
}

/// A* over encoded states of a problem, with unit step costs.
///
/// Heuristic values are cached per state. States the heuristic rates `Infinite`
/// are never put on the frontier.
pub struct Searcher<'p, P: Problem> {
    problem: &'p P,
    heuristic: Heuristic,
    cache: HashMap<State, Cost>,
    recorder: TimingRecorder,
}

impl<'p, P: Problem> Searcher<'p, P> {
    pub fn new(problem: &'p P, heuristic: Heuristic) -> Self {
        Self { problem, heuristic, cache: HashMap::new(), recorder: TimingRecorder::new() }
    }

    pub fn recorder(&self) -> &TimingRecorder {
        &self.recorder
    }

    pub fn heuristic(&self) -> &Heuristic {
        &self.heuristic
    }

    pub fn h(&mut self, state: &State) -> Result<Cost> {
        if let Some(cost) = self.cache.get(state) {
            return Ok(*cost);
        }
        let cost = match &self.heuristic {
            Heuristic::Constant => Cost::Finite(1),
            Heuristic::IgnorePreconditions => {
                let problem = self.problem;
                Cost::Finite(problem.goal().iter().filter(|g| !problem.holds(state, g)).count())
            }
            Heuristic::LevelSum(config) => {
                let start = Instant::now();
                let pg =
                    PlanningGraph::with_recorder(self.problem, state, *config, &mut self.recorder)?;
                let cost = pg.h_levelsum();
                self.recorder.record(Phase::LevelSum, start.elapsed());
                cost
            }
        };
        self.cache.insert(state.clone(), cost);
        Ok(cost)
    }

    pub fn astar(&mut self) -> Result<Option<Solution>> {
        let span = info_span!("astar", heuristic = %self.heuristic);
        let _enter = span.enter();

        let start = self.problem.initial_state().clone();
        let start_h = match self.h(&start)?.finite() {
            Some(h) => h,
            None => {
                info!("goal unreachable from the initial state");
                return Ok(None);
            }
        };
        let mut open_set = PriorityQueue::new();
        let mut came_from: HashMap<State, (State, Rc<Action>)> = HashMap::new();
        let mut g_score = HashMap::new();
        open_set.push(start.clone(), Reverse(start_h));
        g_score.insert(start, 0usize);
        let mut expanded = 0;

        while let Some((current, _)) = open_set.pop() {
            if self.problem.goal_test(&current) {
                let actions = reconstruct_path(&came_from, &current);
                let generated = g_score.len();
                info!(plan_length = actions.len(), expanded, generated, "solution found");
                return Ok(Some(Solution { actions, expanded, generated }));
            }
            expanded += 1;
            let current_g = g_score.get(&current).copied().unwrap_or(0);
            for action in self.problem.actions(&current) {
                let next = self.problem.result(&current, &action)?;
                let tentative_g = current_g + 1;
                if g_score.get(&next).map_or(false, |g| tentative_g >= *g) {
                    continue;
                }
                let h = match self.h(&next)?.finite() {
                    Some(h) => h,
                    None => continue,
                };
                came_from.insert(next.clone(), (current.clone(), action));
                g_score.insert(next.clone(), tentative_g);
                open_set.push(next, Reverse(tentative_g + h));
            }
            if expanded % 1000 == 0 {
                debug!(expanded, frontier = open_set.len(), "search progress");
            }
        }
        info!(expanded, "frontier exhausted without reaching the goal");
        Ok(None)
    }
}

fn reconstruct_path(
    came_from: &HashMap<State, (State, Rc<Action>)>,
    current: &State,
) -> Vec<Rc<Action>> {
    let mut total_path = Vec::new();
    let mut current = current;
    while let Some((prev, action)) = came_from.get(current) {
        total_path.push(action.clone());
        current = prev;
    }
    total_path.reverse();
    total_path
}

/// Runs A* from the initial state of `problem`.
pub fn astar<P: Problem>(problem: &P, heuristic: Heuristic) -> Result<Option<Solution>> {
    Searcher::new(problem, heuristic).astar()
}
