use std::rc::Rc;

use indexmap::IndexSet;

use super::{
    action::Action,
    literal::{FluentState, State, Symbol},
    Error, Result,
};

/// Everything the planning graph and the search driver need to know about a problem.
pub trait Problem {
    /// Grounded actions of the problem, without persistence actions.
    fn actions_list(&self) -> &[Rc<Action>];
    /// Ordered fluent vocabulary. Encoded states are aligned with it.
    fn state_map(&self) -> &IndexSet<Symbol>;
    fn initial_state(&self) -> &State;
    /// Symbols that must hold in a goal state.
    fn goal(&self) -> &[Symbol];

    fn decode(&self, state: &State) -> Result<FluentState> {
        FluentState::decode(state, self.state_map())
    }

    fn encode(&self, fs: &FluentState) -> Result<State> {
        fs.encode(self.state_map())
    }

    fn holds(&self, state: &State, fluent: &Symbol) -> bool {
        self.state_map()
            .get_index_of(fluent)
            .and_then(|idx| state.get(idx))
            .unwrap_or(false)
    }

    /// Actions whose positive preconditions all hold and whose negative preconditions don't.
    fn actions(&self, state: &State) -> Vec<Rc<Action>> {
        self.actions_list()
            .iter()
            .filter(|action| {
                action.precond_pos.iter().all(|p| self.holds(state, p))
                    && !action.precond_neg.iter().any(|p| self.holds(state, p))
            })
            .cloned()
            .collect()
    }

    /// Applies removals first, then additions.
    ///
    /// Fails with [`Error::StateLength`] if `state` isn't aligned with the state map.
    fn result(&self, state: &State, action: &Action) -> Result<State> {
        let expected = self.state_map().len();
        if state.len() != expected {
            return Err(Error::StateLength { expected, found: state.len() });
        }
        let mut next = state.clone();
        for fluent in &action.effect_rem {
            if let Some(idx) = self.state_map().get_index_of(fluent) {
                next.set(idx, false);
            }
        }
        for fluent in &action.effect_add {
            if let Some(idx) = self.state_map().get_index_of(fluent) {
                next.set(idx, true);
            }
        }
        Ok(next)
    }

    fn goal_test(&self, state: &State) -> bool {
        self.goal().iter().all(|g| self.holds(state, g))
    }
}

/// Plain problem made of an action list, an initial fluent state and a goal.
///
/// The state map is the initial positive fluents followed by the initial negative ones.
#[derive(Debug, Clone)]
pub struct StripsProblem {
    state_map: IndexSet<Symbol>,
    initial: State,
    goal: Vec<Symbol>,
    actions: Vec<Rc<Action>>,
}

impl StripsProblem {
    pub fn new(actions: Vec<Action>, initial: FluentState, goal: Vec<Symbol>) -> Result<Self> {
        let state_map: IndexSet<Symbol> =
            initial.pos.iter().chain(initial.neg.iter()).cloned().collect();
        let initial = initial.encode(&state_map)?;
        let actions = actions.into_iter().map(Rc::new).collect();
        Ok(Self { state_map, initial, goal, actions })
    }
}

impl Problem for StripsProblem {
    fn actions_list(&self) -> &[Rc<Action>] {
        &self.actions
    }

    fn state_map(&self) -> &IndexSet<Symbol> {
        &self.state_map
    }

    fn initial_state(&self) -> &State {
        &self.initial
    }

    fn goal(&self) -> &[Symbol] {
        &self.goal
    }
}
