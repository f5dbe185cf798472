use std::{collections::HashSet, rc::Rc};

use tracing::{debug, debug_span, info, warn};

use super::{
    action::{noop_actions, Action},
    heuristic::{level_sum, max_level, set_level, Cost},
    literal::{FluentState, Literal, State},
    mutex::{MutexConfig, MutexEngine},
    node::{ActionNode, Level, LiteralNode, PgNode},
    problem::Problem,
    timer::{timed, NoopRecorder, Phase, Recorder},
    Error, Result,
};

/// Planning graph for one state of a problem.
///
/// `s_levels[n]` is literal level `n`, `a_levels[n]` is the action level between
/// literal levels `n` and `n + 1`. The graph is built by the constructor and is
/// read-only afterwards; build a new one for every state that needs evaluating.
pub struct PlanningGraph<'p, P: Problem> {
    problem: &'p P,
    fs: FluentState,
    engine: MutexEngine,
    /// Problem actions followed by the persistence actions, as unlinked node prototypes.
    all_actions: Vec<ActionNode>,
    s_levels: Vec<Level<LiteralNode>>,
    a_levels: Vec<Level<ActionNode>>,
}

impl<'p, P: Problem> PlanningGraph<'p, P> {
    pub fn new(problem: &'p P, state: &State, config: MutexConfig) -> Result<Self> {
        Self::with_recorder(problem, state, config, &mut NoopRecorder)
    }

    pub fn with_recorder(
        problem: &'p P,
        state: &State,
        config: MutexConfig,
        recorder: &mut dyn Recorder,
    ) -> Result<Self> {
        let fs = problem.decode(state)?;
        Self::from_fluents(problem, fs, config, recorder)
    }

    /// Builds the graph from an already decoded state.
    pub fn from_fluents(
        problem: &'p P,
        fs: FluentState,
        config: MutexConfig,
        recorder: &mut dyn Recorder,
    ) -> Result<Self> {
        let all_actions: Vec<ActionNode> = timed(recorder, Phase::NoopActions, || {
            problem
                .actions_list()
                .iter()
                .cloned()
                .chain(noop_actions(problem.state_map()))
                .map(ActionNode::new)
                .collect()
        });
        let mut graph = Self {
            problem,
            fs,
            engine: MutexEngine::new(config),
            all_actions,
            s_levels: Vec::new(),
            a_levels: Vec::new(),
        };
        graph.create_graph(recorder)?;
        Ok(graph)
    }

    /// Alternates action and literal levels until two consecutive literal levels hold
    /// the same literals.
    ///
    /// Only runs once per graph: calling it on a built graph returns [`Error::AlreadyBuilt`].
    pub fn create_graph(&mut self, recorder: &mut dyn Recorder) -> Result<()> {
        if !self.s_levels.is_empty() || !self.a_levels.is_empty() {
            return Err(Error::AlreadyBuilt);
        }
        let _span = debug_span!("create_graph", fluents = self.problem.state_map().len()).entered();
        let start = std::time::Instant::now();

        // S0 holds the literals of the state, without parents or mutexes.
        let mut s0 = Level::new();
        for literal in self.fs.literals() {
            s0.insert(LiteralNode::new(literal));
        }
        self.s_levels.push(s0);

        let max_levels = self.literal_universe() + 1;
        let mut level = 0;
        loop {
            timed(recorder, Phase::ActionLevel, || self.add_action_level(level));
            if self.engine.config().enabled {
                let pairs = timed(recorder, Phase::ActionMutex, || {
                    self.engine.update_a_mutex(&mut self.a_levels[level], &self.s_levels[level])
                });
                let actions = self.a_levels[level].len();
                debug!(level, actions, mutex_pairs = pairs, "action level");
            } else {
                debug!(level, actions = self.a_levels[level].len(), "action level");
            }

            level += 1;
            timed(recorder, Phase::LiteralLevel, || self.add_literal_level(level));
            if self.engine.config().enabled {
                let pairs = timed(recorder, Phase::LiteralMutex, || {
                    self.engine.update_s_mutex(&mut self.s_levels[level], &self.a_levels[level - 1])
                });
                let literals = self.s_levels[level].len();
                debug!(level, literals, mutex_pairs = pairs, "literal level");
            } else {
                debug!(level, literals = self.s_levels[level].len(), "literal level");
            }

            if self.s_levels[level].same_nodes(&self.s_levels[level - 1]) {
                let literals = self.s_levels[level].len();
                info!(levels = level, literals, "planning graph leveled off");
                break;
            }
            // Literals outside the state map have no persistence action and can make
            // the levels cycle instead of settling.
            if level >= max_levels {
                warn!(levels = level, "planning graph did not level off");
                break;
            }
        }
        recorder.record(Phase::CreateGraph, start.elapsed());
        Ok(())
    }

    /// Distinct literals the graph could ever contain.
    fn literal_universe(&self) -> usize {
        let mut universe: HashSet<Literal> = self.fs.literals().collect();
        for node in &self.all_actions {
            universe.extend(node.effnodes().iter().cloned());
        }
        universe.len()
    }

    /// Builds action level `level` out of every action whose preconditions are all in
    /// literal level `level`, and links it to those literals.
    fn add_action_level(&mut self, level: usize) {
        let literals = &mut self.s_levels[level];
        let mut actions = Level::new();
        for prototype in &self.all_actions {
            let parents: Option<Vec<usize>> =
                prototype.prenodes().iter().map(|p| literals.index_of(p)).collect();
            if let Some(parents) = parents {
                let a_idx = actions.insert(prototype.detached());
                for s_idx in parents {
                    actions.node_mut(a_idx).links_mut().parents.insert(s_idx);
                    literals.node_mut(s_idx).links_mut().children.insert(a_idx);
                }
            }
        }
        self.a_levels.push(actions);
    }

    /// Builds literal level `level` out of the effects of action level `level - 1`,
    /// linking every literal to all the actions producing it.
    fn add_literal_level(&mut self, level: usize) {
        let actions = &mut self.a_levels[level - 1];
        let mut literals = Level::new();
        let mut produced = Vec::new();
        for (a_idx, action) in actions.iter().enumerate() {
            for effect in action.effnodes() {
                let s_idx = literals.insert(LiteralNode::new(effect.clone()));
                literals.node_mut(s_idx).links_mut().parents.insert(a_idx);
                produced.push((a_idx, s_idx));
            }
        }
        for (a_idx, s_idx) in produced {
            actions.node_mut(a_idx).links_mut().children.insert(s_idx);
        }
        self.s_levels.push(literals);
    }

    pub fn problem(&self) -> &P {
        self.problem
    }

    pub fn fluents(&self) -> &FluentState {
        &self.fs
    }

    pub fn config(&self) -> &MutexConfig {
        self.engine.config()
    }

    /// Grounded actions plus persistence actions the graph was built from.
    pub fn all_actions(&self) -> impl Iterator<Item = &Rc<Action>> {
        self.all_actions.iter().map(|node| &node.action)
    }

    pub fn s_levels(&self) -> &[Level<LiteralNode>] {
        &self.s_levels
    }

    pub fn a_levels(&self) -> &[Level<ActionNode>] {
        &self.a_levels
    }

    /// Sum of the first levels of the problem's goal literals. See [`level_sum`].
    pub fn h_levelsum(&self) -> Cost {
        level_sum(&self.s_levels, self.problem.goal())
    }

    pub fn h_maxlevel(&self) -> Cost {
        max_level(&self.s_levels, self.problem.goal())
    }

    pub fn h_setlevel(&self) -> Cost {
        set_level(&self.s_levels, self.problem.goal())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::PlanningGraph;
    use crate::{
        air_cargo::{air_cargo_p1, at, AirCargoProblem},
        planning::{
            heuristic::Cost,
            literal::{symbol, FluentState, Literal, State, Symbol},
            mutex::MutexConfig,
            node::{Level, PgNode},
            problem::{tests::have_cake, Problem},
            timer::{NoopRecorder, Phase, TimingRecorder},
            Error,
        },
    };

    fn literal_index<N>(level: &Level<N>, name: &str, is_pos: bool) -> usize
    where
        N: PgNode<Key = Literal>,
    {
        level.index_of(&Literal::new(symbol(name), is_pos)).unwrap()
    }

    fn action_index<P: Problem>(graph: &PlanningGraph<P>, level: usize, name: &str) -> usize {
        let actions = &graph.a_levels()[level];
        (0..actions.len()).find(|i| actions.node(*i).action.name == name).unwrap()
    }

    fn two_by_two(init: FluentState, goal: Vec<Symbol>) -> AirCargoProblem {
        AirCargoProblem::new(&["C1", "C2"], &["P1", "P2"], &["JFK", "SFO"], init, goal).unwrap()
    }

    fn assert_symmetric<N: PgNode>(level: &Level<N>) {
        for i in 0..level.len() {
            assert!(!level.node(i).mutex().contains(&i));
            for j in level.node(i).mutex() {
                assert!(level.node(*j).mutex().contains(&i), "mutex {} -> {} is one-sided", i, j);
            }
        }
    }

    #[test]
    fn test_have_cake_levels() {
        let p = have_cake();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        assert_eq!(pg.s_levels()[0].len(), 2);
        assert_eq!(pg.a_levels()[0].len(), 3); // Eat plus two persistence actions
        assert_eq!(pg.s_levels()[1].len(), 4);
        assert_eq!(pg.a_levels()[1].len(), 6);
        assert_eq!(pg.s_levels().len(), 3);
        assert!(pg.s_levels()[2].same_nodes(&pg.s_levels()[1]));
    }

    #[test]
    fn test_have_cake_mutexes() {
        let p = have_cake();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        let a0 = &pg.a_levels()[0];
        let eat = action_index(&pg, 0, "Eat(Cake)");
        let keep_have = action_index(&pg, 0, "Noop_pos(Have(Cake))");
        let keep_not_eaten = action_index(&pg, 0, "Noop_neg(Eaten(Cake))");
        assert!(a0.is_mutex(eat, keep_have));
        assert!(a0.is_mutex(eat, keep_not_eaten));
        assert!(!a0.is_mutex(keep_have, keep_not_eaten));

        let s1 = &pg.s_levels()[1];
        let have = literal_index(s1, "Have(Cake)", true);
        let not_have = literal_index(s1, "Have(Cake)", false);
        let eaten = literal_index(s1, "Eaten(Cake)", true);
        let not_eaten = literal_index(s1, "Eaten(Cake)", false);
        assert!(s1.is_mutex(have, not_have));
        assert!(s1.is_mutex(eaten, not_eaten));
        assert!(s1.is_mutex(have, eaten));
        assert!(s1.is_mutex(not_have, not_eaten));
        assert!(!s1.is_mutex(not_have, eaten));
        assert!(!s1.is_mutex(have, not_eaten));
    }

    #[test]
    fn test_links_are_bidirectional() {
        let p = have_cake();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        for (n, actions) in pg.a_levels().iter().enumerate() {
            let before = &pg.s_levels()[n];
            let after = &pg.s_levels()[n + 1];
            for a_idx in 0..actions.len() {
                let action = actions.node(a_idx);
                assert_eq!(action.parents().len(), action.prenodes().len());
                for s_idx in action.parents() {
                    assert!(before.node(*s_idx).children().contains(&a_idx));
                }
                for s_idx in action.children() {
                    assert!(after.node(*s_idx).parents().contains(&a_idx));
                    assert!(action.effnodes().contains(&after.node(*s_idx).literal));
                }
            }
        }
    }

    #[test]
    fn test_have_cake_heuristics() {
        let p = have_cake();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        assert_eq!(pg.h_levelsum(), Cost::Finite(1));
        assert_eq!(pg.h_maxlevel(), Cost::Finite(1));
        assert_eq!(pg.h_setlevel(), Cost::Finite(2));
    }

    #[test]
    fn test_rebuild_is_an_error() {
        let p = have_cake();
        let mut pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        let levels = pg.s_levels().len();
        assert_eq!(pg.create_graph(&mut NoopRecorder), Err(Error::AlreadyBuilt));
        assert_eq!(pg.s_levels().len(), levels);
    }

    #[test]
    fn test_decode_error() {
        let p = have_cake();
        let state: State = "TFT".parse().unwrap();
        assert_eq!(
            PlanningGraph::new(&p, &state, MutexConfig::default()).err(),
            Some(Error::StateLength { expected: 2, found: 3 })
        );
    }

    #[test]
    fn test_air_cargo_levels_off() {
        let p = air_cargo_p1().unwrap();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        assert_eq!(pg.s_levels().len(), 4);
        assert_eq!(pg.a_levels().len(), 3);
        assert_eq!(pg.s_levels()[2].len(), 2 * p.state_map().len());
        assert_eq!(pg.h_levelsum(), Cost::Finite(4));
    }

    #[test]
    fn test_negation_mutex() {
        let p = air_cargo_p1().unwrap();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        for level in &pg.s_levels()[1..] {
            let pos = literal_index(level, "At(C1, SFO)", true);
            let neg = literal_index(level, "At(C1, SFO)", false);
            assert!(level.is_mutex(pos, neg));
        }
        assert_eq!(pg.s_levels()[0].mutex_pairs(), 0);
    }

    #[test]
    fn test_serial_fly_actions() {
        let p = air_cargo_p1().unwrap();
        let serial_only = MutexConfig::default()
            .with_inconsistent_effects(false)
            .with_interference(false)
            .with_competing_needs(false);
        let pg = PlanningGraph::new(&p, p.initial_state(), serial_only).unwrap();
        let fly1 = action_index(&pg, 0, "Fly(P1, SFO, JFK)");
        let fly2 = action_index(&pg, 0, "Fly(P2, JFK, SFO)");
        assert!(pg.a_levels()[0].is_mutex(fly1, fly2));

        let parallel_config = MutexConfig::default().with_serial(false);
        let parallel = PlanningGraph::new(&p, p.initial_state(), parallel_config).unwrap();
        let fly1 = action_index(&parallel, 0, "Fly(P1, SFO, JFK)");
        let fly2 = action_index(&parallel, 0, "Fly(P2, JFK, SFO)");
        assert!(!parallel.a_levels()[0].is_mutex(fly1, fly2));
    }

    #[test]
    fn test_serial_marks_every_real_pair() {
        let p = air_cargo_p1().unwrap();
        let serial_only = MutexConfig::default()
            .with_inconsistent_effects(false)
            .with_interference(false)
            .with_competing_needs(false);
        let pg = PlanningGraph::new(&p, p.initial_state(), serial_only).unwrap();
        for actions in pg.a_levels() {
            for i in 0..actions.len() {
                for j in (i + 1)..actions.len() {
                    let both_real =
                        !actions.node(i).is_persistent() && !actions.node(j).is_persistent();
                    assert_eq!(actions.is_mutex(i, j), both_real);
                }
            }
        }
    }

    #[test]
    fn test_no_action_mutex_when_all_tests_off() {
        let p = air_cargo_p1().unwrap();
        let none = MutexConfig::default()
            .with_serial(false)
            .with_inconsistent_effects(false)
            .with_interference(false)
            .with_competing_needs(false);
        let pg = PlanningGraph::new(&p, p.initial_state(), none).unwrap();
        for actions in pg.a_levels() {
            assert_eq!(actions.mutex_pairs(), 0);
        }
        // literal mutexes are still there
        assert!(pg.s_levels()[1].mutex_pairs() > 0);
    }

    #[test]
    fn test_disabled_mutexes() {
        let p = air_cargo_p1().unwrap();
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::disabled()).unwrap();
        assert!(pg.a_levels().iter().all(|l| l.mutex_pairs() == 0));
        assert!(pg.s_levels().iter().all(|l| l.mutex_pairs() == 0));
        assert_eq!(pg.h_levelsum(), Cost::Finite(4));
    }

    #[test]
    fn test_set_level_needs_parallel_unloads() {
        let p = air_cargo_p1().unwrap();
        let config = MutexConfig::default().with_serial(false);
        let pg = PlanningGraph::new(&p, p.initial_state(), config).unwrap();
        assert_eq!(pg.h_setlevel(), Cost::Finite(2));
    }

    #[test]
    fn test_goal_already_true() {
        let p1 = air_cargo_p1().unwrap();
        let init = p1.decode(p1.initial_state()).unwrap();
        let goal = vec![at("C1", "SFO"), at("P2", "JFK")];
        let p = two_by_two(init, goal);
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        assert_eq!(pg.h_levelsum(), Cost::Finite(0));
    }

    #[test]
    fn test_unreachable_goal() {
        let p1 = air_cargo_p1().unwrap();
        let init = p1.decode(p1.initial_state()).unwrap();
        let p = two_by_two(init, vec![at("C1", "JFK"), at("C1", "ORD")]);
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        assert_eq!(pg.h_levelsum(), Cost::Infinite);
    }

    #[test]
    fn test_known_fluent_nothing_adds() {
        let p1 = air_cargo_p1().unwrap();
        let mut init = p1.decode(p1.initial_state()).unwrap();
        init.neg.push(at("C1", "ORD"));
        let p = two_by_two(init, vec![at("C1", "JFK"), at("C1", "ORD")]);
        assert!(p.state_map().contains(&at("C1", "ORD")));
        let pg = PlanningGraph::new(&p, p.initial_state(), MutexConfig::default()).unwrap();
        let unreachable = Literal::pos(&at("C1", "ORD"));
        assert!(pg.s_levels().iter().all(|level| !level.contains(&unreachable)));
        // the negative literal persists through every level
        let stays = Literal::neg(&at("C1", "ORD"));
        assert!(pg.s_levels().iter().all(|level| level.contains(&stays)));
        assert_eq!(pg.h_levelsum(), Cost::Infinite);
        assert_eq!(pg.h_maxlevel(), Cost::Infinite);
        assert_eq!(pg.h_setlevel(), Cost::Infinite);
        assert!(!pg.h_levelsum().is_finite());
    }

    #[test]
    fn test_recorder_sees_every_phase() {
        let p = have_cake();
        let mut recorder = TimingRecorder::new();
        let config = MutexConfig::default();
        let state = p.initial_state();
        let pg = PlanningGraph::with_recorder(&p, state, config, &mut recorder).unwrap();
        let iterations = pg.a_levels().len();
        assert_eq!(recorder.count(Phase::NoopActions), 1);
        assert_eq!(recorder.count(Phase::CreateGraph), 1);
        assert_eq!(recorder.count(Phase::ActionLevel), iterations);
        assert_eq!(recorder.count(Phase::LiteralMutex), iterations);
    }

    #[test]
    fn test_fresh_fluent_state() {
        let p = have_cake();
        let fs = FluentState::new(Vec::new(), vec![symbol("Have(Cake)"), symbol("Eaten(Cake)")]);
        let config = MutexConfig::default();
        let pg = PlanningGraph::from_fluents(&p, fs.clone(), config, &mut NoopRecorder).unwrap();
        assert_eq!(pg.fluents(), &fs);
        assert_eq!(pg.problem().goal(), p.goal());
        assert_eq!(pg.config(), &MutexConfig::default());
        // Eat, Bake and one persistence action per polarity of each fluent
        assert_eq!(pg.all_actions().count(), 2 + 2 * 2);
        assert_eq!(pg.all_actions().filter(|a| a.name.starts_with("Noop_")).count(), 4);
        // Bake, then Eat
        assert_eq!(pg.h_levelsum(), Cost::Finite(3));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 24,
            failure_persistence: None,
            ..ProptestConfig::default()
        })]

        #[test]
        fn prop_levels_grow_and_mutexes_are_symmetric(
            fluents in proptest::collection::vec(any::<bool>(), 12),
            serial in any::<bool>(),
        ) {
            let p = air_cargo_p1().unwrap();
            let state = State::new(fluents);
            let config = MutexConfig::default().with_serial(serial);
            let pg = PlanningGraph::new(&p, &state, config).unwrap();
            let universe = 2 * p.state_map().len();
            prop_assert!(pg.a_levels().len() <= universe + 1);
            prop_assert_eq!(pg.s_levels().len(), pg.a_levels().len() + 1);
            for pair in pg.s_levels().windows(2) {
                prop_assert!(pair[0].is_subset(&pair[1]));
            }
            let last = pg.s_levels().len() - 1;
            prop_assert!(pg.s_levels()[last].same_nodes(&pg.s_levels()[last - 1]));
            pg.s_levels().iter().for_each(assert_symmetric);
            pg.a_levels().iter().for_each(assert_symmetric);
        }
    }
}
