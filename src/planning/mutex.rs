use tracing::trace;

use super::node::{ActionNode, Level, LiteralNode, PgNode};

/// Which mutex relations the graph computes.
///
/// `enabled = false` skips mutex computation altogether, the remaining flags switch the
/// individual action tests on and off. Literal mutexes (negation and inconsistent
/// support) are always computed while `enabled` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutexConfig {
    pub enabled: bool,
    /// Only one non-persistent action may happen per step.
    pub serial: bool,
    pub inconsistent_effects: bool,
    pub interference: bool,
    pub competing_needs: bool,
}

impl Default for MutexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            serial: true,
            inconsistent_effects: true,
            interference: true,
            competing_needs: true,
        }
    }
}

impl MutexConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            serial: false,
            inconsistent_effects: false,
            interference: false,
            competing_needs: false,
        }
    }

    pub fn with_serial(mut self, serial: bool) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_inconsistent_effects(mut self, on: bool) -> Self {
        self.inconsistent_effects = on;
        self
    }

    pub fn with_interference(mut self, on: bool) -> Self {
        self.interference = on;
        self
    }

    pub fn with_competing_needs(mut self, on: bool) -> Self {
        self.competing_needs = on;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMutex {
    Serial,
    InconsistentEffects,
    Interference,
    CompetingNeeds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralMutex {
    Negation,
    InconsistentSupport,
}

#[derive(Debug, Clone, Copy)]
pub struct MutexEngine {
    config: MutexConfig,
}

fn overlaps<T: PartialEq>(left: &[T], right: &[T]) -> bool {
    left.iter().any(|l| right.contains(l))
}

impl MutexEngine {
    pub fn new(config: MutexConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MutexConfig {
        &self.config
    }

    /// First action test that holds for the pair, in the order serial, inconsistent
    /// effects, interference, competing needs.
    ///
    /// `literals` is the literal level the actions' preconditions live in.
    pub fn action_mutex(
        &self,
        a1: &ActionNode,
        a2: &ActionNode,
        literals: &Level<LiteralNode>,
    ) -> Option<ActionMutex> {
        if self.serialize_actions(a1, a2) {
            Some(ActionMutex::Serial)
        } else if self.inconsistent_effects_mutex(a1, a2) {
            Some(ActionMutex::InconsistentEffects)
        } else if self.interference_mutex(a1, a2) {
            Some(ActionMutex::Interference)
        } else if self.competing_needs_mutex(a1, a2, literals) {
            Some(ActionMutex::CompetingNeeds)
        } else {
            None
        }
    }

    /// Two non-persistent actions in a serial graph.
    pub fn serialize_actions(&self, a1: &ActionNode, a2: &ActionNode) -> bool {
        self.config.serial && !a1.is_persistent() && !a2.is_persistent()
    }

    /// One action removes what the other adds.
    pub fn inconsistent_effects_mutex(&self, a1: &ActionNode, a2: &ActionNode) -> bool {
        if !self.config.inconsistent_effects {
            return false;
        }
        let (a1, a2) = (&a1.action, &a2.action);
        overlaps(&a1.effect_add, &a2.effect_rem) || overlaps(&a2.effect_add, &a1.effect_rem)
    }

    /// An effect of one action negates a precondition of the other.
    pub fn interference_mutex(&self, a1: &ActionNode, a2: &ActionNode) -> bool {
        if !self.config.interference {
            return false;
        }
        let (a1, a2) = (&a1.action, &a2.action);
        overlaps(&a1.effect_add, &a2.precond_neg)
            || overlaps(&a2.effect_add, &a1.precond_neg)
            || overlaps(&a1.effect_rem, &a2.precond_pos)
            || overlaps(&a2.effect_rem, &a1.precond_pos)
    }

    /// Some precondition of one action is mutex with some precondition of the other.
    /// Reads the literal mutexes of `literals`, which must be final.
    pub fn competing_needs_mutex(
        &self,
        a1: &ActionNode,
        a2: &ActionNode,
        literals: &Level<LiteralNode>,
    ) -> bool {
        if !self.config.competing_needs {
            return false;
        }
        a1.parents()
            .iter()
            .any(|p1| a2.parents().iter().any(|p2| literals.is_mutex(*p1, *p2)))
    }

    /// Marks every mutex pair of the action level, returns how many pairs were marked.
    pub fn update_a_mutex(
        &self,
        actions: &mut Level<ActionNode>,
        literals: &Level<LiteralNode>,
    ) -> usize {
        let mut pairs = Vec::new();
        for i in 0..actions.len() {
            for j in (i + 1)..actions.len() {
                let (a1, a2) = (actions.node(i), actions.node(j));
                if let Some(kind) = self.action_mutex(a1, a2, literals) {
                    trace!(left = %a1.action, right = %a2.action, ?kind, "action mutex");
                    pairs.push((i, j));
                }
            }
        }
        for (i, j) in &pairs {
            actions.mutexify(*i, *j);
        }
        pairs.len()
    }

    /// First literal test that holds for the pair. `actions` is the action level that
    /// produced the literals.
    pub fn literal_mutex(
        &self,
        s1: &LiteralNode,
        s2: &LiteralNode,
        actions: &Level<ActionNode>,
    ) -> Option<LiteralMutex> {
        if Self::negation_mutex(s1, s2) {
            Some(LiteralMutex::Negation)
        } else if Self::inconsistent_support_mutex(s1, s2, actions) {
            Some(LiteralMutex::InconsistentSupport)
        } else {
            None
        }
    }

    pub fn negation_mutex(s1: &LiteralNode, s2: &LiteralNode) -> bool {
        s1.literal.symbol == s2.literal.symbol && s1.is_pos() != s2.is_pos()
    }

    /// Every way of producing `s1` is mutex with every way of producing `s2`.
    ///
    /// A literal without producers (only possible in the initial level) is never
    /// inconsistent-support mutex.
    pub fn inconsistent_support_mutex(
        s1: &LiteralNode,
        s2: &LiteralNode,
        actions: &Level<ActionNode>,
    ) -> bool {
        if s1.parents().is_empty() || s2.parents().is_empty() {
            return false;
        }
        s1.parents()
            .iter()
            .all(|p1| s2.parents().iter().all(|p2| actions.is_mutex(*p1, *p2)))
    }

    /// Marks every mutex pair of the literal level, returns how many pairs were marked.
    pub fn update_s_mutex(
        &self,
        literals: &mut Level<LiteralNode>,
        actions: &Level<ActionNode>,
    ) -> usize {
        let mut pairs = Vec::new();
        for i in 0..literals.len() {
            for j in (i + 1)..literals.len() {
                let (s1, s2) = (literals.node(i), literals.node(j));
                if let Some(kind) = self.literal_mutex(s1, s2, actions) {
                    trace!(left = %s1.literal, right = %s2.literal, ?kind, "literal mutex");
                    pairs.push((i, j));
                }
            }
        }
        for (i, j) in &pairs {
            literals.mutexify(*i, *j);
        }
        pairs.len()
    }
}
