use std::{collections::BTreeSet, fmt, rc::Rc};

use super::literal::{Literal, Symbol};

/// A grounded (variable free) STRIPS action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub name: String,
    pub precond_pos: Vec<Symbol>,
    pub precond_neg: Vec<Symbol>,
    pub effect_add: Vec<Symbol>,
    pub effect_rem: Vec<Symbol>,
}

impl Action {
    /// `precond` and `effect` are `(positive, negative)` symbol lists.
    pub fn new(
        name: impl Into<String>,
        precond: (Vec<Symbol>, Vec<Symbol>),
        effect: (Vec<Symbol>, Vec<Symbol>),
    ) -> Self {
        Self {
            name: name.into(),
            precond_pos: precond.0,
            precond_neg: precond.1,
            effect_add: effect.0,
            effect_rem: effect.1,
        }
    }

    pub fn preconditions(&self) -> BTreeSet<Literal> {
        self.precond_pos
            .iter()
            .map(Literal::pos)
            .chain(self.precond_neg.iter().map(Literal::neg))
            .collect()
    }

    pub fn effects(&self) -> BTreeSet<Literal> {
        self.effect_add
            .iter()
            .map(Literal::pos)
            .chain(self.effect_rem.iter().map(Literal::neg))
            .collect()
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Persistence actions for every fluent of the state map.
///
/// `Noop_pos(s)` needs `s` and adds it again, `Noop_neg(s)` needs `~s` and removes it
/// again. They only exist inside the planning graph and carry a literal unchanged from
/// one literal level to the next.
pub fn noop_actions<'a, I>(state_map: I) -> Vec<Rc<Action>>
where
    I: IntoIterator<Item = &'a Symbol>,
{
    let mut actions = Vec::new();
    for fluent in state_map {
        actions.push(Rc::new(Action::new(
            format!("Noop_pos({})", fluent),
            (vec![Rc::clone(fluent)], Vec::new()),
            (vec![Rc::clone(fluent)], Vec::new()),
        )));
        actions.push(Rc::new(Action::new(
            format!("Noop_neg({})", fluent),
            (Vec::new(), vec![Rc::clone(fluent)]),
            (Vec::new(), vec![Rc::clone(fluent)]),
        )));
    }
    actions
}
