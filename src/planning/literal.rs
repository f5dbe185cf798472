use std::{fmt, rc::Rc, str::FromStr};

use indexmap::IndexSet;

use super::{Error, Result};

/// Opaque proposition identifier, e.g. `At(C1, SFO)`.
pub type Symbol = Rc<str>;

pub fn symbol(name: &str) -> Symbol {
    Rc::from(name)
}

/// A signed proposition. Two literals are equal iff symbol and polarity match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    pub symbol: Symbol,
    pub is_pos: bool,
}

impl Literal {
    pub fn new(symbol: Symbol, is_pos: bool) -> Self {
        Self { symbol, is_pos }
    }

    pub fn pos(symbol: &Symbol) -> Self {
        Self::new(Rc::clone(symbol), true)
    }

    pub fn neg(symbol: &Symbol) -> Self {
        Self::new(Rc::clone(symbol), false)
    }

    pub fn negated(&self) -> Self {
        Self::new(Rc::clone(&self.symbol), !self.is_pos)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_pos {
            write!(f, "{}", self.symbol)
        } else {
            write!(f, "~{}", self.symbol)
        }
    }
}

/// Fixed-length truth assignment aligned with a problem's state map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Vec<bool>);

impl State {
    pub fn new(fluents: Vec<bool>) -> Self {
        Self(fluents)
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<bool> {
        self.0.get(idx).copied()
    }

    #[inline]
    pub fn set(&mut self, idx: usize, value: bool) {
        self.0[idx] = value
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fluents(&self) -> &[bool] {
        &self.0
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for fluent in &self.0 {
            write!(f, "{}", if *fluent { 'T' } else { 'F' })?;
        }
        Ok(())
    }
}

impl FromStr for State {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.chars()
            .map(|c| match c {
                'T' => Ok(true),
                'F' => Ok(false),
                c => Err(Error::InvalidFluent(c)),
            })
            .collect::<Result<Vec<_>>>()
            .map(State)
    }
}

/// A state split into the symbols that hold and the symbols that do not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FluentState {
    pub pos: Vec<Symbol>,
    pub neg: Vec<Symbol>,
}

impl FluentState {
    pub fn new(pos: Vec<Symbol>, neg: Vec<Symbol>) -> Self {
        Self { pos, neg }
    }

    pub fn literals(&self) -> impl Iterator<Item = Literal> + '_ {
        self.pos
            .iter()
            .map(Literal::pos)
            .chain(self.neg.iter().map(Literal::neg))
    }

    /// Symbols of the state map listed in `pos` encode as `T`, everything else as `F`.
    pub fn encode(&self, state_map: &IndexSet<Symbol>) -> Result<State> {
        if let Some(unknown) = self
            .pos
            .iter()
            .chain(self.neg.iter())
            .find(|s| !state_map.contains(*s))
        {
            return Err(Error::UnknownSymbol(Rc::clone(unknown)));
        }
        let mut fluents = vec![false; state_map.len()];
        for s in &self.pos {
            if let Some(idx) = state_map.get_index_of(s) {
                fluents[idx] = true;
            }
        }
        Ok(State(fluents))
    }

    pub fn decode(state: &State, state_map: &IndexSet<Symbol>) -> Result<Self> {
        if state.len() != state_map.len() {
            return Err(Error::StateLength {
                expected: state_map.len(),
                found: state.len(),
            });
        }
        let mut fs = FluentState::default();
        for (s, fluent) in state_map.iter().zip(state.fluents()) {
            if *fluent {
                fs.pos.push(Rc::clone(s));
            } else {
                fs.neg.push(Rc::clone(s));
            }
        }
        Ok(fs)
    }
}
