use std::{collections::BTreeSet, fmt, iter::Sum, ops::Add};

use super::{
    literal::{Literal, Symbol},
    node::{Level, LiteralNode},
};

/// Estimated distance to the goal. Every finite cost orders below `Infinite`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cost {
    Finite(usize),
    /// The goal can't be reached from the state the graph was built for.
    Infinite,
}

impl Cost {
    pub fn is_finite(&self) -> bool {
        matches!(self, Cost::Finite(_))
    }

    pub fn finite(&self) -> Option<usize> {
        match self {
            Cost::Finite(n) => Some(*n),
            Cost::Infinite => None,
        }
    }
}

impl Add for Cost {
    type Output = Cost;

    fn add(self, rhs: Cost) -> Cost {
        match (self, rhs) {
            (Cost::Finite(l), Cost::Finite(r)) => Cost::Finite(l.saturating_add(r)),
            _ => Cost::Infinite,
        }
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Cost>>(iter: I) -> Cost {
        iter.fold(Cost::Finite(0), Add::add)
    }
}

impl From<Option<usize>> for Cost {
    fn from(level: Option<usize>) -> Self {
        level.map_or(Cost::Infinite, Cost::Finite)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Finite(n) => write!(f, "{}", n),
            Cost::Infinite => write!(f, "inf"),
        }
    }
}

/// Index of the first literal level holding `literal`.
pub fn first_level(s_levels: &[Level<LiteralNode>], literal: &Literal) -> Option<usize> {
    s_levels.iter().position(|level| level.contains(literal))
}

// Repeated goal symbols only count once.
fn unique_goals(goal: &[Symbol]) -> BTreeSet<Literal> {
    goal.iter().map(Literal::pos).collect()
}

/// Sum over the goal symbols of the first level each one appears positively in.
///
/// Mutexes between the goal literals are ignored.
pub fn level_sum(s_levels: &[Level<LiteralNode>], goal: &[Symbol]) -> Cost {
    unique_goals(goal)
        .iter()
        .map(|g| Cost::from(first_level(s_levels, g)))
        .sum()
}

/// Largest first level over the goal symbols.
pub fn max_level(s_levels: &[Level<LiteralNode>], goal: &[Symbol]) -> Cost {
    unique_goals(goal)
        .iter()
        .map(|g| Cost::from(first_level(s_levels, g)))
        .max()
        .unwrap_or(Cost::Finite(0))
}

/// First level holding every goal literal with no two of them mutex.
///
/// Without mutexes in the graph this is the same as [`max_level`].
pub fn set_level(s_levels: &[Level<LiteralNode>], goal: &[Symbol]) -> Cost {
    let goals = unique_goals(goal);
    for (idx, level) in s_levels.iter().enumerate() {
        let found: Option<Vec<usize>> = goals.iter().map(|g| level.index_of(g)).collect();
        if let Some(found) = found {
            let independent = found
                .iter()
                .enumerate()
                .all(|(i, a)| found[i + 1..].iter().all(|b| !level.is_mutex(*a, *b)));
            if independent {
                return Cost::Finite(idx);
            }
        }
    }
    Cost::Infinite
}

#[cfg(test)]
mod tests {
    use super::{level_sum, max_level, set_level, Cost};
    use crate::planning::{
        literal::{symbol, Literal},
        node::{Level, LiteralNode},
    };

    fn levels() -> Vec<Level<LiteralNode>> {
        let (x, y, z) = (symbol("X"), symbol("Y"), symbol("Z"));
        let mut s0 = Level::new();
        s0.insert(LiteralNode::new(Literal::pos(&x)));
        s0.insert(LiteralNode::new(Literal::neg(&y)));
        s0.insert(LiteralNode::new(Literal::neg(&z)));
        let mut s1 = s0.clone();
        let xi = s1.index_of(&Literal::pos(&x)).unwrap();
        let yi = s1.insert(LiteralNode::new(Literal::pos(&y)));
        s1.mutexify(xi, yi);
        let mut s2 = s0.clone();
        s2.insert(LiteralNode::new(Literal::pos(&y)));
        s2.insert(LiteralNode::new(Literal::pos(&z)));
        vec![s0, s1, s2]
    }

    #[test]
    fn test_cost_ordering() {
        assert!(Cost::Finite(usize::MAX) < Cost::Infinite);
        assert_eq!(Cost::Finite(2) + Cost::Finite(3), Cost::Finite(5));
        assert_eq!(Cost::Finite(2) + Cost::Infinite, Cost::Infinite);
        let total: Cost = vec![Cost::Finite(1), Cost::Finite(1)].into_iter().sum();
        assert_eq!(total, Cost::Finite(2));
        assert!(total.is_finite());
        assert!(!Cost::Infinite.is_finite());
        assert_eq!(Cost::Infinite.to_string(), "inf");
    }

    #[test]
    fn test_level_sum() {
        let l = levels();
        assert_eq!(level_sum(&l, &[symbol("X")]), Cost::Finite(0));
        assert_eq!(level_sum(&l, &[symbol("X"), symbol("Y"), symbol("Z")]), Cost::Finite(3));
        assert_eq!(level_sum(&l, &[symbol("Y"), symbol("Y")]), Cost::Finite(1));
        assert_eq!(level_sum(&l, &[symbol("X"), symbol("W")]), Cost::Infinite);
        assert_eq!(level_sum(&l, &[]), Cost::Finite(0));
    }

    #[test]
    fn test_max_and_set_level() {
        let l = levels();
        let goal = [symbol("X"), symbol("Y")];
        assert_eq!(max_level(&l, &goal), Cost::Finite(1));
        // X and Y are mutex at level 1
        assert_eq!(set_level(&l, &goal), Cost::Finite(2));
        assert_eq!(set_level(&l, &[symbol("W")]), Cost::Infinite);
    }
}
