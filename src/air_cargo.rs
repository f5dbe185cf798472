//! Air cargo transport domain: cargo is loaded into planes, flown between airports
//! and unloaded.

use std::rc::Rc;

use indexmap::IndexSet;

use crate::planning::{symbol, Action, FluentState, Problem, Result, State, StripsProblem, Symbol};

pub fn at(thing: &str, airport: &str) -> Symbol {
    symbol(&format!("At({}, {})", thing, airport))
}

pub fn inside(cargo: &str, plane: &str) -> Symbol {
    symbol(&format!("In({}, {})", cargo, plane))
}

pub struct AirCargoProblem {
    pub cargos: Vec<String>,
    pub planes: Vec<String>,
    pub airports: Vec<String>,
    problem: StripsProblem,
}

impl AirCargoProblem {
    /// The state map is `initial.pos` followed by `initial.neg`.
    pub fn new(
        cargos: &[&str],
        planes: &[&str],
        airports: &[&str],
        initial: FluentState,
        goal: Vec<Symbol>,
    ) -> Result<Self> {
        let mut actions = Self::load_actions(cargos, planes, airports);
        actions.extend(Self::unload_actions(cargos, planes, airports));
        actions.extend(Self::fly_actions(planes, airports));
        Ok(Self {
            cargos: cargos.iter().map(|s| s.to_string()).collect(),
            planes: planes.iter().map(|s| s.to_string()).collect(),
            airports: airports.iter().map(|s| s.to_string()).collect(),
            problem: StripsProblem::new(actions, initial, goal)?,
        })
    }

    fn load_actions(cargos: &[&str], planes: &[&str], airports: &[&str]) -> Vec<Action> {
        let mut loads = Vec::new();
        for c in cargos {
            for p in planes {
                for a in airports {
                    loads.push(Action::new(
                        format!("Load({}, {}, {})", c, p, a),
                        (vec![at(c, a), at(p, a)], Vec::new()),
                        (vec![inside(c, p)], vec![at(c, a)]),
                    ));
                }
            }
        }
        loads
    }

    fn unload_actions(cargos: &[&str], planes: &[&str], airports: &[&str]) -> Vec<Action> {
        let mut unloads = Vec::new();
        for c in cargos {
            for p in planes {
                for a in airports {
                    unloads.push(Action::new(
                        format!("Unload({}, {}, {})", c, p, a),
                        (vec![inside(c, p), at(p, a)], Vec::new()),
                        (vec![at(c, a)], vec![inside(c, p)]),
                    ));
                }
            }
        }
        unloads
    }

    fn fly_actions(planes: &[&str], airports: &[&str]) -> Vec<Action> {
        let mut flys = Vec::new();
        for from in airports {
            for to in airports.iter().filter(|to| *to != from) {
                for p in planes {
                    flys.push(Action::new(
                        format!("Fly({}, {}, {})", p, from, to),
                        (vec![at(p, from)], Vec::new()),
                        (vec![at(p, to)], vec![at(p, from)]),
                    ));
                }
            }
        }
        flys
    }
}

impl Problem for AirCargoProblem {
    fn actions_list(&self) -> &[Rc<Action>] {
        self.problem.actions_list()
    }

    fn state_map(&self) -> &IndexSet<Symbol> {
        self.problem.state_map()
    }

    fn initial_state(&self) -> &State {
        self.problem.initial_state()
    }

    fn goal(&self) -> &[Symbol] {
        self.problem.goal()
    }
}

/// Initial fluents for cargo and planes parked at `positions`: every other `At` and
/// every `In` is false.
pub fn cargo_fluents(
    cargos: &[&str],
    planes: &[&str],
    airports: &[&str],
    positions: &[(&str, &str)],
) -> FluentState {
    let located =
        |thing: &str, airport: &str| positions.iter().any(|(t, a)| *t == thing && *a == airport);
    let pos = positions.iter().map(|(thing, airport)| at(thing, airport)).collect();
    let mut neg = Vec::new();
    for thing in cargos.iter().chain(planes.iter()) {
        for airport in airports {
            if !located(thing, airport) {
                neg.push(at(thing, airport));
            }
        }
    }
    for c in cargos {
        for p in planes {
            neg.push(inside(c, p));
        }
    }
    FluentState::new(pos, neg)
}

/// C1 and P1 at SFO, C2 and P2 at JFK. Goal: swap the cargo.
pub fn air_cargo_p1() -> Result<AirCargoProblem> {
    let cargos = ["C1", "C2"];
    let planes = ["P1", "P2"];
    let airports = ["JFK", "SFO"];
    let positions = [("C1", "SFO"), ("C2", "JFK"), ("P1", "SFO"), ("P2", "JFK")];
    let init = cargo_fluents(&cargos, &planes, &airports, &positions);
    AirCargoProblem::new(&cargos, &planes, &airports, init, vec![at("C1", "JFK"), at("C2", "SFO")])
}

pub fn air_cargo_p2() -> Result<AirCargoProblem> {
    let cargos = ["C1", "C2", "C3"];
    let planes = ["P1", "P2", "P3"];
    let airports = ["SFO", "JFK", "ATL"];
    let positions = [
        ("C1", "SFO"),
        ("C2", "JFK"),
        ("C3", "ATL"),
        ("P1", "SFO"),
        ("P2", "JFK"),
        ("P3", "ATL"),
    ];
    let init = cargo_fluents(&cargos, &planes, &airports, &positions);
    let goal = vec![at("C1", "JFK"), at("C2", "SFO"), at("C3", "SFO")];
    AirCargoProblem::new(&cargos, &planes, &airports, init, goal)
}

/// Four cargos spread over four airports and only two planes.
pub fn air_cargo_p3() -> Result<AirCargoProblem> {
    let cargos = ["C1", "C2", "C3", "C4"];
    let planes = ["P1", "P2"];
    let airports = ["SFO", "JFK", "ATL", "ORD"];
    let positions = [
        ("C1", "SFO"),
        ("C2", "JFK"),
        ("C3", "ATL"),
        ("C4", "ORD"),
        ("P1", "SFO"),
        ("P2", "JFK"),
    ];
    let init = cargo_fluents(&cargos, &planes, &airports, &positions);
    AirCargoProblem::new(
        &cargos,
        &planes,
        &airports,
        init,
        vec![at("C1", "JFK"), at("C3", "JFK"), at("C2", "SFO"), at("C4", "SFO")],
    )
}
