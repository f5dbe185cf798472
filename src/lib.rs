pub mod air_cargo;
pub mod planning;
pub mod search;
