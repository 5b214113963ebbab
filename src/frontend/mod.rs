//! Frontend event streams and their replay into scope managers

pub mod events;
pub mod replay;

pub use events::{Argument, Declaration, Event, EventRecord, ParameterSpec, StatementKind, UnitEvents};
pub use replay::replay_unit;
