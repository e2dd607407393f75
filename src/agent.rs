use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// One agent: a unique id (also used as a tiebreak key) plus a start and
/// goal cell. Both must be non-blocked cells in the accompanying grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Cell,
    pub goal: Cell,
}

impl Agent {
    pub fn new(id: usize, start: Cell, goal: Cell) -> Self {
        Agent { id, start, goal }
    }
}
