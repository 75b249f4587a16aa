//! Slot occupancy model for the 6 × 5 switch matrix.

use core::fmt::Write as _;

pub const ROWS: usize = 6;
pub const COLS: usize = 5;

/// Slot ids by matrix position.  Two shelves of fifteen, three rows each.
pub const SLOT_IDS: [[&str; COLS]; ROWS] = [
    ["r1c1", "r1c2", "r1c3", "r1c4", "r1c5"],
    ["r1c6", "r1c7", "r1c8", "r1c9", "r1c10"],
    ["r1c11", "r1c12", "r1c13", "r1c14", "r1c15"],
    ["r2c1", "r2c2", "r2c3", "r2c4", "r2c5"],
    ["r2c6", "r2c7", "r2c8", "r2c9", "r2c10"],
    ["r2c11", "r2c12", "r2c13", "r2c14", "r2c15"],
];

/// Fits every id plus its separator.
pub const SLOT_LIST_CAP: usize = 192;

pub type SlotList = heapless::String<SLOT_LIST_CAP>;

/// Set of occupied slots, one bit per matrix position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotSet(u32);

impl SlotSet {
    pub const EMPTY: Self = Self(0);

    const fn bit(row: usize, col: usize) -> u32 {
        1 << (row * COLS + col)
    }

    /// Out-of-range positions are ignored.
    pub fn insert(&mut self, row: usize, col: usize) {
        if row < ROWS && col < COLS {
            self.0 |= Self::bit(row, col);
        }
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row < ROWS && col < COLS && self.0 & Self::bit(row, col) != 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Slots in `self` but not in `other`.
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Ids in row-major order.
    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        (0..ROWS).flat_map(move |row| {
            (0..COLS)
                .filter(move |&col| self.contains(row, col))
                .map(move |col| SLOT_IDS[row][col])
        })
    }

    /// `id;id;...;` as sent in the `slots` field.
    pub fn to_list(&self) -> SlotList {
        let mut out = SlotList::new();
        for id in self.ids() {
            if write!(out, "{id};").is_err() {
                break;
            }
        }
        out
    }
}

/// Change between two scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotDiff {
    pub placed: SlotSet,
    pub taken: SlotSet,
}

pub fn diff(previous: SlotSet, current: SlotSet) -> SlotDiff {
    SlotDiff {
        placed: current.difference(previous),
        taken: previous.difference(current),
    }
}
