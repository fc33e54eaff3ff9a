use super::{Payload, MAX_CELLS};
use crate::telemetry::{Field, Reading};

const CELLS_PER_FRAME: u8 = 8;

/// Response to 0x97. Group 0 covers cells 1-8, group 1 cells 9-16, one
/// payload byte per cell. The group number itself sits in byte 0, so the
/// first cell of each group reads the group number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceMessage(Payload);

impl BalanceMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub fn group(&self) -> u8 {
        self.0[0]
    }

    /// `(cell number, balancing)` for every cell of this group, empty for unknown groups.
    pub fn balance_flags(&self) -> Vec<(u8, bool)> {
        let group = self.group();
        if group >= MAX_CELLS / CELLS_PER_FRAME {
            return Vec::new();
        }
        let first_cell = group * CELLS_PER_FRAME + 1;
        self.0
            .iter()
            .zip(first_cell..)
            .map(|(byte, cell)| (cell, *byte != 0))
            .collect()
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        self.balance_flags()
            .into_iter()
            .map(|(cell, active)| Reading::flag(Field::CellBalanceActive(cell), active))
            .collect()
    }
}

#[test]
fn test_balance_groups_do_not_overlap() {
    let low = BalanceMessage::new([0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01]);
    let high = BalanceMessage::new([0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);

    let low_cells: Vec<u8> = low.balance_flags().iter().map(|(c, _)| *c).collect();
    let high_cells: Vec<u8> = high.balance_flags().iter().map(|(c, _)| *c).collect();
    assert_eq!(low_cells, (1..=8).collect::<Vec<u8>>());
    assert_eq!(high_cells, (9..=16).collect::<Vec<u8>>());

    assert_eq!(low.balance_flags()[1], (2, true));
    assert_eq!(low.balance_flags()[7], (8, true));
    assert_eq!(high.balance_flags()[2], (11, true));
    assert_eq!(high.balance_flags()[3], (12, false));
}

#[test]
fn test_balance_unknown_group() {
    assert!(BalanceMessage::new([0x02, 1, 1, 1, 1, 1, 1, 1]).readings().is_empty());
}
