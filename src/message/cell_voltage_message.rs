use super::{u16_at, Payload, MAX_CELLS};
use crate::telemetry::{Field, Reading};

const CELLS_PER_FRAME: usize = 3;

/// Response to 0x95. The BMS answers with one frame per group of three cells;
/// the first payload byte numbers the frame starting at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellVoltageMessage(Payload);

impl CellVoltageMessage {
    pub fn new(payload: Payload) -> Self {
        Self(payload)
    }

    pub fn frame_number(&self) -> u8 {
        self.0[0]
    }

    /// `(cell number, voltage in V)` for every cell in this frame. Empty for
    /// frame number 0, and cells past [`MAX_CELLS`] are left out.
    pub fn cell_voltages(&self) -> Vec<(u8, f32)> {
        let Some(group) = (self.frame_number() as usize).checked_sub(1) else {
            return Vec::new();
        };
        let first_cell = group * CELLS_PER_FRAME + 1;

        (0..CELLS_PER_FRAME)
            .map(|i| (first_cell + i, u16_at(&self.0, 1 + 2 * i)))
            .filter(|(cell, _)| *cell <= MAX_CELLS as usize)
            .map(|(cell, mv)| (cell as u8, mv as f32 / 1000.0))
            .collect()
    }

    pub(crate) fn readings(&self) -> Vec<Reading> {
        self.cell_voltages()
            .into_iter()
            .map(|(cell, volts)| Reading::number(Field::CellVoltage(cell), volts))
            .collect()
    }
}

#[test]
fn test_cell_voltage_first_frame() {
    let message = CellVoltageMessage::new([0x01, 0x0d, 0x05, 0x0d, 0x06, 0x0d, 0x07, 0x00]);
    assert_eq!(
        message.cell_voltages(),
        vec![(1, 3.333), (2, 3.334), (3, 3.335)]
    );
}

#[test]
fn test_cell_voltage_fourth_frame() {
    let message = CellVoltageMessage::new([0x04, 0x0c, 0xe4, 0x0c, 0xe5, 0x0c, 0xe6, 0x00]);
    let cells: Vec<u8> = message.cell_voltages().iter().map(|(cell, _)| *cell).collect();
    assert_eq!(cells, vec![10, 11, 12]);
}

#[test]
fn test_cell_voltage_last_frame_only_cell_16() {
    let message = CellVoltageMessage::new([0x06, 0x0d, 0x00, 0x0d, 0x01, 0x0d, 0x02, 0x00]);
    assert_eq!(
        message.readings(),
        vec![Reading::number(Field::CellVoltage(16), 3.328)]
    );
}

#[test]
fn test_cell_voltage_out_of_range_frames() {
    assert!(CellVoltageMessage::new([0x00; 8]).readings().is_empty());
    assert!(CellVoltageMessage::new([0x07, 1, 2, 3, 4, 5, 6, 0]).readings().is_empty());
    assert!(CellVoltageMessage::new([0xff; 8]).readings().is_empty());
}
