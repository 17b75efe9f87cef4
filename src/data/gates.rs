//! Small built-in truth tables.

use crate::data::dataset::Dataset;

fn table<const N: usize>(rows: &[([f64; N], f64)]) -> Dataset {
    let inputs = rows.iter().map(|(input, _)| input.to_vec()).collect();
    let targets = rows.iter().map(|&(_, target)| vec![target]).collect();
    Dataset { inputs, targets }
}

/// Two-input AND.
pub fn and_gate() -> Dataset {
    table(&[
        ([0.0, 0.0], 0.0),
        ([0.0, 1.0], 0.0),
        ([1.0, 0.0], 0.0),
        ([1.0, 1.0], 1.0),
    ])
}

/// AND, OR and XOR in one table; the first input selects the gate
/// (0 = AND, 1 = OR, 2 = XOR).
pub fn logic_gates() -> Dataset {
    table(&[
        ([0.0, 0.0, 0.0], 0.0),
        ([0.0, 0.0, 1.0], 0.0),
        ([0.0, 1.0, 0.0], 0.0),
        ([0.0, 1.0, 1.0], 1.0),
        ([1.0, 0.0, 0.0], 0.0),
        ([1.0, 0.0, 1.0], 1.0),
        ([1.0, 1.0, 0.0], 1.0),
        ([1.0, 1.0, 1.0], 1.0),
        ([2.0, 0.0, 0.0], 0.0),
        ([2.0, 0.0, 1.0], 1.0),
        ([2.0, 1.0, 0.0], 1.0),
        ([2.0, 1.0, 1.0], 0.0),
    ])
}
