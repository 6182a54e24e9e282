//! Score tables and level formulas.
//!
//! Multipliers are kept in tenths and applied with integer arithmetic so the
//! floor in `(1 + 0.1·combo) · (1 + 0.1·level) · value` is exact.

use crate::board::MAX_COLORS;

/// Base value for runs of length 3..=10.
const MATCH_VALUES: [u64; 8] = [300, 450, 650, 950, 1500, 2500, 4500, 7000];

/// Base value of a run of `len` tiles before multipliers.
pub fn match_value(len: usize) -> u64 {
    match len {
        0..=2 => 10,
        3..=10 => MATCH_VALUES[len - 3],
        _ => 7000 + 3000 * (len as u64 - 10),
    }
}

/// Points for one resolved run.
pub fn match_score(len: usize, combo: u32, level: u32) -> u64 {
    let combo_tenths = 10 + u64::from(combo);
    let level_tenths = 10 + u64::from(level);
    combo_tenths * level_tenths * match_value(len) / 100
}

/// Flat bonus for each tile removed by a level-up wipe starting at `row`.
pub fn wipe_bonus(row: usize, level: u32) -> u64 {
    100 + 10 * row as u64 + 10 * u64::from(level)
}

/// Clears added to the norma on reaching `new_level`.
pub fn norma_for_level(new_level: u32) -> i64 {
    100 + 20 * i64::from(new_level)
}

/// Rows gained per tick while the field is idle.
pub fn rise_per_tick(level: u32) -> f64 {
    (1.0 + 0.15 * f64::from(level)).min(4.0) / 120.0
}

/// Distinct tile colours in play at `level`.
pub fn color_count(level: u32) -> u8 {
    let extra = (level / 2).min(u32::from(MAX_COLORS));
    (4 + extra as u8).min(MAX_COLORS)
}
