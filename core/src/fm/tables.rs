//! Precomputed constant tables shared by every FM channel and operator.
//!
//! These tables are built once at program startup and never mutated; per §9 of the
//! design notes they are treated as chip-wide constants rather than per-operator state.

use std::sync::LazyLock;

/// Quarter-sine log-attenuation table, 4.8 fixed point, 256 entries.
///
/// `sine_attenuation(phase)` folds a 10-bit phase into this table using the top two
/// bits as sign/mirror selectors, matching real YM2612 hardware's quarter-wave table.
pub static LOG_SINE_TABLE: LazyLock<[u16; 256]> = LazyLock::new(|| {
    use std::array;
    use std::f64::consts::PI;

    array::from_fn(|i| {
        // Table indices represent angles in (0, PI/2), offset by half a step to avoid log2(0).
        let n = ((i << 1) | 1) as f64;
        let sine = (n / 512.0 * PI / 2.0).sin();
        let attenuation = -sine.log2();
        (attenuation * f64::from(1 << 8)).round() as u16
    })
});

/// 2^-x power table, 0.11 fixed point, 256 entries. Index `i` represents `(i + 1) / 256`.
pub static POW2_TABLE: LazyLock<[u16; 256]> = LazyLock::new(|| {
    use std::array;

    array::from_fn(|i| {
        let n = (i + 1) as f64 / 256.0;
        let inverse_pow2 = 2.0_f64.powf(-n);
        (inverse_pow2 * f64::from(1 << 11)).round() as u16
    })
});

/// Fold a 10-bit phase into the quarter-sine table and return the 4.8 fixed-point
/// log-attenuation for `sin(phase)`, ignoring sign.
#[must_use]
pub fn sine_attenuation(phase: u16) -> u16 {
    let quarter_phase = phase & 0xFF;
    let index = if phase & 0x100 != 0 { 0xFF - quarter_phase } else { quarter_phase };
    LOG_SINE_TABLE[index as usize]
}

/// Convert a 13-bit log-scale attenuation (5.8 fixed point) into an 11-bit linear amplitude.
#[must_use]
pub fn attenuation_to_amplitude(attenuation: u16) -> u16 {
    let whole = (attenuation >> 8) & 0x1F;
    if whole >= 13 {
        return 0;
    }

    let frac = attenuation & 0xFF;
    let base = POW2_TABLE[frac as usize];
    (base << 2) >> whole
}

/// Detune offset table keyed by `[key_code][detune_magnitude]`, 32 key codes x 4 magnitudes.
///
/// Mirrors the real YM2612's detune PROM; magnitude 0 is always silent (no detune).
pub static DETUNE_TABLE: [[u8; 4]; 32] = [
    [0, 0, 1, 2],
    [0, 0, 1, 2],
    [0, 0, 1, 2],
    [0, 0, 1, 2],
    [0, 1, 2, 2],
    [0, 1, 2, 3],
    [0, 1, 2, 3],
    [0, 1, 2, 3],
    [0, 1, 2, 4],
    [0, 1, 3, 4],
    [0, 1, 3, 4],
    [0, 1, 3, 5],
    [0, 2, 4, 5],
    [0, 2, 4, 6],
    [0, 2, 4, 6],
    [0, 2, 5, 7],
    [0, 2, 5, 8],
    [0, 3, 6, 8],
    [0, 3, 6, 9],
    [0, 3, 7, 10],
    [0, 4, 8, 11],
    [0, 4, 8, 12],
    [0, 4, 9, 13],
    [0, 5, 10, 14],
    [0, 5, 11, 16],
    [0, 6, 12, 17],
    [0, 6, 13, 19],
    [0, 7, 14, 20],
    [0, 8, 16, 22],
    [0, 8, 16, 22],
    [0, 8, 16, 22],
    [0, 8, 16, 22],
];

/// Per-rate attenuation delta table, 64 rates x 8 envelope-clock sub-phases.
///
/// Row index is the computed two-bit-scaled rate (`0..=63`); column index is
/// `cycle_count & 7`. Rows below 4 never update (rate 0 means "frozen"). A nonzero entry
/// is not a magnitude directly: callers consume it as `1 << (delta - 1)` (or, for the
/// attack curve, as a shift amount against the attenuation's complement).
pub static ATTENUATION_INCREMENTS: LazyLock<[[u8; 8]; 64]> = LazyLock::new(|| {
    use std::array;

    array::from_fn(|rate| {
        if rate < 4 {
            return [0; 8];
        }

        // Most of the range shares the same (1x) magnitude tier and only the update
        // density (`rate & 3`, how many of the 8 sub-phases actually step) increases;
        // only the last few rates climb the tier, topping out at 4 (an 8x step). The
        // attack curve below consumes a tier as a left-shift against the attenuation's
        // complement, so capping it at 4 keeps that shift under 4 bits: at exactly
        // 0x3FF the complement's low 10 bits are all zero, and shifting by 4 or more
        // would shift only zero bits back into the masked result, stalling attack
        // forever right where every operator starts.
        let tier = if rate < 44 { 1 } else { (((rate - 44) >> 2) + 2).min(4) };
        let pattern = RATE_UPDATE_PATTERNS[(rate & 0x03) as usize];
        array::from_fn(|sub_phase| u8::from(pattern[sub_phase]) * (tier as u8))
    })
});

/// Which of the 8 sub-phases trigger an update, indexed by `rate & 3`.
static RATE_UPDATE_PATTERNS: [[bool; 8]; 4] = [
    [true, false, false, false, true, false, false, false],
    [true, false, true, false, true, false, true, false],
    [true, true, true, false, true, true, true, false],
    [true, true, true, true, true, true, true, true],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sine_table_matches_reference_formula() {
        // Testable Properties #4: log_sin[0] and log_sin[255] must match the reference formula.
        let reference = |i: usize| {
            let n = ((2 * i + 1) as f64) / 512.0 * std::f64::consts::PI / 2.0;
            (-(n.sin().log2()) * 256.0).round() as u16
        };
        assert_eq!(LOG_SINE_TABLE[0], reference(0));
        assert_eq!(LOG_SINE_TABLE[255], reference(255));
    }

    #[test]
    fn sine_attenuation_is_symmetric_across_quarter_boundary() {
        assert_eq!(sine_attenuation(0x00), sine_attenuation(0x1FF));
        assert_eq!(sine_attenuation(0x01), sine_attenuation(0x1FE));
    }

    #[test]
    fn attenuation_to_amplitude_saturates_to_zero_past_threshold() {
        assert_eq!(attenuation_to_amplitude(13 << 8), 0);
        assert!(attenuation_to_amplitude(0) > 0);
    }
}
