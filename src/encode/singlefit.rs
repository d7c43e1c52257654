//! Closed-form endpoint search for blocks with a single distinct color.
//!
//! For every 8-bit channel target there is a best pair of lattice codes
//! whose palette reproduces the target at a given slot. Those pairs are
//! precomputed per channel width and palette regime, so fitting a
//! single-color block is three table lookups and an error comparison.

use std::sync::OnceLock;

use glam::Vec4;

use crate::colorblock;
use crate::gamma::compute_gamma_lut;
use crate::quantize::{replicate, QuantizedPair};

#[derive(Debug, Clone, Copy, Default)]
struct SingleLookup {
    start: u8,
    end: u8,
    /// Absolute channel error of the reproduced value, in 8-bit steps.
    error: u8,
}

/// `table[target][slot]`; slot 0 reproduces the target at the start
/// endpoint, slot 1 at the first interior palette entry. The remaining
/// slots are covered by endpoint swapping.
type Table = [[SingleLookup; 2]; 256];

/// The palette regime the lookup is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Regime {
    Four,
    Three,
}

fn build_table(bits: u32, regime: Regime) -> Box<Table> {
    let grid = (1_u32 << bits) - 1;
    let mut table: Box<Table> = Box::new([[SingleLookup::default(); 2]; 256]);

    for (target, entry) in table.iter_mut().enumerate() {
        let target = target as u8;
        for (slot, lookup) in entry.iter_mut().enumerate() {
            let mut best = SingleLookup {
                start: 0,
                end: 0,
                error: u8::MAX,
            };
            for start in 0..=grid as u8 {
                let expanded_start = replicate(start, bits);
                if slot == 0 {
                    // the end endpoint does not influence slot 0
                    let error = expanded_start.abs_diff(target);
                    if error < best.error {
                        best = SingleLookup {
                            start,
                            end: start,
                            error,
                        };
                    }
                    continue;
                }
                for end in 0..=grid as u8 {
                    let expanded_end = replicate(end, bits);
                    let value = match regime {
                        Regime::Four => colorblock::third(expanded_start, expanded_end),
                        Regime::Three => colorblock::half(expanded_start, expanded_end),
                    };
                    let error = value.abs_diff(target);
                    if error < best.error {
                        best = SingleLookup { start, end, error };
                    }
                }
            }
            *lookup = best;
        }
    }
    table
}

fn table(bits: u32, regime: Regime) -> &'static Table {
    static TABLES: [OnceLock<Box<Table>>; 4] = [
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
        OnceLock::new(),
    ];
    let index = match (bits, regime) {
        (5, Regime::Four) => 0,
        (6, Regime::Four) => 1,
        (5, Regime::Three) => 2,
        (6, Regime::Three) => 3,
        _ => unreachable!("no lookup table for this channel width"),
    };
    TABLES[index].get_or_init(|| build_table(bits, regime))
}

/// The best single-color encoding for one palette regime.
///
/// Returns the quantized endpoints and the palette slot every pixel of the
/// color should use. The slot is chosen by the gamma-mapped table errors
/// under the metric; callers re-score the candidate uniformly.
pub(crate) fn single_color_fit(color: [u8; 4], metric: Vec4, regime: Regime) -> (QuantizedPair, u8) {
    let lut = compute_gamma_lut(false);
    let channel_bits = [5_u32, 6, 5];

    let mut best_slot = 0;
    let mut best_error = f32::INFINITY;
    let mut best_pair = QuantizedPair {
        start: [0; 4],
        end: [0; 4],
    };

    for slot in 0..2 {
        let mut start = [0_u8; 4];
        let mut end = [0_u8; 4];
        let mut channel_error = Vec4::ZERO;
        for channel in 0..3 {
            let lookup = table(channel_bits[channel], regime)[color[channel] as usize][slot];
            start[channel] = lookup.start;
            end[channel] = lookup.end;
            channel_error[channel] = lut[lookup.error as usize];
        }

        let error = (metric * channel_error).length_squared();
        if error < best_error {
            best_error = error;
            best_slot = slot as u8;
            best_pair = QuantizedPair { start, end };
        }
    }

    (best_pair, best_slot)
}
