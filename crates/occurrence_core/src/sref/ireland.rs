//! Irish Grid (one-letter squares).

use super::grid::{square_letter, square_letter_index, Envelope, GridCodec};
use super::GridSystem;

/// Codec for EPSG:29903 grid references such as `H1234`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IrishGrid;

impl GridCodec for IrishGrid {
    fn system(&self) -> GridSystem {
        GridSystem::Ireland
    }

    fn prefix_len(&self) -> usize {
        1
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            min_easting: 0.0,
            max_easting: 500_000.0,
            min_northing: 0.0,
            max_northing: 500_000.0,
        }
    }

    fn square_letters(&self, easting_index: u32, northing_index: u32) -> Option<String> {
        if easting_index >= 5 || northing_index >= 5 {
            return None;
        }
        square_letter((4 - northing_index) * 5 + easting_index).map(String::from)
    }

    fn square_index(&self, prefix: &str) -> Option<(u32, u32)> {
        let mut letters = prefix.chars();
        let index = square_letter_index(letters.next()?)?;
        if letters.next().is_some() {
            return None;
        }
        Some((index % 5, 4 - index / 5))
    }
}
