//! British National Grid (two-letter squares).

use super::grid::{square_letter, square_letter_index, Envelope, GridCodec};
use super::GridSystem;

// The first letter names a 500km square counted from a false origin
// 1000km west and 500km south of the true origin.
const FALSE_ORIGIN_EAST_SQUARES: u32 = 10;
const FALSE_ORIGIN_NORTH_SQUARES: u32 = 5;

/// Codec for EPSG:27700 grid references such as `TL1234`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BritishGrid;

impl GridCodec for BritishGrid {
    fn system(&self) -> GridSystem {
        GridSystem::Gb
    }

    fn prefix_len(&self) -> usize {
        2
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            min_easting: 0.0,
            max_easting: 700_000.0,
            min_northing: 0.0,
            max_northing: 1_300_000.0,
        }
    }

    fn square_letters(&self, easting_index: u32, northing_index: u32) -> Option<String> {
        let east = easting_index + FALSE_ORIGIN_EAST_SQUARES;
        let north = northing_index + FALSE_ORIGIN_NORTH_SQUARES;
        if east >= 25 || north >= 25 {
            return None;
        }
        let major = (4 - north / 5) * 5 + east / 5;
        let minor = (4 - north % 5) * 5 + east % 5;
        Some([square_letter(major)?, square_letter(minor)?].iter().collect())
    }

    fn square_index(&self, prefix: &str) -> Option<(u32, u32)> {
        let mut letters = prefix.chars();
        let major = square_letter_index(letters.next()?)?;
        let minor = square_letter_index(letters.next()?)?;
        if letters.next().is_some() {
            return None;
        }
        let east = (major % 5) * 5 + minor % 5;
        let north = (4 - major / 5) * 5 + (4 - minor / 5);
        Some((
            east.checked_sub(FALSE_ORIGIN_EAST_SQUARES)?,
            north.checked_sub(FALSE_ORIGIN_NORTH_SQUARES)?,
        ))
    }
}
