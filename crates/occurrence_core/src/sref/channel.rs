//! Channel Islands grid: UTM zone 30 on ED50 with the `WA`/`WV` squares.

use super::grid::{Envelope, GridCodec};
use super::GridSystem;

const EAST_INDEX: u32 = 5;
const SOUTH_NORTH_INDEX: u32 = 54;
const NORTH_NORTH_INDEX: u32 = 55;

/// Codec for EPSG:23030 grid references such as `WV5050`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelIslandsGrid;

impl GridCodec for ChannelIslandsGrid {
    fn system(&self) -> GridSystem {
        GridSystem::ChannelIslands
    }

    fn prefix_len(&self) -> usize {
        2
    }

    fn envelope(&self) -> Envelope {
        Envelope {
            min_easting: 500_000.0,
            max_easting: 600_000.0,
            min_northing: 5_400_000.0,
            max_northing: 5_600_000.0,
        }
    }

    fn square_letters(&self, easting_index: u32, northing_index: u32) -> Option<String> {
        match (easting_index, northing_index) {
            (EAST_INDEX, SOUTH_NORTH_INDEX) => Some("WV".to_string()),
            (EAST_INDEX, NORTH_NORTH_INDEX) => Some("WA".to_string()),
            _ => None,
        }
    }

    fn square_index(&self, prefix: &str) -> Option<(u32, u32)> {
        match prefix {
            "WV" => Some((EAST_INDEX, SOUTH_NORTH_INDEX)),
            "WA" => Some((EAST_INDEX, NORTH_NORTH_INDEX)),
            _ => None,
        }
    }
}

/// Whether `gridref` starts with one of the Channel Islands squares.
pub(crate) fn has_channel_islands_prefix(gridref: &str) -> bool {
    gridref.starts_with("WA") || gridref.starts_with("WV")
}
