//! Spatial reference normalization.
//!
//! # Responsibility
//! - Convert grid references, planar coordinates and latitude/longitude into
//!   one canonical `SpatialReference`.
//! - Select the grid codec for a system by tag, never by inheritance.
//!
//! # Invariants
//! - Canonical grid references are uppercase with no whitespace.
//! - Every codec honours the same `GridCodec` contract.
//!
//! # See also
//! - `grid` for the shared suffix and tetrad arithmetic.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod channel;
mod gb;
pub mod grid;
mod ireland;
mod reference;
pub mod transform;

pub use channel::ChannelIslandsGrid;
pub use gb::BritishGrid;
pub use grid::{GridCode, GridCoordinate, GridCodec, SUPPORTED_ACCURACIES};
pub use ireland::IrishGrid;
pub use reference::SpatialReference;
pub use transform::{infer_country, HelmertProjector, Projector};

/// EPSG code of the British National Grid.
pub const SRID_GB: u32 = 27700;
/// EPSG code of the Irish Grid.
pub const SRID_IRELAND: u32 = 29903;
/// EPSG code of UTM zone 30N on ED50, used for the Channel Islands.
pub const SRID_CHANNEL_ISLANDS: u32 = 23030;
/// EPSG code of WGS84 latitude/longitude.
pub const SRID_WGS84: u32 = 4326;
/// Identifier for a grid reference whose grid must be inferred.
pub const SRID_COMBINED: u32 = 0;

pub type SrefResult<T> = Result<T, SrefError>;

/// One of the three supported national grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridSystem {
    Gb,
    Ireland,
    ChannelIslands,
}

static BRITISH_GRID: BritishGrid = BritishGrid;
static IRISH_GRID: IrishGrid = IrishGrid;
static CHANNEL_ISLANDS_GRID: ChannelIslandsGrid = ChannelIslandsGrid;

impl GridSystem {
    pub const ALL: [GridSystem; 3] = [Self::Gb, Self::Ireland, Self::ChannelIslands];

    /// Returns the codec used for this grid.
    pub fn codec(self) -> &'static dyn GridCodec {
        match self {
            Self::Gb => &BRITISH_GRID,
            Self::Ireland => &IRISH_GRID,
            Self::ChannelIslands => &CHANNEL_ISLANDS_GRID,
        }
    }

    pub fn srid(self) -> u32 {
        match self {
            Self::Gb => SRID_GB,
            Self::Ireland => SRID_IRELAND,
            Self::ChannelIslands => SRID_CHANNEL_ISLANDS,
        }
    }

    pub fn country(self) -> Country {
        match self {
            Self::Gb => Country::Gb,
            Self::Ireland => Country::Ireland,
            Self::ChannelIslands => Country::ChannelIslands,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gb => "British National Grid",
            Self::Ireland => "Irish Grid",
            Self::ChannelIslands => "Channel Islands Grid",
        }
    }
}

/// Coordinate system named by an input record `srid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrefSystem {
    Grid(GridSystem),
    LatLon,
    /// Grid reference of unknown grid; disambiguated from its letters.
    Combined,
}

impl SrefSystem {
    pub fn from_srid(srid: u32) -> SrefResult<Self> {
        match srid {
            SRID_GB => Ok(Self::Grid(GridSystem::Gb)),
            SRID_IRELAND => Ok(Self::Grid(GridSystem::Ireland)),
            SRID_CHANNEL_ISLANDS => Ok(Self::Grid(GridSystem::ChannelIslands)),
            SRID_WGS84 => Ok(Self::LatLon),
            SRID_COMBINED => Ok(Self::Combined),
            other => Err(SrefError::UnsupportedSystem(other)),
        }
    }

    pub fn srid(self) -> u32 {
        match self {
            Self::Grid(system) => system.srid(),
            Self::LatLon => SRID_WGS84,
            Self::Combined => SRID_COMBINED,
        }
    }
}

/// Country a spatial reference falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Country {
    Gb,
    Ireland,
    ChannelIslands,
}

impl Country {
    /// Two-letter code used in output records.
    pub fn code(self) -> &'static str {
        match self {
            Self::Gb => "GB",
            Self::Ireland => "IE",
            Self::ChannelIslands => "CI",
        }
    }

    /// Grid that covers this country.
    pub fn grid(self) -> GridSystem {
        match self {
            Self::Gb => GridSystem::Gb,
            Self::Ireland => GridSystem::Ireland,
            Self::ChannelIslands => GridSystem::ChannelIslands,
        }
    }
}

impl Display for Country {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Spatial reference validation and projection errors.
///
/// `Display` output is used verbatim as a record failure message.
#[derive(Debug, Clone, PartialEq)]
pub enum SrefError {
    /// Grid reference text does not have a valid shape.
    Malformed(String),
    /// Square letters are not part of the grid.
    InvalidSquare { system: GridSystem, gridref: String },
    InvalidAccuracy(u32),
    /// Planar coordinate lies outside the grid envelope.
    OutOfBounds {
        system: GridSystem,
        easting: f64,
        northing: f64,
    },
    /// Latitude/longitude is not a valid WGS84 position.
    InvalidLatLon { latitude: f64, longitude: f64 },
    /// Latitude/longitude falls in none of the supported countries.
    OutsideCoverage { latitude: f64, longitude: f64 },
    UnsupportedSystem(u32),
    /// Planar coordinates were given with the combined system identifier.
    AmbiguousSystem,
    MissingAccuracy,
    /// None, or more than one, of the reference forms was supplied.
    IncompleteReference,
    ConflictingReference,
    /// Projection collaborator failure.
    Projection(String),
}

impl Display for SrefError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(f, "Invalid grid reference: {value}."),
            Self::InvalidSquare { system, gridref } => {
                write!(f, "Invalid grid square in {gridref} for the {}.", system.name())
            }
            Self::InvalidAccuracy(value) => write!(f, "Invalid accuracy: {value} metres."),
            Self::OutOfBounds {
                system,
                easting,
                northing,
            } => write!(
                f,
                "Coordinate {easting}, {northing} is outside the bounds of the {}.",
                system.name()
            ),
            Self::InvalidLatLon {
                latitude,
                longitude,
            } => write!(f, "Invalid latitude/longitude: {latitude}, {longitude}."),
            Self::OutsideCoverage {
                latitude,
                longitude,
            } => write!(
                f,
                "Location {latitude}, {longitude} is outside Britain, Ireland and the Channel Islands."
            ),
            Self::UnsupportedSystem(srid) => {
                write!(f, "Unsupported spatial reference system: {srid}.")
            }
            Self::AmbiguousSystem => {
                f.write_str("Coordinates require an explicit grid system.")
            }
            Self::MissingAccuracy => f.write_str("Accuracy is required for coordinates."),
            Self::IncompleteReference => f.write_str(
                "A grid reference, easting/northing or latitude/longitude is required.",
            ),
            Self::ConflictingReference => f.write_str(
                "Only one of grid reference, easting/northing or latitude/longitude may be given.",
            ),
            Self::Projection(message) => write!(f, "Coordinate projection failed: {message}."),
        }
    }
}

impl Error for SrefError {}
