//! Unified spatial reference value.

use super::channel::has_channel_islands_prefix;
use super::grid::{check_accuracy, normalize_text, GridCode};
use super::transform::{check_lat_lon, project_lat_lon, Projector};
use super::{Country, GridSystem, SrefError, SrefResult, SrefSystem};
use crate::model::record::SrefInput;
use once_cell::sync::OnceCell;

/// A validated spatial reference on one of the national grids.
///
/// Built from exactly one of a grid reference, planar coordinates or a
/// latitude/longitude. Immutable once built; the 100km and 10km square
/// identifiers are derived on first access and cached.
#[derive(Debug, Clone)]
pub struct SpatialReference {
    code: GridCode,
    easting: f64,
    northing: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    km100: OnceCell<String>,
    km10: OnceCell<Option<String>>,
}

impl SpatialReference {
    /// Validates a grid reference. `Combined` (and lat/lon) systems are
    /// resolved from the square letters.
    pub fn from_gridref(system: SrefSystem, gridref: &str) -> SrefResult<Self> {
        let grid = match system {
            SrefSystem::Grid(grid) => grid,
            SrefSystem::Combined | SrefSystem::LatLon => disambiguate(gridref),
        };
        let codec = grid.codec();
        let code = codec.parse(gridref)?;
        let corner = codec.to_coordinate(&code.gridref)?;
        Ok(Self::build(code, corner.easting, corner.northing, None, None))
    }

    /// Encodes planar coordinates of a known grid.
    pub fn from_easting_northing(
        system: SrefSystem,
        easting: f64,
        northing: f64,
        accuracy: u32,
    ) -> SrefResult<Self> {
        let SrefSystem::Grid(grid) = system else {
            return Err(SrefError::AmbiguousSystem);
        };
        let codec = grid.codec();
        let gridref = codec.encode(easting, northing, accuracy)?;
        let code = codec.parse(&gridref)?;
        Ok(Self::build(code, easting, northing, None, None))
    }

    /// Projects a WGS84 position onto the grid of the country it falls in.
    pub fn from_lat_lon(
        latitude: f64,
        longitude: f64,
        accuracy: u32,
        projector: &dyn Projector,
    ) -> SrefResult<Self> {
        check_lat_lon(latitude, longitude)?;
        check_accuracy(accuracy)?;
        let projected = project_lat_lon(latitude, longitude, projector)?;
        let codec = projected.system.codec();
        let gridref = codec.encode(projected.easting, projected.northing, accuracy)?;
        let code = codec.parse(&gridref)?;
        Ok(Self::build(
            code,
            projected.easting,
            projected.northing,
            Some(latitude),
            Some(longitude),
        ))
    }

    /// Builds from the boundary input, which must carry exactly one form.
    pub fn from_input(input: &SrefInput, projector: &dyn Projector) -> SrefResult<Self> {
        let system = SrefSystem::from_srid(input.srid)?;
        let gridref = input
            .gridref
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());
        let planar = input.easting.zip(input.northing);
        let geodetic = input.latitude.zip(input.longitude);

        match (gridref, planar, geodetic) {
            (Some(gridref), None, None) => Self::from_gridref(system, gridref),
            (None, Some((easting, northing)), None) => {
                let accuracy = input.accuracy.ok_or(SrefError::MissingAccuracy)?;
                Self::from_easting_northing(system, easting, northing, accuracy)
            }
            (None, None, Some((latitude, longitude))) => {
                let accuracy = input.accuracy.ok_or(SrefError::MissingAccuracy)?;
                Self::from_lat_lon(latitude, longitude, accuracy, projector)
            }
            (None, None, None) => Err(SrefError::IncompleteReference),
            _ => Err(SrefError::ConflictingReference),
        }
    }

    fn build(
        code: GridCode,
        easting: f64,
        northing: f64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Self {
        Self {
            code,
            easting,
            northing,
            latitude,
            longitude,
            km100: OnceCell::new(),
            km10: OnceCell::new(),
        }
    }

    pub fn system(&self) -> GridSystem {
        self.code.system
    }

    pub fn country(&self) -> Country {
        self.code.system.country()
    }

    /// Canonical grid reference.
    pub fn gridref(&self) -> &str {
        &self.code.gridref
    }

    /// Size in metres of the square the reference names.
    pub fn accuracy(&self) -> u32 {
        self.code.accuracy()
    }

    pub fn easting(&self) -> f64 {
        self.easting
    }

    pub fn northing(&self) -> f64 {
        self.northing
    }

    pub fn latitude(&self) -> Option<f64> {
        self.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// Letters of the 100km square, e.g. `TL` or `H`.
    pub fn km100(&self) -> &str {
        self.km100.get_or_init(|| self.code.km100().to_string())
    }

    /// Digits of the 10km square within `km100`, e.g. `13`; `None` when the
    /// reference is coarser than 10km.
    pub fn km10(&self) -> Option<&str> {
        self.km10.get_or_init(|| self.code.km10()).as_deref()
    }
}

impl PartialEq for SpatialReference {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

/// Picks the grid of a reference given without a system.
fn disambiguate(gridref: &str) -> GridSystem {
    let normalized = normalize_text(gridref);
    if has_channel_islands_prefix(&normalized) {
        return GridSystem::ChannelIslands;
    }
    match normalized.chars().nth(1) {
        None => GridSystem::Ireland,
        Some(second) if second.is_ascii_digit() => GridSystem::Ireland,
        Some(_) => GridSystem::Gb,
    }
}

#[cfg(test)]
mod tests {
    use super::disambiguate;
    use crate::sref::GridSystem;

    #[test]
    fn combined_references_pick_their_grid() {
        assert_eq!(disambiguate("WV 5050"), GridSystem::ChannelIslands);
        assert_eq!(disambiguate("wa12"), GridSystem::ChannelIslands);
        assert_eq!(disambiguate("H1234"), GridSystem::Ireland);
        assert_eq!(disambiguate("H"), GridSystem::Ireland);
        assert_eq!(disambiguate("TL1234"), GridSystem::Gb);
        assert_eq!(disambiguate("SV"), GridSystem::Gb);
    }
}
