//! Latitude/longitude to national grid transform.
//!
//! # Responsibility
//! - Classify a WGS84 position into a country by bounding box.
//! - Project the position onto that country's grid through a `Projector`.
//!
//! # Invariants
//! - Bounding boxes are tested Channel Islands, then Ireland, then Britain.
//! - Projection output is handed to the target grid codec unchanged.

use super::{Country, GridSystem, SrefError, SrefResult};

/// Latitude/longitude box, bounds inclusive.
struct BoundingBox {
    country: Country,
    min_latitude: f64,
    max_latitude: f64,
    min_longitude: f64,
    max_longitude: f64,
}

impl BoundingBox {
    fn contains(&self, latitude: f64, longitude: f64) -> bool {
        latitude >= self.min_latitude
            && latitude <= self.max_latitude
            && longitude >= self.min_longitude
            && longitude <= self.max_longitude
    }
}

const COUNTRY_BOXES: [BoundingBox; 4] = [
    BoundingBox {
        country: Country::ChannelIslands,
        min_latitude: 48.8,
        max_latitude: 49.8,
        min_longitude: -3.0,
        max_longitude: -1.8,
    },
    // Kintyre reaches into the Irish box; Rathlin and Fair Head stay outside it.
    BoundingBox {
        country: Country::Gb,
        min_latitude: 55.25,
        max_latitude: 56.0,
        min_longitude: -6.0,
        max_longitude: -5.0,
    },
    BoundingBox {
        country: Country::Ireland,
        min_latitude: 51.3,
        max_latitude: 55.45,
        min_longitude: -10.7,
        max_longitude: -5.4,
    },
    BoundingBox {
        country: Country::Gb,
        min_latitude: 49.8,
        max_latitude: 60.95,
        min_longitude: -8.7,
        max_longitude: 1.8,
    },
];

/// Returns the country whose bounding box first contains the position.
pub fn infer_country(latitude: f64, longitude: f64) -> SrefResult<Country> {
    check_lat_lon(latitude, longitude)?;
    COUNTRY_BOXES
        .iter()
        .find(|bounds| bounds.contains(latitude, longitude))
        .map(|bounds| bounds.country)
        .ok_or(SrefError::OutsideCoverage {
            latitude,
            longitude,
        })
}

pub(crate) fn check_lat_lon(latitude: f64, longitude: f64) -> SrefResult<()> {
    let valid = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);
    if valid {
        Ok(())
    } else {
        Err(SrefError::InvalidLatLon {
            latitude,
            longitude,
        })
    }
}

/// Projects WGS84 latitude/longitude onto a grid's planar coordinates.
pub trait Projector: Send + Sync {
    /// Returns `(easting, northing)` in metres.
    fn project(&self, latitude: f64, longitude: f64, system: GridSystem)
        -> SrefResult<(f64, f64)>;
}

/// Planar coordinate of a WGS84 position on the grid of its country.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub system: GridSystem,
    pub easting: f64,
    pub northing: f64,
}

/// Infers the country of a position and projects it onto that grid.
pub fn project_lat_lon(
    latitude: f64,
    longitude: f64,
    projector: &dyn Projector,
) -> SrefResult<Projected> {
    let system = infer_country(latitude, longitude)?.grid();
    let (easting, northing) = projector.project(latitude, longitude, system)?;
    Ok(Projected {
        system,
        easting,
        northing,
    })
}

struct Ellipsoid {
    a: f64,
    b: f64,
}

/// WGS84 to local datum shift, position-vector convention.
struct Helmert {
    tx: f64,
    ty: f64,
    tz: f64,
    /// Scale in parts per million.
    s: f64,
    /// Rotations in arc-seconds.
    rx: f64,
    ry: f64,
    rz: f64,
}

struct TransverseMercator {
    ellipsoid: Ellipsoid,
    helmert: Helmert,
    scale: f64,
    origin_latitude: f64,
    origin_longitude: f64,
    false_easting: f64,
    false_northing: f64,
}

const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

const OSGB36: TransverseMercator = TransverseMercator {
    ellipsoid: Ellipsoid {
        a: 6_377_563.396,
        b: 6_356_256.909,
    },
    helmert: Helmert {
        tx: -446.448,
        ty: 125.157,
        tz: -542.060,
        s: 20.4894,
        rx: -0.1502,
        ry: -0.2470,
        rz: -0.8421,
    },
    scale: 0.999_601_271_7,
    origin_latitude: 49.0,
    origin_longitude: -2.0,
    false_easting: 400_000.0,
    false_northing: -100_000.0,
};

const IRISH_GRID: TransverseMercator = TransverseMercator {
    ellipsoid: Ellipsoid {
        a: 6_377_340.189,
        b: 6_356_034.448,
    },
    helmert: Helmert {
        tx: -482.530,
        ty: 130.596,
        tz: -564.557,
        s: -8.150,
        rx: -1.042,
        ry: -0.214,
        rz: -0.631,
    },
    scale: 1.000_035,
    origin_latitude: 53.5,
    origin_longitude: -8.0,
    false_easting: 200_000.0,
    false_northing: 250_000.0,
};

const UTM30_ED50: TransverseMercator = TransverseMercator {
    ellipsoid: Ellipsoid {
        a: 6_378_388.0,
        b: 6_356_911.946,
    },
    helmert: Helmert {
        tx: 89.5,
        ty: 93.8,
        tz: 123.1,
        s: -1.2,
        rx: 0.0,
        ry: 0.0,
        rz: 0.156,
    },
    scale: 0.9996,
    origin_latitude: 0.0,
    origin_longitude: -3.0,
    false_easting: 500_000.0,
    false_northing: 0.0,
};

/// Built-in projector: Helmert datum shift followed by the transverse
/// Mercator projection of the target grid. Good to a few metres.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelmertProjector;

impl Projector for HelmertProjector {
    fn project(
        &self,
        latitude: f64,
        longitude: f64,
        system: GridSystem,
    ) -> SrefResult<(f64, f64)> {
        check_lat_lon(latitude, longitude)?;
        let grid = match system {
            GridSystem::Gb => &OSGB36,
            GridSystem::Ireland => &IRISH_GRID,
            GridSystem::ChannelIslands => &UTM30_ED50,
        };
        let (x, y, z) = to_cartesian(&WGS84, latitude.to_radians(), longitude.to_radians());
        let (x, y, z) = grid.helmert.apply(x, y, z);
        let (lat, lon) = to_geodetic(&grid.ellipsoid, x, y, z);
        let (easting, northing) = grid.project(lat, lon);
        if easting.is_finite() && northing.is_finite() {
            Ok((easting, northing))
        } else {
            Err(SrefError::Projection(format!(
                "no planar coordinate for {latitude}, {longitude}"
            )))
        }
    }
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }
}

impl Helmert {
    fn apply(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let arcsec = std::f64::consts::PI / (180.0 * 3600.0);
        let s = 1.0 + self.s * 1e-6;
        let (rx, ry, rz) = (self.rx * arcsec, self.ry * arcsec, self.rz * arcsec);
        (
            self.tx + s * x - rz * y + ry * z,
            self.ty + rz * x + s * y - rx * z,
            self.tz - ry * x + rx * y + s * z,
        )
    }
}

fn to_cartesian(ellipsoid: &Ellipsoid, lat: f64, lon: f64) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
    (
        nu * lat.cos() * lon.cos(),
        nu * lat.cos() * lon.sin(),
        nu * (1.0 - e2) * lat.sin(),
    )
}

fn to_geodetic(ellipsoid: &Ellipsoid, x: f64, y: f64, z: f64) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = (x * x + y * y).sqrt();
    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let nu = ellipsoid.a / (1.0 - e2 * lat.sin().powi(2)).sqrt();
        let next = (z + e2 * nu * lat.sin()).atan2(p);
        let converged = (next - lat).abs() < 1e-12;
        lat = next;
        if converged {
            break;
        }
    }
    (lat, y.atan2(x))
}

impl TransverseMercator {
    fn project(&self, lat: f64, lon: f64) -> (f64, f64) {
        let Ellipsoid { a, b } = self.ellipsoid;
        let f0 = self.scale;
        let lat0 = self.origin_latitude.to_radians();
        let lon0 = self.origin_longitude.to_radians();
        let e2 = self.ellipsoid.e2();
        let n = (a - b) / (a + b);
        let (n2, n3) = (n * n, n * n * n);

        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let tan2 = lat.tan().powi(2);
        let nu = a * f0 / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        let rho = a * f0 * (1.0 - e2) / (1.0 - e2 * sin_lat * sin_lat).powf(1.5);
        let eta2 = nu / rho - 1.0;

        let dlat = lat - lat0;
        let slat = lat + lat0;
        let meridional = b
            * f0
            * ((1.0 + n + 1.25 * n2 + 1.25 * n3) * dlat
                - (3.0 * n + 3.0 * n2 + 2.625 * n3) * dlat.sin() * slat.cos()
                + (1.875 * n2 + 1.875 * n3) * (2.0 * dlat).sin() * (2.0 * slat).cos()
                - (35.0 / 24.0) * n3 * (3.0 * dlat).sin() * (3.0 * slat).cos());

        let i = meridional + self.false_northing;
        let ii = nu / 2.0 * sin_lat * cos_lat;
        let iii = nu / 24.0 * sin_lat * cos_lat.powi(3) * (5.0 - tan2 + 9.0 * eta2);
        let iiia = nu / 720.0 * sin_lat * cos_lat.powi(5) * (61.0 - 58.0 * tan2 + tan2 * tan2);
        let iv = nu * cos_lat;
        let v = nu / 6.0 * cos_lat.powi(3) * (nu / rho - tan2);
        let vi = nu / 120.0
            * cos_lat.powi(5)
            * (5.0 - 18.0 * tan2 + tan2 * tan2 + 14.0 * eta2 - 58.0 * tan2 * eta2);

        let dlon = lon - lon0;
        let northing = i + ii * dlon.powi(2) + iii * dlon.powi(4) + iiia * dlon.powi(6);
        let easting = self.false_easting + iv * dlon + v * dlon.powi(3) + vi * dlon.powi(5);
        (easting, northing)
    }
}
