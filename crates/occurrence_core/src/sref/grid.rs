//! Shared grid codec contract and suffix arithmetic.
//!
//! # Responsibility
//! - Define the `GridCodec` contract implemented by every national grid.
//! - Encode/decode the numeric and tetrad suffix that follows the square
//!   letters, which is identical across grids.
//!
//! # Invariants
//! - A suffix is empty, an even run of at most 10 digits, or a tetrad
//!   (2 digits + 1 letter other than `O`).
//! - Tetrad letters run `A`..`Z` without `O`, bottom to top within each
//!   column, west to east.

use super::{GridSystem, SrefError, SrefResult};

/// Accuracies (metres) a grid reference can express.
pub const SUPPORTED_ACCURACIES: [u32; 7] = [100_000, 10_000, 2_000, 1_000, 100, 10, 1];

const SQUARE_METRES: u64 = 100_000;
const TETRAD_METRES: u64 = 2_000;
const HECTAD_METRES: u64 = 10_000;

// Square-letter matrix shared by the two-letter and one-letter grids.
const SQUARE_LETTERS: &[u8; 25] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// South-west corner of a grid square and its size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoordinate {
    pub easting: f64,
    pub northing: f64,
    pub accuracy: u32,
}

/// Offset part of a validated grid reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suffix {
    /// Bare 100km square.
    Square,
    /// Paired digits of `width` each, in units of the accuracy.
    Digits {
        easting: u32,
        northing: u32,
        width: u32,
    },
    /// 2km DINTY tetrad inside a 10km square.
    Tetrad {
        easting: u32,
        northing: u32,
        letter: char,
    },
}

impl Suffix {
    pub fn accuracy(&self) -> u32 {
        match self {
            Self::Square => 100_000,
            Self::Tetrad { .. } => 2_000,
            Self::Digits { width, .. } => 10u32.pow(5 - width),
        }
    }

    /// Offset in metres from the south-west corner of the 100km square.
    fn offset(&self) -> (u64, u64) {
        match *self {
            Self::Square => (0, 0),
            Self::Digits {
                easting, northing, ..
            } => {
                let scale = u64::from(self.accuracy());
                (u64::from(easting) * scale, u64::from(northing) * scale)
            }
            Self::Tetrad {
                easting,
                northing,
                letter,
            } => {
                let (col, row) = tetrad_offset(letter).unwrap_or((0, 0));
                (
                    u64::from(easting) * HECTAD_METRES + u64::from(col) * TETRAD_METRES,
                    u64::from(northing) * HECTAD_METRES + u64::from(row) * TETRAD_METRES,
                )
            }
        }
    }
}

/// A grid reference that passed validation for one grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCode {
    /// Canonical text: uppercase, no whitespace.
    pub gridref: String,
    pub system: GridSystem,
    pub prefix_len: usize,
    pub suffix: Suffix,
}

impl GridCode {
    pub fn accuracy(&self) -> u32 {
        self.suffix.accuracy()
    }

    /// 100km square letters.
    pub fn km100(&self) -> &str {
        &self.gridref[..self.prefix_len]
    }

    /// First easting digit followed by first northing digit; `None` for a
    /// bare 100km square.
    pub fn km10(&self) -> Option<String> {
        let digits = &self.gridref[self.prefix_len..];
        match self.suffix {
            Suffix::Square => None,
            Suffix::Tetrad { .. } => Some(digits[..2].to_string()),
            Suffix::Digits { width, .. } => {
                let width = width as usize;
                Some(format!("{}{}", &digits[..1], &digits[width..width + 1]))
            }
        }
    }
}

/// Planar bounds of a grid: `min` inclusive, `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_easting: f64,
    pub max_easting: f64,
    pub min_northing: f64,
    pub max_northing: f64,
}

impl Envelope {
    pub fn contains(&self, easting: f64, northing: f64) -> bool {
        easting >= self.min_easting
            && easting < self.max_easting
            && northing >= self.min_northing
            && northing < self.max_northing
    }
}

/// String/coordinate conversion for one national grid.
///
/// Implementors only describe their square lettering and envelope; the
/// provided methods implement encoding and validation on top of that.
pub trait GridCodec: Sync {
    fn system(&self) -> GridSystem;

    /// Number of letters naming a 100km square.
    fn prefix_len(&self) -> usize;

    fn envelope(&self) -> Envelope;

    /// Letters of the 100km square with the given absolute indices
    /// (`easting / 100000`, `northing / 100000`).
    fn square_letters(&self, easting_index: u32, northing_index: u32) -> Option<String>;

    /// Absolute 100km square indices named by `prefix`.
    fn square_index(&self, prefix: &str) -> Option<(u32, u32)>;

    /// Whether `prefix` names a square inside this grid's envelope.
    fn is_allowed_square(&self, prefix: &str) -> bool {
        match self.square_index(prefix) {
            Some((east, north)) => self.envelope().contains(
                f64::from(east) * SQUARE_METRES as f64,
                f64::from(north) * SQUARE_METRES as f64,
            ),
            None => false,
        }
    }

    /// Encodes a planar coordinate as a grid reference of `accuracy` metres.
    fn encode(&self, easting: f64, northing: f64, accuracy: u32) -> SrefResult<String> {
        check_accuracy(accuracy)?;
        let out_of_bounds = || SrefError::OutOfBounds {
            system: self.system(),
            easting,
            northing,
        };
        if !easting.is_finite() || !northing.is_finite() {
            return Err(out_of_bounds());
        }
        if !self.envelope().contains(easting, northing) {
            return Err(out_of_bounds());
        }

        let east = easting.trunc() as u64;
        let north = northing.trunc() as u64;
        let prefix = self
            .square_letters((east / SQUARE_METRES) as u32, (north / SQUARE_METRES) as u32)
            .ok_or_else(out_of_bounds)?;
        let suffix = encode_suffix(east % SQUARE_METRES, north % SQUARE_METRES, accuracy);
        Ok(format!("{prefix}{suffix}"))
    }

    /// Validates a grid reference and returns its canonical form.
    fn decode(&self, gridref: &str) -> SrefResult<String> {
        Ok(self.parse(gridref)?.gridref)
    }

    /// Validates a grid reference into its parts.
    fn parse(&self, gridref: &str) -> SrefResult<GridCode> {
        let normalized = normalize_text(gridref);
        let malformed = || SrefError::Malformed(gridref.trim().to_string());
        let prefix_len = self.prefix_len();
        if !normalized.is_ascii() || normalized.len() < prefix_len {
            return Err(malformed());
        }

        let (prefix, suffix_text) = normalized.split_at(prefix_len);
        if !prefix.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(malformed());
        }
        if !self.is_allowed_square(prefix) {
            return Err(SrefError::InvalidSquare {
                system: self.system(),
                gridref: normalized,
            });
        }
        let suffix = parse_suffix(suffix_text).ok_or_else(malformed)?;

        Ok(GridCode {
            gridref: normalized,
            system: self.system(),
            prefix_len,
            suffix,
        })
    }

    /// South-west corner and size of the square named by `gridref`.
    fn to_coordinate(&self, gridref: &str) -> SrefResult<GridCoordinate> {
        let code = self.parse(gridref)?;
        let (east, north) = self
            .square_index(code.km100())
            .ok_or_else(|| SrefError::InvalidSquare {
                system: self.system(),
                gridref: code.gridref.clone(),
            })?;
        let (offset_east, offset_north) = code.suffix.offset();
        Ok(GridCoordinate {
            easting: (u64::from(east) * SQUARE_METRES + offset_east) as f64,
            northing: (u64::from(north) * SQUARE_METRES + offset_north) as f64,
            accuracy: code.accuracy(),
        })
    }
}

/// Rejects accuracies a grid reference cannot express.
pub fn check_accuracy(accuracy: u32) -> SrefResult<()> {
    if SUPPORTED_ACCURACIES.contains(&accuracy) {
        Ok(())
    } else {
        Err(SrefError::InvalidAccuracy(accuracy))
    }
}

/// Strips all whitespace and uppercases.
pub fn normalize_text(gridref: &str) -> String {
    gridref
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Letter at `index` of the 5×5 square matrix (row-major from the top-left).
pub(crate) fn square_letter(index: u32) -> Option<char> {
    SQUARE_LETTERS.get(index as usize).map(|b| char::from(*b))
}

/// Index of `letter` in the 5×5 square matrix.
pub(crate) fn square_letter_index(letter: char) -> Option<u32> {
    SQUARE_LETTERS
        .iter()
        .position(|b| char::from(*b) == letter)
        .map(|index| index as u32)
}

/// Tetrad letter for the 2km cell at (`col`, `row`) of a 10km square.
pub fn tetrad_letter(col: u32, row: u32) -> char {
    let mut code = 65 + row + 5 * col;
    if code >= u32::from(b'O') {
        code += 1;
    }
    char::from_u32(code).unwrap_or('Z')
}

/// (`col`, `row`) of the 2km cell named by a tetrad letter.
pub fn tetrad_offset(letter: char) -> Option<(u32, u32)> {
    if !letter.is_ascii_uppercase() || letter == 'O' {
        return None;
    }
    let mut index = letter as u32 - 65;
    if letter > 'O' {
        index -= 1;
    }
    Some((index / 5, index % 5))
}

fn encode_suffix(east: u64, north: u64, accuracy: u32) -> String {
    match accuracy {
        100_000 => String::new(),
        2_000 => format!(
            "{}{}{}",
            east / HECTAD_METRES,
            north / HECTAD_METRES,
            tetrad_letter(
                ((east % HECTAD_METRES) / TETRAD_METRES) as u32,
                ((north % HECTAD_METRES) / TETRAD_METRES) as u32,
            )
        ),
        _ => {
            let unit = u64::from(accuracy);
            let width = digit_width(accuracy);
            format!("{:0width$}{:0width$}", east / unit, north / unit)
        }
    }
}

fn digit_width(accuracy: u32) -> usize {
    match accuracy {
        10_000 => 1,
        1_000 => 2,
        100 => 3,
        10 => 4,
        _ => 5,
    }
}

fn parse_suffix(text: &str) -> Option<Suffix> {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return Some(Suffix::Square);
    }

    if bytes.len() == 3
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2].is_ascii_uppercase()
    {
        let letter = char::from(bytes[2]);
        tetrad_offset(letter)?;
        return Some(Suffix::Tetrad {
            easting: u32::from(bytes[0] - b'0'),
            northing: u32::from(bytes[1] - b'0'),
            letter,
        });
    }

    if bytes.len() % 2 != 0 || bytes.len() > 10 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    let width = bytes.len() / 2;
    Some(Suffix::Digits {
        easting: text[..width].parse().ok()?,
        northing: text[width..].parse().ok()?,
        width: width as u32,
    })
}
