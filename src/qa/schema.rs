//! Landsat QA flag schema
//!
//! Static, enum-keyed tables mapping every QA band and sensor family to the
//! named flags it encodes and the bit positions behind each flag. A flag with
//! more than one bit is a composite flag and is only set when all of its bits
//! are set.

use std::fmt;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::errors::{QaError, QaResult};

/// Raw encoded sample value of a QA raster
pub type RasterValue = u32;

/// Sensor families sharing one bit-flag layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sensor {
    /// Landsat 4-5 TM and Landsat 7 ETM+
    L47,
    /// Landsat 8 OLI/TIRS
    L8,
}

/// QA bands understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Band {
    Bqa,
    PixelQa,
    RadsatQa,
    SrAerosol,
    SrCloudQa,
}

/// Confidence or severity word carried by a flag name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Ungraded,
    Low,
    Medium,
    High,
}

/// What a flag describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Fill,
    Clear,
    Water,
    Cloud,
    CloudShadow,
    Snow,
    Cirrus,
    Terrain,
    Ddv,
    AdjacentCloud,
    DroppedPixel,
    Radiometric,
    Saturation,
    Aerosol,
}

/// A named QA flag and the bits that encode it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flag {
    pub name: &'static str,
    pub bits: &'static [u8],
    pub grade: Grade,
    pub topic: Topic,
}

impl Flag {
    const fn new(name: &'static str, bits: &'static [u8], grade: Grade, topic: Topic) -> Self {
        Flag { name, bits, grade, topic }
    }

    /// Whether this flag needs more than one bit set
    pub fn is_composite(&self) -> bool {
        self.bits.len() > 1
    }

    /// Lower snake form of the flag name, as used in output file names
    pub fn snake_name(&self) -> String {
        to_lower_snake(self.name)
    }

    /// Tests the flag against a value
    ///
    /// # Returns
    /// `None` when one of the bits lies outside the value width
    pub fn matches(&self, value: RasterValue) -> Option<bool> {
        bits_match(value, self.bits)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.name, self.bits)
    }
}

use Grade::{High, Low, Medium, Ungraded};
use Topic::*;

const PIXEL_QA_L47: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Clear", &[1], Ungraded, Clear),
    Flag::new("Water", &[2], Ungraded, Water),
    Flag::new("Cloud Shadow", &[3], Ungraded, CloudShadow),
    Flag::new("Snow", &[4], Ungraded, Snow),
    Flag::new("Cloud", &[5], Ungraded, Cloud),
    Flag::new("Low Cloud Confidence", &[6], Low, Cloud),
    Flag::new("Medium Cloud Confidence", &[7], Medium, Cloud),
    Flag::new("High Cloud Confidence", &[6, 7], High, Cloud),
];

const PIXEL_QA_L8: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Clear", &[1], Ungraded, Clear),
    Flag::new("Water", &[2], Ungraded, Water),
    Flag::new("Cloud Shadow", &[3], Ungraded, CloudShadow),
    Flag::new("Snow", &[4], Ungraded, Snow),
    Flag::new("Cloud", &[5], Ungraded, Cloud),
    Flag::new("Low Cloud Confidence", &[6], Low, Cloud),
    Flag::new("Medium Cloud Confidence", &[7], Medium, Cloud),
    Flag::new("High Cloud Confidence", &[6, 7], High, Cloud),
    Flag::new("Low Cirrus Confidence", &[8], Low, Cirrus),
    Flag::new("High Cirrus Confidence", &[8, 9], High, Cirrus),
    Flag::new("Terrain Occlusion", &[10], Ungraded, Terrain),
];

const SR_CLOUD_QA_L47: &[Flag] = &[
    Flag::new("DDV", &[0], Ungraded, Ddv),
    Flag::new("Cloud", &[1], Ungraded, Cloud),
    Flag::new("Cloud Shadow", &[2], Ungraded, CloudShadow),
    Flag::new("Adjacent to Cloud", &[3], Ungraded, AdjacentCloud),
    Flag::new("Snow", &[4], Ungraded, Snow),
    Flag::new("Water", &[5], Ungraded, Water),
];

const RADSAT_QA_L47: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Band 1 Data Saturation", &[1], Ungraded, Saturation),
    Flag::new("Band 2 Data Saturation", &[2], Ungraded, Saturation),
    Flag::new("Band 3 Data Saturation", &[3], Ungraded, Saturation),
    Flag::new("Band 4 Data Saturation", &[4], Ungraded, Saturation),
    Flag::new("Band 5 Data Saturation", &[5], Ungraded, Saturation),
    Flag::new("Band 6 Data Saturation", &[6], Ungraded, Saturation),
    Flag::new("Band 7 Data Saturation", &[7], Ungraded, Saturation),
];

const RADSAT_QA_L8: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Band 1 Data Saturation", &[1], Ungraded, Saturation),
    Flag::new("Band 2 Data Saturation", &[2], Ungraded, Saturation),
    Flag::new("Band 3 Data Saturation", &[3], Ungraded, Saturation),
    Flag::new("Band 4 Data Saturation", &[4], Ungraded, Saturation),
    Flag::new("Band 5 Data Saturation", &[5], Ungraded, Saturation),
    Flag::new("Band 6 Data Saturation", &[6], Ungraded, Saturation),
    Flag::new("Band 7 Data Saturation", &[7], Ungraded, Saturation),
    Flag::new("Band 9 Data Saturation", &[9], Ungraded, Saturation),
    Flag::new("Band 10 Data Saturation", &[10], Ungraded, Saturation),
    Flag::new("Band 11 Data Saturation", &[11], Ungraded, Saturation),
];

const BQA_L47: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Dropped Pixel", &[1], Ungraded, DroppedPixel),
    Flag::new("Low Radiometric Saturation", &[2], Low, Radiometric),
    Flag::new("Medium Radiometric Saturation", &[3], Medium, Radiometric),
    Flag::new("High Radiometric Saturation", &[2, 3], High, Radiometric),
    Flag::new("Cloud", &[4], Ungraded, Cloud),
    Flag::new("Low Cloud Confidence", &[5], Low, Cloud),
    Flag::new("Medium Cloud Confidence", &[6], Medium, Cloud),
    Flag::new("High Cloud Confidence", &[5, 6], High, Cloud),
    Flag::new("Low Cloud Shadow Confidence", &[7], Low, CloudShadow),
    Flag::new("High Cloud Shadow Confidence", &[7, 8], High, CloudShadow),
    Flag::new("Low Snow/Ice Confidence", &[9], Low, Snow),
    Flag::new("High Snow/Ice Confidence", &[9, 10], High, Snow),
];

const BQA_L8: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Dropped Pixel", &[1], Ungraded, DroppedPixel),
    Flag::new("Low Radiometric Saturation", &[2], Low, Radiometric),
    Flag::new("Medium Radiometric Saturation", &[3], Medium, Radiometric),
    Flag::new("High Radiometric Saturation", &[2, 3], High, Radiometric),
    Flag::new("Cloud", &[4], Ungraded, Cloud),
    Flag::new("Low Cloud Confidence", &[5], Low, Cloud),
    Flag::new("Medium Cloud Confidence", &[6], Medium, Cloud),
    Flag::new("High Cloud Confidence", &[5, 6], High, Cloud),
    Flag::new("Low Cloud Shadow Confidence", &[7], Low, CloudShadow),
    Flag::new("High Cloud Shadow Confidence", &[7, 8], High, CloudShadow),
    Flag::new("Low Snow/Ice Confidence", &[9], Low, Snow),
    Flag::new("High Snow/Ice Confidence", &[9, 10], High, Snow),
    Flag::new("Low Cirrus Confidence", &[11], Low, Cirrus),
    Flag::new("High Cirrus Confidence", &[11, 12], High, Cirrus),
];

const SR_AEROSOL_L8: &[Flag] = &[
    Flag::new("Fill", &[0], Ungraded, Fill),
    Flag::new("Aerosol Retrieval - Valid", &[1], Ungraded, Aerosol),
    Flag::new("Aerosol Retrieval - Interpolated", &[2], Ungraded, Aerosol),
    Flag::new("Water", &[3], Ungraded, Water),
    Flag::new("Low Aerosol", &[6], Low, Aerosol),
    Flag::new("Medium Aerosol", &[7], Medium, Aerosol),
    Flag::new("High Aerosol", &[6, 7], High, Aerosol),
];

lazy_static! {
    static ref L47_FILENAME: Regex = Regex::new(r"LE07|LT05|LT04").unwrap();
    static ref L8_FILENAME: Regex = Regex::new(r"LC08|LT08|LO08").unwrap();
}

/// Band name patterns checked in order against file names
const BAND_FILENAME_TOKENS: &[(Band, &[&str])] = &[
    (Band::Bqa, &["bqa", "BQA"]),
    (Band::PixelQa, &["pixel_qa", "PIXELQA"]),
    (Band::RadsatQa, &["radsat_qa", "RADSATQA"]),
    (Band::SrAerosol, &["sr_aerosol", "SRAEROSOLQA"]),
    (Band::SrCloudQa, &["sr_cloud_qa", "SRCLOUDQA"]),
];

impl Sensor {
    /// All sensor families
    pub fn all() -> &'static [Sensor] {
        &[Sensor::L47, Sensor::L8]
    }

    /// Parses a display name ("Landsat 8") or canonical token ("L8")
    pub fn parse(input: &str) -> QaResult<Sensor> {
        match input.trim() {
            "Landsat 4-5, 7" | "L47" => Ok(Sensor::L47),
            "Landsat 8" | "L8" => Ok(Sensor::L8),
            _ => Err(QaError::InvalidSensor(input.to_string())),
        }
    }

    /// Name shown to operators
    pub fn display_name(&self) -> &'static str {
        match self {
            Sensor::L47 => "Landsat 4-5, 7",
            Sensor::L8 => "Landsat 8",
        }
    }

    /// QA bands offered for this sensor
    pub fn bands(&self) -> &'static [Band] {
        match self {
            Sensor::L47 => &[Band::Bqa, Band::PixelQa, Band::RadsatQa, Band::SrCloudQa],
            Sensor::L8 => &[Band::Bqa, Band::PixelQa, Band::RadsatQa, Band::SrAerosol],
        }
    }

    /// Infers the sensor from Landsat product identifiers in a file name
    pub fn infer_from_filename(filename: &str) -> Option<Sensor> {
        let sensor = if L47_FILENAME.is_match(filename) {
            Some(Sensor::L47)
        } else if L8_FILENAME.is_match(filename) {
            Some(Sensor::L8)
        } else {
            None
        };

        debug!("Sensor inferred from {}: {:?}", filename, sensor);
        sensor
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl Band {
    /// All QA bands
    pub fn all() -> &'static [Band] {
        &[Band::Bqa, Band::PixelQa, Band::RadsatQa, Band::SrAerosol, Band::SrCloudQa]
    }

    /// Parses a band name such as "pixel_qa" or "BQA"
    pub fn parse(input: &str) -> QaResult<Band> {
        let trimmed = input.trim();
        Band::all()
            .iter()
            .copied()
            .find(|band| band.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| QaError::UnknownBand(input.to_string()))
    }

    /// Product name of the band
    pub fn name(&self) -> &'static str {
        match self {
            Band::Bqa => "BQA",
            Band::PixelQa => "pixel_qa",
            Band::RadsatQa => "radsat_qa",
            Band::SrAerosol => "sr_aerosol",
            Band::SrCloudQa => "sr_cloud_qa",
        }
    }

    /// Infers the band from the product file name
    pub fn infer_from_filename(filename: &str) -> Option<Band> {
        let band = BAND_FILENAME_TOKENS
            .iter()
            .find(|(_, tokens)| tokens.iter().any(|t| filename.contains(t)))
            .map(|(band, _)| *band);

        debug!("Band inferred from {}: {:?}", filename, band);
        band
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Returns every flag defined for a band and sensor, in table order
///
/// # Arguments
/// * `band` - QA band
/// * `sensor` - Sensor family
///
/// # Returns
/// The flag table, or `UnsupportedCombination` when the band does not exist
/// for the sensor
pub fn all_flags(band: Band, sensor: Sensor) -> QaResult<&'static [Flag]> {
    match (band, sensor) {
        (Band::PixelQa, Sensor::L47) => Ok(PIXEL_QA_L47),
        (Band::PixelQa, Sensor::L8) => Ok(PIXEL_QA_L8),
        (Band::SrCloudQa, Sensor::L47) => Ok(SR_CLOUD_QA_L47),
        (Band::RadsatQa, Sensor::L47) => Ok(RADSAT_QA_L47),
        (Band::RadsatQa, Sensor::L8) => Ok(RADSAT_QA_L8),
        (Band::Bqa, Sensor::L47) => Ok(BQA_L47),
        (Band::Bqa, Sensor::L8) => Ok(BQA_L8),
        (Band::SrAerosol, Sensor::L8) => Ok(SR_AEROSOL_L8),
        (Band::SrCloudQa, Sensor::L8) | (Band::SrAerosol, Sensor::L47) => {
            Err(QaError::UnsupportedCombination { band, sensor })
        },
    }
}

/// Flags sorted by their bit lists, the order labels are built in
pub fn sorted_flags(band: Band, sensor: Sensor) -> QaResult<Vec<&'static Flag>> {
    let mut flags: Vec<&'static Flag> = all_flags(band, sensor)?.iter().collect();
    flags.sort_by(|a, b| a.bits.cmp(b.bits));
    Ok(flags)
}

/// Looks up a flag by name
///
/// Names match exactly first, then ignoring case, then by their lower snake
/// form ("high_cloud_confidence").
pub fn lookup(band: Band, sensor: Sensor, flag_name: &str) -> QaResult<&'static Flag> {
    let flags = all_flags(band, sensor)?;
    let wanted = flag_name.trim();

    flags.iter()
        .find(|f| f.name == wanted)
        .or_else(|| flags.iter().find(|f| f.name.eq_ignore_ascii_case(wanted)))
        .or_else(|| flags.iter().find(|f| f.snake_name() == to_lower_snake(wanted)))
        .ok_or_else(|| QaError::UnknownFlag {
            flag: flag_name.to_string(),
            band,
            sensor,
        })
}

/// Tests whether every listed bit is set in a value
///
/// # Returns
/// `Some(true)` if all bits are set, `Some(false)` otherwise, `None` if a bit
/// position cannot be read from a `RasterValue`
pub fn bits_match(value: RasterValue, bits: &[u8]) -> Option<bool> {
    let mut all_set = true;
    for &bit in bits {
        let shifted = value.checked_shr(bit as u32)?;
        all_set &= shifted & 1 == 1;
    }
    Some(all_set)
}

/// Lowercases a flag name and replaces separators with underscores
pub fn to_lower_snake(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '/' { '_' } else { c })
        .collect()
}
