//! Flag extraction
//!
//! Selects the raster values carrying requested flags. Each flag yields the
//! set of values that satisfy it, or all sets are merged into one when the
//! caller asks for a combined output.

use std::collections::BTreeSet;
use std::path::Path;

use log::{debug, info};

use crate::errors::QaResult;
use crate::qa::schema::{self, Band, Flag, RasterValue, Sensor};

/// One extraction invocation
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub sensor: Sensor,
    pub band: Band,
    /// Requested flag names, possibly quoted
    pub flags: Vec<String>,
    pub combine: bool,
    /// Output path prefix; the flag name and input extension are appended
    pub basename: String,
}

/// Values matched by one flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagMatch {
    pub flag: &'static Flag,
    pub values: BTreeSet<RasterValue>,
}

/// Result of an extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// One value set per requested flag, in request order
    PerFlag(Vec<FlagMatch>),
    /// Union of every requested flag's values
    Combined(BTreeSet<RasterValue>),
}

impl Extraction {
    /// All values matched by any requested flag
    pub fn matched(&self) -> BTreeSet<RasterValue> {
        match self {
            Extraction::PerFlag(matches) => matches.iter()
                .flat_map(|m| m.values.iter().copied())
                .collect(),
            Extraction::Combined(values) => values.clone(),
        }
    }
}

/// Strips surrounding whitespace and a wrapping pair of double quotes
///
/// A lone leading or trailing quote is kept.
pub fn unquote(flag: &str) -> &str {
    let trimmed = flag.trim();
    trimmed.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .map_or(trimmed, str::trim)
}

/// Splits a `;`-separated flag list, dropping single quotes and empty items
pub fn split_flag_list(list: &str) -> Vec<String> {
    list.split(';')
        .map(|item| item.replace('\'', ""))
        .map(|item| unquote(&item).to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Resolves every requested flag before any matching takes place
pub fn resolve_flags<S: AsRef<str>>(band: Band, sensor: Sensor, requested: &[S]) -> QaResult<Vec<&'static Flag>> {
    requested.iter()
        .map(|name| schema::lookup(band, sensor, unquote(name.as_ref())))
        .collect()
}

/// Values from `values` that satisfy a flag
///
/// Values whose bits cannot be read never match.
pub fn matching_values(values: &BTreeSet<RasterValue>, flag: &Flag) -> BTreeSet<RasterValue> {
    values.iter()
        .copied()
        .filter(|v| flag.matches(*v).unwrap_or(false))
        .collect()
}

/// Extracts the values carrying the requested flags
///
/// # Arguments
/// * `values` - Unique values present in the raster
/// * `band` - QA band
/// * `sensor` - Sensor family
/// * `requested` - Flag names, possibly wrapped in double quotes
/// * `combine` - Merge all matches into a single set
///
/// # Returns
/// The per-flag or combined matches; fails with `UnknownFlag` if any name is
/// not defined for the band
pub fn extract<S: AsRef<str>>(
    values: &BTreeSet<RasterValue>,
    band: Band,
    sensor: Sensor,
    requested: &[S],
    combine: bool,
) -> QaResult<Extraction> {
    let flags = resolve_flags(band, sensor, requested)?;
    info!("Extracting {} flag(s) from {} unique values", flags.len(), values.len());

    let matches: Vec<FlagMatch> = flags.into_iter()
        .map(|flag| {
            let matched = matching_values(values, flag);
            debug!("Flag {} matched {} value(s)", flag.name, matched.len());
            FlagMatch { flag, values: matched }
        })
        .collect();

    if combine {
        let merged = matches.into_iter().flat_map(|m| m.values).collect();
        Ok(Extraction::Combined(merged))
    } else {
        Ok(Extraction::PerFlag(matches))
    }
}

/// Builds the output path for an extracted flag
///
/// `{basename}_{flag_lower_snake}{extension}`
pub fn output_name(basename: &str, flag: &Flag, extension: &str) -> String {
    format!("{}_{}{}", basename, flag.snake_name(), extension)
}

/// Builds the output path for a combined extraction
pub fn combined_output_name(basename: &str, extension: &str) -> String {
    format!("{}_combine{}", basename, extension)
}

/// Extension of the input raster including the dot, or empty
pub fn input_extension(input: &Path) -> String {
    input.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QaError;
    use crate::qa::decoder::Decoder;
    use proptest::prelude::*;

    fn values(items: &[RasterValue]) -> BTreeSet<RasterValue> {
        items.iter().copied().collect()
    }

    #[test]
    fn per_flag_extraction() {
        let unique = values(&[1, 2, 66, 130, 194, 322, 480]);
        let result = extract(&unique, Band::PixelQa, Sensor::L8, &["Clear", "\"High Cloud Confidence\""], false)
            .unwrap();

        match result {
            Extraction::PerFlag(matches) => {
                assert_eq!(matches.len(), 2);
                assert_eq!(matches[0].flag.name, "Clear");
                assert_eq!(matches[0].values, values(&[2, 66, 130, 194, 322]));
                assert_eq!(matches[1].flag.name, "High Cloud Confidence");
                assert_eq!(matches[1].values, values(&[194, 480]));
            },
            other => panic!("expected per-flag extraction, got {:?}", other),
        }
    }

    #[test]
    fn combined_extraction_is_a_union() {
        let unique = values(&[1, 2, 4, 8, 16]);
        let combined = extract(&unique, Band::PixelQa, Sensor::L47, &["Water", "Snow"], true).unwrap();
        assert_eq!(combined, Extraction::Combined(values(&[4, 16])));
    }

    #[test]
    fn unknown_flag_aborts_whole_extraction() {
        let unique = values(&[2]);
        let err = extract(&unique, Band::PixelQa, Sensor::L8, &["Clear", "Fog"], false).unwrap_err();
        assert!(matches!(err, QaError::UnknownFlag { ref flag, .. } if flag == "Fog"));
    }

    #[test]
    fn flag_lists() {
        assert_eq!(split_flag_list("'Cloud';'High Cloud Confidence'"), vec!["Cloud", "High Cloud Confidence"]);
        assert_eq!(split_flag_list("Water; ;\"Snow\""), vec!["Water", "Snow"]);
        assert_eq!(unquote("  \"Cloud Shadow\" "), "Cloud Shadow");
    }

    #[test]
    fn unquote_needs_both_quotes() {
        assert_eq!(unquote("\"Cloud"), "\"Cloud");
        assert_eq!(unquote("Cloud\""), "Cloud\"");
        assert_eq!(unquote("\""), "\"");
        assert_eq!(unquote("\"\""), "");
        assert!(resolve_flags(Band::Bqa, Sensor::L8, &["\"Cloud"]).is_err());
        assert!(resolve_flags(Band::Bqa, Sensor::L8, &["\"Cloud\""]).is_ok());
    }

    #[test]
    fn output_names() {
        let flag = schema::lookup(Band::Bqa, Sensor::L8, "High Snow/Ice Confidence").unwrap();
        assert_eq!(output_name("out/scene", flag, ".tif"), "out/scene_high_snow_ice_confidence.tif");
        assert_eq!(combined_output_name("out/scene", ".TIF"), "out/scene_combine.TIF");
        assert_eq!(input_extension(Path::new("a/b/LC08_BQA.TIF")), ".TIF");
        assert_eq!(input_extension(Path::new("raster")), "");
    }

    proptest! {
        #[test]
        fn extraction_agrees_with_decoding(value in 0u32..(1 << 13)) {
            for sensor in Sensor::all() {
                for band in sensor.bands() {
                    let decoder = Decoder::new(*band, *sensor, false).unwrap();
                    let satisfied = decoder.match_value(value).unwrap().satisfied_names();
                    for flag in schema::all_flags(*band, *sensor).unwrap() {
                        let single = values(&[value]);
                        let extracted = extract(&single, *band, *sensor, &[flag.name], false).unwrap();
                        prop_assert_eq!(
                            satisfied.contains(&flag.name),
                            extracted.matched().contains(&value)
                        );
                    }
                }
            }
        }

        #[test]
        fn combine_equals_union_of_singles(raw in proptest::collection::btree_set(0u32..(1 << 12), 0..40)) {
            let a = extract(&raw, Band::Bqa, Sensor::L8, &["Cloud"], false).unwrap().matched();
            let b = extract(&raw, Band::Bqa, Sensor::L8, &["High Cirrus Confidence"], false).unwrap().matched();
            let combined = extract(&raw, Band::Bqa, Sensor::L8, &["Cloud", "High Cirrus Confidence"], true).unwrap();
            let union: BTreeSet<_> = a.union(&b).copied().collect();
            prop_assert_eq!(combined, Extraction::Combined(union));
        }
    }
}
