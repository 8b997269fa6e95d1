//! QA value decoder
//!
//! Turns packed QA values into readable labels. Matching runs over the
//! band's flags in bit-list order; single-bit flags whose bit is already
//! covered by a satisfied composite flag are dropped, and the band's policy
//! decides how the remaining flags are rendered.

use std::fmt;

use log::{debug, warn};

use crate::errors::QaResult;
use crate::qa::policy::{self, BandPolicy, Rendering, CLEAR_LABEL};
use crate::qa::schema::{self, Band, Flag, RasterValue, Sensor};

/// Sentinel for values whose flags all vanished during rendering
pub const BIT_SET_INCORRECTLY: &str = "ERROR: bit set incorrectly";

/// Sentinel for values whose bits could not be read
pub const BIT_READ_INCORRECTLY: &str = "ERROR: bit read incorrectly";

/// Flags satisfied by a single value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// Every flag whose bits are all set, in bit-list order
    pub satisfied: Vec<&'static Flag>,
    /// `satisfied` minus single-bit flags absorbed by a composite flag
    pub retained: Vec<&'static Flag>,
}

impl MatchResult {
    /// Names of the satisfied flags
    pub fn satisfied_names(&self) -> Vec<&'static str> {
        self.satisfied.iter().map(|f| f.name).collect()
    }
}

/// Rendered attribute text for one value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    /// Flag names (or saturated band numbers) for the value
    Described(String),
    /// Band default used when no flag is set
    Default(&'static str),
    /// Nothing was left to describe after suppression
    BitSetIncorrectly,
    /// The value could not be tested against the schema
    BitReadIncorrectly,
}

impl Label {
    /// The text written to the attribute table
    pub fn as_str(&self) -> &str {
        match self {
            Label::Described(text) => text,
            Label::Default(text) => text,
            Label::BitSetIncorrectly => BIT_SET_INCORRECTLY,
            Label::BitReadIncorrectly => BIT_READ_INCORRECTLY,
        }
    }

    /// Whether this label flags a data-integrity problem
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Label::BitSetIncorrectly | Label::BitReadIncorrectly)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoder bound to one band and sensor
pub struct Decoder {
    band: Band,
    sensor: Sensor,
    suppress_low: bool,
    flags: Vec<&'static Flag>,
    policy: &'static BandPolicy,
}

impl Decoder {
    /// Creates a decoder for a band and sensor
    ///
    /// # Arguments
    /// * `band` - QA band being decoded
    /// * `sensor` - Sensor family that produced the band
    /// * `suppress_low` - Drop low-confidence flags from labels
    ///
    /// # Returns
    /// The decoder, or `UnsupportedCombination` when the band does not exist
    /// for the sensor
    pub fn new(band: Band, sensor: Sensor, suppress_low: bool) -> QaResult<Self> {
        let flags = schema::sorted_flags(band, sensor)?;
        debug!("Decoder for {} / {} with {} flags (suppress low: {})",
               band, sensor, flags.len(), suppress_low);

        Ok(Decoder {
            band,
            sensor,
            suppress_low,
            flags,
            policy: policy::policy_for(band),
        })
    }

    pub fn band(&self) -> Band {
        self.band
    }

    pub fn sensor(&self) -> Sensor {
        self.sensor
    }

    /// Finds the flags satisfied by a value
    ///
    /// # Returns
    /// `None` when a flag bit lies outside the value width
    pub fn match_value(&self, value: RasterValue) -> Option<MatchResult> {
        let mut satisfied = Vec::new();
        for flag in &self.flags {
            if flag.matches(value)? {
                satisfied.push(*flag);
            }
        }

        let composite_bits: Vec<u8> = satisfied.iter()
            .filter(|f| f.is_composite())
            .flat_map(|f| f.bits.iter().copied())
            .collect();

        let retained = satisfied.iter()
            .copied()
            .filter(|f| f.is_composite() || !composite_bits.contains(&f.bits[0]))
            .collect();

        Some(MatchResult { satisfied, retained })
    }

    /// Decodes a single value into its label
    pub fn decode(&self, value: RasterValue) -> Label {
        match self.match_value(value) {
            Some(result) => self.render(&result.retained),
            None => {
                warn!("Value {} could not be read against the {} schema", value, self.band);
                Label::BitReadIncorrectly
            }
        }
    }

    /// Decodes a sequence of values, keeping their order
    pub fn decode_values<I>(&self, values: I) -> Vec<(RasterValue, Label)>
    where
        I: IntoIterator<Item = RasterValue>,
    {
        values.into_iter().map(|v| (v, self.decode(v))).collect()
    }

    fn render(&self, retained: &[&'static Flag]) -> Label {
        if retained.is_empty() {
            if let Some(default) = self.policy.empty_label {
                return Label::Default(default);
            }
        }

        let mut names: Vec<&str> = Vec::new();
        let mut saturated: Vec<String> = Vec::new();
        let last = retained.len().saturating_sub(1);

        for (i, flag) in retained.iter().enumerate() {
            let mut name = flag.name;

            if self.suppress_low && (self.policy.suppress)(flag) {
                let described = !names.is_empty() || !saturated.is_empty();
                if self.policy.promote_clear && i == last && !described {
                    name = CLEAR_LABEL;
                } else {
                    continue;
                }
            }

            match self.policy.rendering {
                Rendering::Joined => names.push(name),
                Rendering::SaturationBands => saturated.push(flag.bits[0].to_string()),
            }
        }

        let text = match self.policy.rendering {
            Rendering::Joined => names.join(", "),
            Rendering::SaturationBands if saturated.is_empty() => String::new(),
            Rendering::SaturationBands => format!("Band {} Data Saturation", saturated.join(",")),
        };

        if text.is_empty() {
            Label::BitSetIncorrectly
        } else {
            Label::Described(text)
        }
    }
}

/// Decodes one value without keeping a decoder around
pub fn decode(value: RasterValue, band: Band, sensor: Sensor, suppress_low: bool) -> QaResult<Label> {
    Ok(Decoder::new(band, sensor, suppress_low)?.decode(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::schema::{Grade, Topic};
    use proptest::prelude::*;

    fn label(value: RasterValue, band: Band, sensor: Sensor, suppress_low: bool) -> String {
        decode(value, band, sensor, suppress_low).unwrap().to_string()
    }

    #[test]
    fn clear_pixel() {
        assert_eq!(label(2, Band::PixelQa, Sensor::L8, false), "Clear");
    }

    #[test]
    fn composite_absorbs_its_single_bits() {
        assert_eq!(label(194, Band::PixelQa, Sensor::L8, false), "Clear, High Cloud Confidence");

        let decoder = Decoder::new(Band::PixelQa, Sensor::L8, false).unwrap();
        let result = decoder.match_value(194).unwrap();
        assert_eq!(result.satisfied_names(), vec![
            "Clear", "Low Cloud Confidence", "High Cloud Confidence", "Medium Cloud Confidence",
        ]);
        assert_eq!(result.retained.len(), 2);
    }

    #[test]
    fn empty_match_defaults() {
        assert_eq!(label(0, Band::RadsatQa, Sensor::L8, false), "No Saturation");
        assert_eq!(label(0, Band::Bqa, Sensor::L8, false), "Not Determined");
        assert_eq!(label(0, Band::SrAerosol, Sensor::L8, false), "None");
        assert_eq!(label(0, Band::SrCloudQa, Sensor::L47, false), "None");
        assert_eq!(decode(0, Band::Bqa, Sensor::L47, true).unwrap(), Label::Default("Not Determined"));
    }

    #[test]
    fn pixel_qa_without_flags_is_an_anomaly() {
        let decoded = decode(0, Band::PixelQa, Sensor::L47, false).unwrap();
        assert_eq!(decoded, Label::BitSetIncorrectly);
        assert_eq!(decoded.to_string(), BIT_SET_INCORRECTLY);
        assert!(decoded.is_anomaly());
    }

    #[test]
    fn unreadable_bit_is_an_anomaly() {
        static BEYOND: Flag = Flag {
            name: "Beyond",
            bits: &[40],
            grade: Grade::Ungraded,
            topic: Topic::Fill,
        };
        let mut flags = schema::sorted_flags(Band::PixelQa, Sensor::L8).unwrap();
        flags.push(&BEYOND);
        let decoder = Decoder {
            band: Band::PixelQa,
            sensor: Sensor::L8,
            suppress_low: false,
            flags,
            policy: policy::policy_for(Band::PixelQa),
        };

        assert!(decoder.match_value(2).is_none());
        let decoded = decoder.decode_values([2, 194]);
        assert!(decoded.iter().all(|(_, label)| *label == Label::BitReadIncorrectly));
        assert_eq!(decoded[0].1.to_string(), BIT_READ_INCORRECTLY);
        assert!(decoded[0].1.is_anomaly());
    }

    #[test]
    fn radsat_lists_band_numbers() {
        assert_eq!(label(0b110, Band::RadsatQa, Sensor::L8, false), "Band 1,2 Data Saturation");
        assert_eq!(label(1 << 1 | 1 << 10, Band::RadsatQa, Sensor::L8, false), "Band 1,10 Data Saturation");
        assert_eq!(label(1 << 7, Band::RadsatQa, Sensor::L47, true), "Band 7 Data Saturation");
        // Fill sits on bit 0 and renders by bit position
        assert_eq!(label(1, Band::RadsatQa, Sensor::L47, false), "Band 0 Data Saturation");
    }

    #[test]
    fn radsat_ignores_bits_outside_its_table() {
        assert_eq!(label(1 << 8, Band::RadsatQa, Sensor::L8, false), "No Saturation");
    }

    #[test]
    fn bqa_low_flags_collapse_to_clear() {
        // bits 5, 7, 9, 11
        let value = 2720;
        assert_eq!(
            label(value, Band::Bqa, Sensor::L8, false),
            "Low Cloud Confidence, Low Cloud Shadow Confidence, Low Snow/Ice Confidence, Low Cirrus Confidence"
        );
        assert_eq!(label(value, Band::Bqa, Sensor::L8, true), "Clear");
    }

    #[test]
    fn bqa_low_flag_after_description_is_dropped() {
        let value = 1 << 4 | 1 << 5;
        assert_eq!(label(value, Band::Bqa, Sensor::L47, false), "Cloud, Low Cloud Confidence");
        assert_eq!(label(value, Band::Bqa, Sensor::L47, true), "Cloud");
    }

    #[test]
    fn bqa_keeps_low_radiometric_saturation() {
        let value = 1 << 2;
        assert_eq!(label(value, Band::Bqa, Sensor::L8, true), "Low Radiometric Saturation");
        let value = 1 << 2 | 1 << 9;
        assert_eq!(label(value, Band::Bqa, Sensor::L8, true), "Low Radiometric Saturation");
    }

    #[test]
    fn bqa_high_confidence_survives_suppression() {
        let value = 1 << 4 | 1 << 5 | 1 << 6;
        assert_eq!(label(value, Band::Bqa, Sensor::L8, true), "Cloud, High Cloud Confidence");
    }

    #[test]
    fn other_bands_drop_low_flags() {
        // bits 1, 6, 8
        assert_eq!(
            label(322, Band::PixelQa, Sensor::L8, false),
            "Clear, Low Cloud Confidence, Low Cirrus Confidence"
        );
        assert_eq!(label(322, Band::PixelQa, Sensor::L8, true), "Clear");
        assert_eq!(label(1 << 1 | 1 << 6, Band::SrAerosol, Sensor::L8, true), "Aerosol Retrieval - Valid");
    }

    #[test]
    fn fully_suppressed_value_is_an_anomaly() {
        assert_eq!(decode(1 << 6, Band::PixelQa, Sensor::L47, true).unwrap(), Label::BitSetIncorrectly);
    }

    #[test]
    fn decode_values_keeps_order() {
        let decoder = Decoder::new(Band::PixelQa, Sensor::L8, false).unwrap();
        let decoded = decoder.decode_values(vec![66, 2, 1]);
        assert_eq!(decoded[0], (66, Label::Described("Clear, Low Cloud Confidence".to_string())));
        assert_eq!(decoded[1].0, 2);
        assert_eq!(decoded[2].1.as_str(), "Fill");
    }

    #[test]
    fn unsupported_band_fails_before_decoding() {
        assert!(Decoder::new(Band::SrCloudQa, Sensor::L8, false).is_err());
    }

    proptest! {
        #[test]
        fn decoding_is_pure(value in 0u32..(1 << 16), suppress in any::<bool>()) {
            for sensor in Sensor::all() {
                for band in sensor.bands() {
                    let first = decode(value, *band, *sensor, suppress).unwrap();
                    let second = decode(value, *band, *sensor, suppress).unwrap();
                    prop_assert_eq!(first, second);
                }
            }
        }

        #[test]
        fn composite_matches_are_conjunctions(value in any::<u32>(), b0 in 0u8..32, b1 in 0u8..32) {
            let both = schema::bits_match(value, &[b0, b1]).unwrap();
            let first = schema::bits_match(value, &[b0]).unwrap();
            let second = schema::bits_match(value, &[b1]).unwrap();
            prop_assert_eq!(both, first && second);
        }

        #[test]
        fn retained_flags_are_satisfied(value in 0u32..(1 << 13)) {
            let decoder = Decoder::new(Band::Bqa, Sensor::L8, false).unwrap();
            let result = decoder.match_value(value).unwrap();
            for flag in &result.retained {
                prop_assert!(result.satisfied.contains(flag));
            }
            for flag in &result.satisfied {
                if flag.is_composite() {
                    prop_assert!(result.retained.contains(flag));
                }
            }
        }
    }
}
