//! Per-band labelling policy
//!
//! Each QA band renders labels slightly differently: which default to use
//! when no flag is set, which "low" flags the low-confidence filter drops,
//! and how flag names are joined. Those rules live here as a table keyed on
//! the band enum instead of being spread through the decoder.

use crate::qa::schema::{Band, Flag, Grade, Topic};

/// How retained flags are rendered into text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendering {
    /// Flag names joined with ", "
    Joined,
    /// "Band {n},{m} Data Saturation" built from bit positions
    SaturationBands,
}

/// Label rules for one QA band
#[derive(Debug, Clone, Copy)]
pub struct BandPolicy {
    /// Label used when no flag is set; `None` falls through to the
    /// "bit set incorrectly" sentinel
    pub empty_label: Option<&'static str>,
    /// Flags dropped when low-confidence suppression is requested
    pub suppress: fn(&Flag) -> bool,
    /// A suppressed flag that closes out an otherwise empty label becomes
    /// "Clear"
    pub promote_clear: bool,
    pub rendering: Rendering,
}

/// Literal substituted by the clear promotion rule
pub const CLEAR_LABEL: &str = "Clear";

fn any_low(flag: &Flag) -> bool {
    flag.grade == Grade::Low
}

fn low_except_radiometric(flag: &Flag) -> bool {
    flag.grade == Grade::Low && flag.topic != Topic::Radiometric
}

const BQA_POLICY: BandPolicy = BandPolicy {
    empty_label: Some("Not Determined"),
    suppress: low_except_radiometric,
    promote_clear: true,
    rendering: Rendering::Joined,
};

const PIXEL_QA_POLICY: BandPolicy = BandPolicy {
    empty_label: None,
    suppress: any_low,
    promote_clear: false,
    rendering: Rendering::Joined,
};

const RADSAT_QA_POLICY: BandPolicy = BandPolicy {
    empty_label: Some("No Saturation"),
    suppress: any_low,
    promote_clear: false,
    rendering: Rendering::SaturationBands,
};

const SURFACE_REFLECTANCE_POLICY: BandPolicy = BandPolicy {
    empty_label: Some("None"),
    suppress: any_low,
    promote_clear: false,
    rendering: Rendering::Joined,
};

/// Returns the label policy for a band
pub fn policy_for(band: Band) -> &'static BandPolicy {
    match band {
        Band::Bqa => &BQA_POLICY,
        Band::PixelQa => &PIXEL_QA_POLICY,
        Band::RadsatQa => &RADSAT_QA_POLICY,
        Band::SrAerosol | Band::SrCloudQa => &SURFACE_REFLECTANCE_POLICY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qa::schema::{lookup, Sensor};

    #[test]
    fn empty_labels_per_band() {
        assert_eq!(policy_for(Band::RadsatQa).empty_label, Some("No Saturation"));
        assert_eq!(policy_for(Band::SrCloudQa).empty_label, Some("None"));
        assert_eq!(policy_for(Band::SrAerosol).empty_label, Some("None"));
        assert_eq!(policy_for(Band::Bqa).empty_label, Some("Not Determined"));
        assert_eq!(policy_for(Band::PixelQa).empty_label, None);
    }

    #[test]
    fn bqa_keeps_low_radiometric_flags() {
        let policy = policy_for(Band::Bqa);
        let radiometric = lookup(Band::Bqa, Sensor::L8, "Low Radiometric Saturation").unwrap();
        let cirrus = lookup(Band::Bqa, Sensor::L8, "Low Cirrus Confidence").unwrap();
        let high = lookup(Band::Bqa, Sensor::L8, "High Cirrus Confidence").unwrap();
        assert!(!(policy.suppress)(radiometric));
        assert!((policy.suppress)(cirrus));
        assert!(!(policy.suppress)(high));
        assert!(policy.promote_clear);
    }

    #[test]
    fn other_bands_drop_every_low_flag() {
        let aerosol = lookup(Band::SrAerosol, Sensor::L8, "Low Aerosol").unwrap();
        let cloud = lookup(Band::PixelQa, Sensor::L47, "Low Cloud Confidence").unwrap();
        assert!((policy_for(Band::SrAerosol).suppress)(aerosol));
        assert!((policy_for(Band::PixelQa).suppress)(cloud));
        assert!(!policy_for(Band::PixelQa).promote_clear);
    }
}
