//! Sample types of raster bands

use std::fmt;

use crate::tiff::constants::sample_format;

/// Sample type of a single-band raster, with its bit width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelType {
    Unsigned(u16),
    Signed(u16),
    Float(u16),
    Complex(u16),
}

impl PixelType {
    /// Interprets the BitsPerSample and SampleFormat tags
    ///
    /// Undefined sample data (SampleFormat 4) is read as unsigned.
    pub fn from_tags(bits_per_sample: u16, format: u16) -> Self {
        match format {
            sample_format::SIGNED => PixelType::Signed(bits_per_sample),
            sample_format::IEEEFP => PixelType::Float(bits_per_sample),
            sample_format::COMPLEX_INT | sample_format::COMPLEX_IEEEFP => PixelType::Complex(bits_per_sample),
            _ => PixelType::Unsigned(bits_per_sample),
        }
    }

    /// Whether samples are integers and can carry QA bits
    pub fn is_integer(&self) -> bool {
        matches!(self, PixelType::Unsigned(_) | PixelType::Signed(_))
    }

    pub fn bits(&self) -> u16 {
        match *self {
            PixelType::Unsigned(bits)
            | PixelType::Signed(bits)
            | PixelType::Float(bits)
            | PixelType::Complex(bits) => bits,
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelType::Unsigned(bits) => write!(f, "UInt{}", bits),
            PixelType::Signed(bits) => write!(f, "Int{}", bits),
            PixelType::Float(bits) => write!(f, "Float{}", bits),
            PixelType::Complex(bits) => write!(f, "Complex{}", bits),
        }
    }
}
