//! GeoTIFF raster store
//!
//! Reads the first image of a TIFF or BigTIFF, writes attribute tables as
//! PAM sidecars and binary rasters as 8-bit GeoTIFFs. A GDAL NoData value on
//! the source is left out of value counts and stays NoData in binary rasters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::compression::CompressionFactory;
use crate::config::QaConfig;
use crate::errors::{QaError, QaResult};
use crate::qa::schema::RasterValue;
use crate::raster::attribute_table::{self, AttributeTable};
use crate::raster::pixel_type::PixelType;
use crate::raster::samples::SampleGrid;
use crate::raster::store::RasterStore;
use crate::raster::strip_reader::StripReader;
use crate::raster::tile_reader::TileReader;
use crate::tiff::constants::{sample_format, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::{TiffBuilder, TiffReader};
use crate::utils::logger::Logger;

/// Software tag written into extracted rasters
const SOFTWARE: &str = "qakit";

/// Binary raster value for NoData source pixels
const MASK_NODATA: u8 = 255;

/// Samples of a raster with its NoData value
struct LoadedRaster {
    path: PathBuf,
    grid: SampleGrid,
    nodata: Option<RasterValue>,
}

/// Interprets a GDAL NoData string as a raw sample value
///
/// # Returns
/// `None` when the text is not an integer the pixel type can hold
pub fn parse_nodata(text: &str, pixel_type: PixelType) -> Option<RasterValue> {
    let value = match text.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 => v as i64,
        _ => {
            warn!("Ignoring non-integer NoData value {:?}", text);
            return None;
        }
    };

    let held = match pixel_type {
        PixelType::Unsigned(bits) if bits <= 32 => {
            let max = (1i64 << bits) - 1;
            (0..=max).contains(&value).then_some(value as RasterValue)
        }
        PixelType::Signed(bits) if (1..=32).contains(&bits) => {
            let half = 1i64 << (bits - 1);
            let mask = (1u64 << bits) - 1;
            (-half..half).contains(&value).then_some(((value as u64) & mask) as RasterValue)
        }
        _ => None,
    };

    if held.is_none() {
        debug!("NoData value {} does not fit {}", value, pixel_type);
    }
    held
}

/// Raster store over GeoTIFF files
pub struct TiffRasterStore<'a> {
    logger: &'a Logger,
    config: &'a QaConfig,
    /// Samples of the last raster read
    cache: Option<LoadedRaster>,
}

impl<'a> TiffRasterStore<'a> {
    pub fn new(logger: &'a Logger, config: &'a QaConfig) -> Self {
        TiffRasterStore {
            logger,
            config,
            cache: None,
        }
    }

    /// Loads a raster's IFDs and returns the reader with the first IFD
    fn open(&self, raster: &Path) -> QaResult<(TiffReader<'a>, IFD)> {
        let path = raster.to_str()
            .ok_or_else(|| QaError::GenericError(format!("Path is not valid UTF-8: {}", raster.display())))?;

        let mut reader = TiffReader::new(self.logger);
        let tiff = reader.load(path)?;
        let ifd = tiff.ifds.into_iter().next().ok_or(QaError::InvalidHeader)?;

        let samples = ifd.get_samples_per_pixel();
        if samples != 1 {
            return Err(QaError::GenericError(format!(
                "{} has {} samples per pixel; QA rasters have exactly one", raster.display(), samples)));
        }

        Ok((reader, ifd))
    }

    fn pixel_type_of(ifd: &IFD) -> PixelType {
        let bits = ifd.get_tag_value(tags::BITS_PER_SAMPLE).unwrap_or(1) as u16;
        let format = ifd.get_tag_value(tags::SAMPLE_FORMAT)
            .unwrap_or(sample_format::UNSIGNED as u64) as u16;
        PixelType::from_tags(bits, format)
    }

    fn nodata_of(reader: &TiffReader<'a>, ifd: &IFD) -> QaResult<Option<RasterValue>> {
        let entry = match ifd.get_entry(tags::GDAL_NODATA) {
            Some(entry) => entry,
            None => return Ok(None),
        };

        let mut file = reader.create_reader()?;
        let text = reader.read_ascii(&mut file, entry)?;
        Ok(parse_nodata(&text, Self::pixel_type_of(ifd)))
    }

    fn read_grid(&self, reader: &TiffReader<'a>, ifd: &IFD) -> QaResult<SampleGrid> {
        let pixel_type = Self::pixel_type_of(ifd);
        let bits = pixel_type.bits();
        if !matches!(bits, 8 | 16 | 32) {
            return Err(QaError::GenericError(format!("Unsupported bits per sample: {}", bits)));
        }

        let file = reader.create_reader()?;

        if ifd.is_tiled() {
            debug!("Reading tiled {} raster", pixel_type);
            TileReader::new(file, ifd, reader).read(bits, self.config.progress)
        } else {
            debug!("Reading stripped {} raster", pixel_type);
            StripReader::new(file, ifd, reader).read(bits, self.config.progress)
        }
    }

    /// Samples of `raster`, read once per store
    fn load(&mut self, raster: &Path) -> QaResult<&LoadedRaster> {
        let cached = matches!(&self.cache, Some(loaded) if loaded.path == raster);
        if !cached {
            let (reader, ifd) = self.open(raster)?;
            let nodata = Self::nodata_of(&reader, &ifd)?;
            let grid = self.read_grid(&reader, &ifd)?;
            self.cache = Some(LoadedRaster {
                path: raster.to_path_buf(),
                grid,
                nodata,
            });
        }

        self.cache.as_ref()
            .ok_or_else(|| QaError::GenericError(format!("No samples read from {}", raster.display())))
    }

    fn build_binary(&self, source: &Path, output: &Path, bytes: Vec<u8>, has_nodata: bool) -> QaResult<()> {
        let (reader, ifd) = self.open(source)?;
        let (width, height) = ifd.get_dimensions().ok_or(QaError::MissingDimensions)?;

        let compression = CompressionFactory::get_handler_by_name(&self.config.compression)?;
        let strip = compression.compress(&bytes)?;

        let output_path = output.to_str()
            .ok_or_else(|| QaError::GenericError(format!("Path is not valid UTF-8: {}", output.display())))?;

        let mut builder = TiffBuilder::new(self.logger, false);
        let index = builder.add_ifd(IFD::new(0, 0));
        builder.add_basic_gray_tags(index, width as u32, height as u32, 8, compression.code());
        builder.add_sample_format(index, sample_format::UNSIGNED);
        builder.setup_single_strip(index, strip);
        builder.copy_geotiff_tags(index, &ifd, &reader)?;
        builder.add_software_tag(index, SOFTWARE);
        if has_nodata {
            builder.add_nodata_tag(index, &MASK_NODATA.to_string());
        }
        builder.write(output_path)
    }
}

impl RasterStore for TiffRasterStore<'_> {
    fn pixel_type(&mut self, raster: &Path) -> QaResult<PixelType> {
        let (_, ifd) = self.open(raster)?;
        Ok(Self::pixel_type_of(&ifd))
    }

    fn read_value_counts(&mut self, raster: &Path) -> QaResult<BTreeMap<RasterValue, u64>> {
        let loaded = self.load(raster)?;
        let mut counts = loaded.grid.value_counts();
        if let Some(nodata) = loaded.nodata {
            if let Some(skipped) = counts.remove(&nodata) {
                info!("Left {} NoData pixels (value {}) out of the counts", skipped, nodata);
            }
        }

        info!("{} holds {} distinct values", raster.display(), counts.len());
        Ok(counts)
    }

    fn write_attribute_table(&mut self, raster: &Path, table: &AttributeTable) -> QaResult<()> {
        table.write_aux_xml(raster).map_err(|e| QaError::RasterWrite {
            path: attribute_table::sidecar_path(raster).display().to_string(),
            reason: e.to_string(),
        })
    }

    fn write_binary_raster(
        &mut self,
        source: &Path,
        output: &Path,
        predicate: &dyn Fn(RasterValue) -> bool
    ) -> QaResult<()> {
        let loaded = self.load(source)?;
        let nodata = loaded.nodata;
        let bytes: Vec<u8> = loaded.grid.values.iter()
            .map(|v| if Some(*v) == nodata { MASK_NODATA } else { predicate(*v) as u8 })
            .collect();
        let set = bytes.iter().filter(|b| **b == 1).count();
        debug!("{} of {} pixels set in {}", set, bytes.len(), output.display());

        self.build_binary(source, output, bytes, nodata.is_some()).map_err(|e| QaError::RasterWrite {
            path: output.display().to_string(),
            reason: e.to_string(),
        })
    }
}
