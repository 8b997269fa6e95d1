//! Decode and extract invocations against a raster store
//!
//! Every parameter is resolved and the raster's pixel type validated before
//! anything is read or written, so a bad invocation leaves the store
//! untouched.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::QaConfig;
use crate::errors::{QaError, QaResult};
use crate::qa::decoder::Decoder;
use crate::qa::extractor::{self, Extraction, ExtractionRequest};
use crate::qa::schema::{self, Band, Flag, Sensor};
use crate::raster::attribute_table::AttributeTable;
use crate::raster::store::RasterStore;

/// Outcome of decoding one raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeSummary {
    pub sensor: Sensor,
    pub band: Band,
    /// Table attached to the raster
    pub table: AttributeTable,
    /// Rows carrying an error sentinel
    pub anomalies: usize,
}

impl DecodeSummary {
    /// Rows written to the attribute table
    pub fn rows(&self) -> usize {
        self.table.len()
    }
}

fn file_name(raster: &Path) -> String {
    raster.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Resolves the sensor, explicitly or from the raster's file name
pub fn resolve_sensor(raster: &Path, sensor: Option<&str>) -> QaResult<Sensor> {
    match sensor {
        Some(name) => Sensor::parse(name),
        None => {
            let name = file_name(raster);
            Sensor::infer_from_filename(&name)
                .ok_or_else(|| QaError::InvalidSensor(format!("none given and none found in {}", name)))
        }
    }
}

/// Resolves the band, explicitly or from the raster's file name
pub fn resolve_band(raster: &Path, band: Option<&str>) -> QaResult<Band> {
    match band {
        Some(name) => Band::parse(name),
        None => {
            let name = file_name(raster);
            Band::infer_from_filename(&name)
                .ok_or_else(|| QaError::UnknownBand(format!("none given and none found in {}", name)))
        }
    }
}

/// Resolves sensor and band and checks the sensor produces the band
pub fn resolve_target(raster: &Path, sensor: Option<&str>, band: Option<&str>) -> QaResult<(Sensor, Band)> {
    let sensor = resolve_sensor(raster, sensor)?;
    let band = resolve_band(raster, band)?;

    if !sensor.bands().contains(&band) {
        return Err(QaError::UnsupportedCombination { band, sensor });
    }

    Ok((sensor, band))
}

fn ensure_integer_raster(store: &mut dyn RasterStore, raster: &Path) -> QaResult<()> {
    let pixel_type = store.pixel_type(raster)?;
    if !pixel_type.is_integer() {
        return Err(QaError::InvalidRasterType {
            raster: raster.display().to_string(),
            pixel_type: pixel_type.to_string(),
        });
    }
    Ok(())
}

/// Decodes every value of a QA raster into its attribute table
///
/// # Arguments
/// * `store` - Raster store holding the raster
/// * `raster` - Raster to decode
/// * `sensor` - Sensor name; inferred from the file name when `None`
/// * `band` - Band name; inferred from the file name when `None`
/// * `suppress_low` - Drop low-confidence flags from labels
/// * `config` - Attribute field name and width
pub fn decode_raster(
    store: &mut dyn RasterStore,
    raster: &Path,
    sensor: Option<&str>,
    band: Option<&str>,
    suppress_low: bool,
    config: &QaConfig,
) -> QaResult<DecodeSummary> {
    let (sensor, band) = resolve_target(raster, sensor, band)?;
    let decoder = Decoder::new(band, sensor, suppress_low)?;
    ensure_integer_raster(store, raster)?;

    info!("Decoding {} as {} / {}", raster.display(), decoder.band(), decoder.sensor());
    let counts = store.read_value_counts(raster)?;

    let mut table = AttributeTable::new(&config.attribute_field, config.attribute_width);
    let mut anomalies = 0;
    for (value, count) in counts {
        let label = decoder.decode(value);
        if label.is_anomaly() {
            anomalies += 1;
        }
        table.push(value, count, label.as_str());
    }

    if anomalies > 0 {
        warn!("{} value(s) in {} could not be decoded cleanly", anomalies, raster.display());
    }

    store.write_attribute_table(raster, &table)?;
    info!("Decoded {} distinct values", table.len());

    Ok(DecodeSummary {
        sensor: decoder.sensor(),
        band: decoder.band(),
        table,
        anomalies,
    })
}

/// Writes a binary raster per requested flag, or one combined raster
///
/// Flag lists may hold several `;`-separated names.
///
/// # Returns
/// Paths of the written rasters, in request order
pub fn extract_raster(
    store: &mut dyn RasterStore,
    raster: &Path,
    request: &ExtractionRequest,
) -> QaResult<Vec<PathBuf>> {
    let flags: Vec<String> = request.flags.iter()
        .flat_map(|list| extractor::split_flag_list(list))
        .collect();
    if flags.is_empty() {
        return Err(QaError::GenericError("No flags requested".to_string()));
    }

    extractor::resolve_flags(request.band, request.sensor, &flags)?;
    ensure_integer_raster(store, raster)?;

    info!("Extracting {} flag(s) from {}", flags.len(), raster.display());
    let values = store.read_unique_values(raster)?;
    let extraction = extractor::extract(&values, request.band, request.sensor, &flags, request.combine)?;

    let extension = extractor::input_extension(raster);
    let mut written = Vec::new();

    match extraction {
        Extraction::PerFlag(matches) => {
            for flag_match in matches {
                let output = PathBuf::from(extractor::output_name(&request.basename, flag_match.flag, &extension));
                store.write_binary_raster(raster, &output, &|v| flag_match.values.contains(&v))?;
                info!("{} -> {}", flag_match.flag.name, output.display());
                written.push(output);
            }
        },
        Extraction::Combined(values) => {
            let output = PathBuf::from(extractor::combined_output_name(&request.basename, &extension));
            store.write_binary_raster(raster, &output, &|v| values.contains(&v))?;
            info!("Combined flags -> {}", output.display());
            written.push(output);
        },
    }

    Ok(written)
}

/// Flags per band for a sensor, sorted by bit value
///
/// The sensor is explicit or inferred from `input`; without an explicit or
/// inferable band every band of the sensor is listed.
pub fn list_flags(
    input: Option<&Path>,
    sensor: Option<&str>,
    band: Option<&str>,
) -> QaResult<Vec<(Band, Vec<&'static Flag>)>> {
    let sensor = match (sensor, input) {
        (Some(name), _) => Sensor::parse(name)?,
        (None, Some(path)) => resolve_sensor(path, None)?,
        (None, None) => return Err(QaError::InvalidSensor("none given".to_string())),
    };

    let band = match band {
        Some(name) => Some(Band::parse(name)?),
        None => input.and_then(|path| Band::infer_from_filename(&file_name(path))),
    };

    let bands: Vec<Band> = match band {
        Some(band) if sensor.bands().contains(&band) => vec![band],
        Some(band) => return Err(QaError::UnsupportedCombination { band, sensor }),
        None => sensor.bands().to_vec(),
    };

    bands.into_iter()
        .map(|band| Ok((band, schema::sorted_flags(band, sensor)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::memory::MemoryRasterStore;
    use crate::raster::pixel_type::PixelType;

    const RASTER: &str = "LC08_L1TP_042034_20200101_pixel_qa.tif";

    fn store() -> MemoryRasterStore {
        let mut store = MemoryRasterStore::new();
        store.insert(RASTER, PixelType::Unsigned(16), 3, vec![1, 2, 2, 66, 194, 322]);
        store
    }

    fn request(flags: &[&str], combine: bool) -> ExtractionRequest {
        ExtractionRequest {
            sensor: Sensor::L8,
            band: Band::PixelQa,
            flags: flags.iter().map(|f| f.to_string()).collect(),
            combine,
            basename: "out/qa".to_string(),
        }
    }

    #[test]
    fn decode_infers_sensor_and_band() {
        let mut store = store();
        let summary = decode_raster(&mut store, Path::new(RASTER), None, None, false, &QaConfig::default()).unwrap();

        assert_eq!(summary.sensor, Sensor::L8);
        assert_eq!(summary.band, Band::PixelQa);
        assert_eq!(summary.rows(), 5);
        assert_eq!(summary.anomalies, 0);

        let table = store.attribute_table(Path::new(RASTER)).unwrap();
        assert_eq!(table.label(2), Some("Clear"));
        assert_eq!(table.get(2).unwrap().count, 2);
        assert_eq!(table.label(194), Some("Clear, High Cloud Confidence"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn anomalies_do_not_stop_decoding() {
        let mut store = MemoryRasterStore::new();
        store.insert(RASTER, PixelType::Unsigned(16), 3, vec![0, 2, 194]);

        let summary = decode_raster(&mut store, Path::new(RASTER), None, None, false, &QaConfig::default()).unwrap();
        assert_eq!(summary.anomalies, 1);
        assert_eq!(summary.rows(), 3);

        let table = store.attribute_table(Path::new(RASTER)).unwrap();
        assert_eq!(table.label(0), Some("ERROR: bit set incorrectly"));
        assert_eq!(table.label(2), Some("Clear"));
        assert_eq!(table.label(194), Some("Clear, High Cloud Confidence"));
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn invalid_sensor_writes_nothing() {
        let mut store = store();
        let result = decode_raster(&mut store, Path::new(RASTER), Some("Landsat 99"), None, false, &QaConfig::default());
        assert!(matches!(result, Err(QaError::InvalidSensor(_))));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn unsupported_band_writes_nothing() {
        let mut store = store();
        let result = decode_raster(&mut store, Path::new(RASTER), Some("L8"), Some("sr_cloud_qa"), false, &QaConfig::default());
        assert!(matches!(result, Err(QaError::UnsupportedCombination { .. })));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn float_raster_rejected() {
        let mut store = MemoryRasterStore::new();
        store.insert(RASTER, PixelType::Float(32), 1, vec![2]);

        let decoded = decode_raster(&mut store, Path::new(RASTER), None, None, false, &QaConfig::default());
        assert!(matches!(decoded, Err(QaError::InvalidRasterType { .. })));

        let extracted = extract_raster(&mut store, Path::new(RASTER), &request(&["Clear"], false));
        assert!(matches!(extracted, Err(QaError::InvalidRasterType { .. })));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn configured_field_and_width() {
        let mut store = store();
        let config = QaConfig {
            attribute_field: "Label".to_string(),
            attribute_width: 5,
            ..QaConfig::default()
        };
        decode_raster(&mut store, Path::new(RASTER), None, None, false, &config).unwrap();

        let table = store.attribute_table(Path::new(RASTER)).unwrap();
        assert_eq!(table.field(), "Label");
        assert_eq!(table.label(194), Some("Clear"));
    }

    #[test]
    fn extract_per_flag() {
        let mut store = store();
        let written = extract_raster(&mut store, Path::new(RASTER), &request(&["Clear", "\"Water\""], false)).unwrap();

        assert_eq!(written, vec![PathBuf::from("out/qa_clear.tif"), PathBuf::from("out/qa_water.tif")]);
        let clear = store.binary_raster(Path::new("out/qa_clear.tif")).unwrap();
        assert_eq!(clear.values, vec![0, 1, 1, 1, 1, 1]);
        let water = store.binary_raster(Path::new("out/qa_water.tif")).unwrap();
        assert_eq!(water.values, vec![0; 6]);
    }

    #[test]
    fn extract_combined_from_list() {
        let mut store = store();
        let written = extract_raster(&mut store, Path::new(RASTER), &request(&["Fill;'High Cloud Confidence'"], true)).unwrap();

        assert_eq!(written, vec![PathBuf::from("out/qa_combine.tif")]);
        let combined = store.binary_raster(&written[0]).unwrap();
        assert_eq!(combined.values, vec![1, 0, 0, 0, 1, 0]);
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn lists_flags_for_sensor() {
        let all = list_flags(None, Some("Landsat 4-5, 7"), None).unwrap();
        let bands: Vec<Band> = all.iter().map(|(band, _)| *band).collect();
        assert_eq!(bands, vec![Band::Bqa, Band::PixelQa, Band::RadsatQa, Band::SrCloudQa]);

        let inferred = list_flags(Some(Path::new(RASTER)), None, None).unwrap();
        assert_eq!(inferred.len(), 1);
        assert_eq!(inferred[0].0, Band::PixelQa);
        assert_eq!(inferred[0].1[0].name, "Fill");

        assert!(matches!(list_flags(None, None, None), Err(QaError::InvalidSensor(_))));
        assert!(matches!(list_flags(None, Some("L47"), Some("sr_aerosol")), Err(QaError::UnsupportedCombination { .. })));
    }

    #[test]
    fn unknown_flag_writes_nothing() {
        let mut store = store();
        let result = extract_raster(&mut store, Path::new(RASTER), &request(&["Clear", "Purple"], false));
        assert!(matches!(result, Err(QaError::UnknownFlag { .. })));
        assert_eq!(store.write_count(), 0);
    }
}
