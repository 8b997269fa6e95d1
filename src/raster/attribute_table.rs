//! Raster attribute tables and their GDAL PAM sidecar encoding
//!
//! Decoded labels are attached to a raster as a value-keyed table stored in
//! `<raster>.aux.xml`. Anything else already in the sidecar is kept; only the
//! first band's `GDALRasterAttributeTable` is replaced.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::errors::{QaError, QaResult};
use crate::qa::schema::RasterValue;

/// Name of the label column
pub const DEFAULT_FIELD: &str = "Descr";

/// Maximum label length in characters
pub const DEFAULT_WIDTH: usize = 120;

const VALUE_FIELD: &str = "Value";
const COUNT_FIELD: &str = "Count";

// GDAL field types and usages
const TYPE_INTEGER: &str = "0";
const TYPE_STRING: &str = "2";
const USAGE_PIXEL_COUNT: &str = "1";
const USAGE_NAME: &str = "2";
const USAGE_MIN_MAX: &str = "5";

/// One row of an attribute table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRow {
    pub value: RasterValue,
    /// Pixels carrying the value
    pub count: u64,
    pub label: String,
}

/// Value-keyed text attribute attached to a raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable {
    field: String,
    width: usize,
    rows: Vec<AttributeRow>,
}

impl Default for AttributeTable {
    fn default() -> Self {
        AttributeTable::new(DEFAULT_FIELD, DEFAULT_WIDTH)
    }
}

impl AttributeTable {
    /// Creates an empty table
    ///
    /// # Arguments
    /// * `field` - Name of the label column
    /// * `width` - Labels longer than this many characters are truncated
    pub fn new(field: &str, width: usize) -> Self {
        AttributeTable {
            field: field.to_string(),
            width,
            rows: Vec::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Rows ordered by value
    pub fn rows(&self) -> &[AttributeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Adds or replaces the row for `value`, truncating the label
    pub fn push(&mut self, value: RasterValue, count: u64, label: &str) {
        let label: String = label.chars().take(self.width).collect();
        let row = AttributeRow { value, count, label };

        match self.rows.binary_search_by_key(&value, |r| r.value) {
            Ok(index) => self.rows[index] = row,
            Err(index) => self.rows.insert(index, row),
        }
    }

    pub fn get(&self, value: RasterValue) -> Option<&AttributeRow> {
        self.rows.binary_search_by_key(&value, |r| r.value)
            .ok()
            .map(|index| &self.rows[index])
    }

    /// Label stored for `value`
    pub fn label(&self, value: RasterValue) -> Option<&str> {
        self.get(value).map(|row| row.label.as_str())
    }

    /// Writes the table into the raster's PAM sidecar
    pub fn write_aux_xml(&self, raster: &Path) -> QaResult<()> {
        let path = sidecar_path(raster);
        let existing = if path.exists() {
            Some(fs::read_to_string(&path)?)
        } else {
            None
        };

        let xml = self.to_aux_xml(existing.as_deref())?;
        fs::write(&path, xml)?;

        info!("Wrote {} attribute rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    /// Reads the first band's table from a raster's PAM sidecar
    ///
    /// # Returns
    /// `None` when there is no sidecar or it carries no table
    pub fn read_aux_xml(raster: &Path) -> QaResult<Option<AttributeTable>> {
        let path = sidecar_path(raster);
        if !path.exists() {
            return Ok(None);
        }

        let xml = fs::read_to_string(&path)?;
        Self::from_aux_xml(&xml)
    }

    /// Renders a sidecar document, merging into `existing` when given
    pub fn to_aux_xml(&self, existing: Option<&str>) -> QaResult<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        match existing {
            Some(xml) if !xml.trim().is_empty() => self.merge_into(&mut writer, xml)?,
            _ => {
                start(&mut writer, "PAMDataset", &[])?;
                self.write_band(&mut writer)?;
                end(&mut writer, "PAMDataset")?;
            }
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| QaError::GenericError(format!("Sidecar is not UTF-8: {}", e)))
    }

    /// Copies `xml` event by event, swapping in this table
    fn merge_into(&self, writer: &mut Writer<Vec<u8>>, xml: &str) -> QaResult<()> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut in_first_band = false;
        let mut band_written = false;
        let mut skip_depth = 0usize;

        loop {
            let event = reader.read_event().map_err(xml_error)?;

            if skip_depth > 0 {
                match event {
                    Event::Start(_) => skip_depth += 1,
                    Event::End(_) => skip_depth -= 1,
                    Event::Eof => break,
                    _ => {}
                }
                continue;
            }

            match event {
                Event::Start(ref e) if e.name().as_ref() == b"PAMRasterBand" && is_first_band(e)? => {
                    in_first_band = true;
                    writer.write_event(event.borrow()).map_err(xml_error)?;
                },
                Event::Empty(ref e) if e.name().as_ref() == b"PAMRasterBand" && is_first_band(e)? => {
                    writer.write_event(Event::Start(e.borrow())).map_err(xml_error)?;
                    self.write_table(writer)?;
                    end(writer, "PAMRasterBand")?;
                    band_written = true;
                },
                Event::Start(ref e) if in_first_band && e.name().as_ref() == b"GDALRasterAttributeTable" => {
                    skip_depth = 1;
                },
                Event::Empty(ref e) if in_first_band && e.name().as_ref() == b"GDALRasterAttributeTable" => {},
                Event::End(ref e) if in_first_band && e.name().as_ref() == b"PAMRasterBand" => {
                    self.write_table(writer)?;
                    writer.write_event(event.borrow()).map_err(xml_error)?;
                    in_first_band = false;
                    band_written = true;
                },
                Event::End(ref e) if !band_written && e.name().as_ref() == b"PAMDataset" => {
                    self.write_band(writer)?;
                    writer.write_event(event.borrow()).map_err(xml_error)?;
                    band_written = true;
                },
                Event::Eof => break,
                other => writer.write_event(other).map_err(xml_error)?,
            }
        }

        if !band_written {
            return Err(QaError::GenericError("Sidecar has no PAMDataset element".to_string()));
        }

        Ok(())
    }

    fn write_band(&self, writer: &mut Writer<Vec<u8>>) -> QaResult<()> {
        start(writer, "PAMRasterBand", &[("band", "1")])?;
        self.write_table(writer)?;
        end(writer, "PAMRasterBand")
    }

    fn write_table(&self, writer: &mut Writer<Vec<u8>>) -> QaResult<()> {
        start(writer, "GDALRasterAttributeTable", &[("tableType", "thematic")])?;

        let fields = [
            (VALUE_FIELD, TYPE_INTEGER, USAGE_MIN_MAX),
            (COUNT_FIELD, TYPE_INTEGER, USAGE_PIXEL_COUNT),
            (self.field.as_str(), TYPE_STRING, USAGE_NAME),
        ];
        for (index, (name, field_type, usage)) in fields.iter().enumerate() {
            let index = index.to_string();
            start(writer, "FieldDefn", &[("index", index.as_str())])?;
            text_element(writer, "Name", name)?;
            text_element(writer, "Type", field_type)?;
            text_element(writer, "Usage", usage)?;
            end(writer, "FieldDefn")?;
        }

        for (index, row) in self.rows.iter().enumerate() {
            let index = index.to_string();
            start(writer, "Row", &[("index", index.as_str())])?;
            text_element(writer, "F", &row.value.to_string())?;
            text_element(writer, "F", &row.count.to_string())?;
            text_element(writer, "F", &row.label)?;
            end(writer, "Row")?;
        }

        end(writer, "GDALRasterAttributeTable")
    }

    /// Parses the first band's table out of a sidecar document
    pub fn from_aux_xml(xml: &str) -> QaResult<Option<AttributeTable>> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut in_first_band = false;
        let mut in_table = false;
        let mut found = false;
        let mut element = String::new();
        let mut field_names: Vec<String> = Vec::new();
        let mut cells: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        loop {
            match reader.read_event().map_err(xml_error)? {
                Event::Start(e) => {
                    match e.name().as_ref() {
                        b"PAMRasterBand" => in_first_band = is_first_band(&e)?,
                        b"GDALRasterAttributeTable" if in_first_band => {
                            in_table = true;
                            found = true;
                        },
                        b"Row" if in_table => cells.clear(),
                        name => element = String::from_utf8_lossy(name).into_owned(),
                    }
                },
                Event::Empty(e) if in_table && e.name().as_ref() == b"F" => cells.push(String::new()),
                Event::Text(t) if in_table => {
                    let text = t.unescape().map_err(xml_error)?.into_owned();
                    match element.as_str() {
                        "Name" => field_names.push(text),
                        "F" => cells.push(text),
                        _ => {}
                    }
                },
                Event::End(e) => {
                    match e.name().as_ref() {
                        b"PAMRasterBand" => in_first_band = false,
                        b"GDALRasterAttributeTable" => in_table = false,
                        b"Row" if in_table => rows.push(std::mem::take(&mut cells)),
                        _ => {}
                    }
                    element.clear();
                },
                Event::Eof => break,
                _ => {}
            }
        }

        if !found {
            return Ok(None);
        }

        let position = |name: &str| field_names.iter().position(|f| f == name);
        let value_index = position(VALUE_FIELD)
            .ok_or_else(|| QaError::GenericError("Attribute table has no Value field".to_string()))?;
        let count_index = position(COUNT_FIELD);
        let label_index = field_names.iter()
            .position(|f| f != VALUE_FIELD && f != COUNT_FIELD)
            .ok_or_else(|| QaError::GenericError("Attribute table has no label field".to_string()))?;

        let mut table = AttributeTable::new(&field_names[label_index], usize::MAX);
        for cells in rows {
            let value = cells.get(value_index)
                .and_then(|v| v.parse::<RasterValue>().ok())
                .ok_or_else(|| QaError::GenericError(format!("Bad attribute row: {:?}", cells)))?;
            let count = count_index
                .and_then(|i| cells.get(i))
                .and_then(|c| c.parse::<u64>().ok())
                .unwrap_or(0);
            let label = cells.get(label_index).map(String::as_str).unwrap_or("");
            table.push(value, count, label);
        }
        table.width = DEFAULT_WIDTH.max(table.rows.iter().map(|r| r.label.chars().count()).max().unwrap_or(0));

        debug!("Parsed attribute table with {} rows", table.rows.len());
        Ok(Some(table))
    }
}

/// Path of the PAM sidecar for a raster
pub fn sidecar_path(raster: &Path) -> PathBuf {
    let mut name = raster.as_os_str().to_os_string();
    name.push(".aux.xml");
    PathBuf::from(name)
}

fn is_first_band(element: &BytesStart) -> QaResult<bool> {
    let band = element.try_get_attribute("band").map_err(xml_error)?;
    match band {
        Some(attr) => Ok(attr.unescape_value().map_err(xml_error)?.trim() == "1"),
        None => Ok(false),
    }
}

fn start(writer: &mut Writer<Vec<u8>>, name: &str, attributes: &[(&str, &str)]) -> QaResult<()> {
    let mut element = BytesStart::new(name);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    writer.write_event(Event::Start(element)).map_err(xml_error)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> QaResult<()> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> QaResult<()> {
    start(writer, name, &[])?;
    writer.write_event(Event::Text(BytesText::new(text))).map_err(xml_error)?;
    end(writer, name)
}

fn xml_error<E: std::fmt::Display>(e: E) -> QaError {
    QaError::GenericError(format!("PAM sidecar XML error: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> AttributeTable {
        let mut table = AttributeTable::default();
        table.push(322, 4, "Clear, Low Cloud Confidence");
        table.push(2, 10, "Clear");
        table.push(1, 7, "Fill");
        table
    }

    #[test]
    fn rows_stay_sorted_and_unique() {
        let mut table = sample_table();
        table.push(2, 11, "Clear");
        let values: Vec<RasterValue> = table.rows().iter().map(|r| r.value).collect();
        assert_eq!(values, vec![1, 2, 322]);
        assert_eq!(table.get(2).unwrap().count, 11);
    }

    #[test]
    fn labels_truncate_to_width() {
        let mut table = AttributeTable::new(DEFAULT_FIELD, 5);
        table.push(1, 1, "Cloud Shadow");
        assert_eq!(table.label(1), Some("Cloud"));
    }

    #[test]
    fn document_reads_back() {
        let table = sample_table();
        let xml = table.to_aux_xml(None).unwrap();
        assert!(xml.contains("<PAMRasterBand band=\"1\">"));
        assert!(xml.contains("<Name>Descr</Name>"));

        let parsed = AttributeTable::from_aux_xml(&xml).unwrap().unwrap();
        assert_eq!(parsed.rows(), table.rows());
        assert_eq!(parsed.field(), DEFAULT_FIELD);
    }

    #[test]
    fn labels_are_escaped() {
        let mut table = AttributeTable::default();
        table.push(5, 1, "A & <B>");
        let xml = table.to_aux_xml(None).unwrap();
        assert!(xml.contains("A &amp; &lt;B&gt;"));
        let parsed = AttributeTable::from_aux_xml(&xml).unwrap().unwrap();
        assert_eq!(parsed.label(5), Some("A & <B>"));
    }

    #[test]
    fn merge_replaces_only_the_table() {
        let existing = r#"<PAMDataset>
  <Metadata><MDI key="AREA_OR_POINT">Area</MDI></Metadata>
  <PAMRasterBand band="1">
    <Description>QA</Description>
    <GDALRasterAttributeTable>
      <FieldDefn index="0"><Name>Value</Name><Type>0</Type><Usage>5</Usage></FieldDefn>
      <FieldDefn index="1"><Name>Descr</Name><Type>2</Type><Usage>2</Usage></FieldDefn>
      <Row index="0"><F>99</F><F>Old</F></Row>
    </GDALRasterAttributeTable>
  </PAMRasterBand>
</PAMDataset>"#;

        let xml = sample_table().to_aux_xml(Some(existing)).unwrap();
        assert!(xml.contains("AREA_OR_POINT"));
        assert!(xml.contains("<Description>QA</Description>"));
        assert!(!xml.contains("Old"));
        assert_eq!(xml.matches("GDALRasterAttributeTable tableType").count(), 1);

        let parsed = AttributeTable::from_aux_xml(&xml).unwrap().unwrap();
        assert_eq!(parsed.label(322), Some("Clear, Low Cloud Confidence"));
        assert_eq!(parsed.get(99), None);
    }

    #[test]
    fn merge_adds_missing_band() {
        let existing = "<PAMDataset><Metadata><MDI key=\"a\">b</MDI></Metadata></PAMDataset>";
        let xml = sample_table().to_aux_xml(Some(existing)).unwrap();
        assert!(xml.contains("<MDI key=\"a\">b</MDI>"));
        assert_eq!(AttributeTable::from_aux_xml(&xml).unwrap().unwrap().len(), 3);
    }

    #[test]
    fn sidecar_without_table() {
        let xml = "<PAMDataset><PAMRasterBand band=\"1\"/></PAMDataset>";
        assert_eq!(AttributeTable::from_aux_xml(xml).unwrap(), None);
    }

    #[test]
    fn sidecar_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let raster = dir.path().join("LC08_pixel_qa.tif");
        assert_eq!(sidecar_path(&raster), dir.path().join("LC08_pixel_qa.tif.aux.xml"));

        sample_table().write_aux_xml(&raster).unwrap();
        let mut updated = AttributeTable::default();
        updated.push(2, 3, "Clear");
        updated.write_aux_xml(&raster).unwrap();

        let read = AttributeTable::read_aux_xml(&raster).unwrap().unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read.get(2).unwrap().count, 3);
    }
}
