//! TIFF file reader implementation
//!
//! Reads the header and IFD chain of TIFF and BigTIFF files, delegating
//! every multi-byte read to the byte order strategy detected from the header.

use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::errors::{QaError, QaResult};
use crate::tiff::constants::field_types;
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::format_utils;
use crate::utils::ifd_utils;
use crate::utils::tag_utils;
use crate::utils::logger::Logger;

/// Upper bound on IFDs followed before the chain is considered corrupt
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader<'a> {
    /// Current byte order handler
    pub(crate) byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Byte order detected from the header
    byte_order: Option<ByteOrder>,
    /// Logger instance
    logger: &'a Logger,
    /// Current file path
    current_file: Option<String>,
    /// Whether currently reading BigTIFF format
    pub(crate) is_big_tiff: bool,
}

impl<'a> TiffReader<'a> {
    /// Creates a new TIFF reader
    pub fn new(logger: &'a Logger) -> Self {
        TiffReader {
            byte_order_handler: None,
            byte_order: None,
            logger,
            current_file: None,
            is_big_tiff: false,
        }
    }

    /// Opens the file most recently passed to `load`
    pub(crate) fn create_reader(&self) -> QaResult<BufReader<File>> {
        match &self.current_file {
            Some(path) => {
                let file = File::open(path)?;
                Ok(BufReader::with_capacity(1024 * 1024, file))
            },
            None => Err(QaError::GenericError("No file path specified".to_string()))
        }
    }

    fn handler(&self) -> QaResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| QaError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Loads a TIFF file from the given path
    ///
    /// # Arguments
    /// * `filepath` - Path to the TIFF file to load
    ///
    /// # Returns
    /// A TIFF structure containing the file's IFDs
    pub fn load(&mut self, filepath: &str) -> QaResult<TIFF> {
        info!("Loading TIFF file: {}", filepath);
        let _ = self.logger.log(&format!("Reading {}", filepath));
        self.current_file = Some(filepath.to_string());

        let file = File::open(Path::new(filepath))?;
        let mut reader = BufReader::with_capacity(1024 * 1024, file);

        self.read(&mut reader)
    }

    /// Reads a TIFF file from the given reader
    ///
    /// Detects the byte order, checks for TIFF or BigTIFF, then walks the
    /// IFD chain.
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> QaResult<TIFF> {
        debug!("Reader::read starting");
        reader.seek(SeekFrom::Start(0))?;

        let (byte_order, handler) = format_utils::detect_byte_order(reader)?;
        let (is_big_tiff, _) = format_utils::detect_tiff_format(reader, handler.as_ref())?;
        let first_ifd_offset = ifd_utils::read_ifd_offset(reader, is_big_tiff, handler.as_ref())?;
        debug!("First IFD offset: {}", first_ifd_offset);

        self.byte_order_handler = Some(handler);
        self.byte_order = Some(byte_order);
        self.is_big_tiff = is_big_tiff;

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(QaError::InvalidHeader);
        }

        info!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads a chain of IFDs starting from the given offset
    ///
    /// A broken link ends the chain with a warning; IFDs read so far are kept.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> QaResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;
        let handler = self.handler()?;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            debug!("Reading IFD at offset: {}", ifd_offset);

            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            let next_offset_position = ifd_utils::next_ifd_pointer_position(&ifd, self.is_big_tiff);
            ifds.push(ifd);

            if reader.seek(SeekFrom::Start(next_offset_position)).is_err() {
                break;
            }

            let next_ifd_offset = match ifd_utils::read_ifd_offset(reader, self.is_big_tiff, handler) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    break;
                }
            };

            if next_ifd_offset != 0 && (next_ifd_offset >= file_size || next_ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }

            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads the IFD at `offset`
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `offset` - Offset in the file where the IFD starts
    /// * `number` - The index of this IFD in the file
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> QaResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;

        let entry_count = self.read_ifd_entry_count(reader)?;
        debug!("IFD entry count: {}", entry_count);

        let mut ifd = IFD::new(number, offset);

        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader)?;
            ifd.add_entry(entry);
        }

        debug!("Read IFD #{} with {} entries", number, ifd.entries.len());
        Ok(ifd)
    }

    fn read_ifd_entry_count(&self, reader: &mut dyn SeekableReader) -> QaResult<u64> {
        let handler = self.handler()?;
        if self.is_big_tiff {
            Ok(handler.read_u64(reader)?)
        } else {
            Ok(handler.read_u16(reader)? as u64)
        }
    }

    /// Reads a single IFD entry
    ///
    /// The value field is kept raw. When the payload fits inline,
    /// `value_offset` carries the first value decoded at its own width, so a
    /// big-endian SHORT reads as the SHORT and not as the 4-byte field.
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> QaResult<IFDEntry> {
        let handler = self.handler()?;

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_size = if self.is_big_tiff { 8 } else { 4 };
        let mut raw_value = [0u8; 8];
        reader.read_exact(&mut raw_value[..field_size])?;

        let type_size = tag_utils::get_field_type_size(field_type);
        let inline = type_size * count as usize <= field_size;
        let mut field = Cursor::new(&raw_value[..field_size]);
        let value_offset = match (inline, type_size) {
            (true, _) if count == 0 => 0,
            (true, 1) => raw_value[0] as u64,
            (true, 2) => handler.read_u16(&mut field)? as u64,
            (true, 4) => handler.read_u32(&mut field)? as u64,
            _ if self.is_big_tiff => handler.read_u64(&mut field)?,
            _ => handler.read_u32(&mut field)? as u64,
        };

        Ok(IFDEntry::with_raw(tag, field_type, count, value_offset, raw_value))
    }

    /// Reads a tag's payload bytes, in the file's byte order
    pub fn read_tag_bytes(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> QaResult<Vec<u8>> {
        let size = entry.payload_size();
        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(entry.raw_value[..size].to_vec());
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut buffer = vec![0u8; size];
        reader.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Reads a tag's values, widening each to u64
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> QaResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(QaError::TagNotFound(tag))?;

        let bytes = self.read_tag_bytes(reader, entry)?;
        let mut values = Vec::with_capacity(entry.count as usize);
        tag_utils::read_tag_value_array(&mut Cursor::new(bytes), entry, self.handler()?, &mut values)?;

        Ok(values)
    }

    /// Reads a tag's payload re-encoded as little-endian
    pub fn read_tag_payload_le(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> QaResult<Vec<u8>> {
        let bytes = self.read_tag_bytes(reader, entry)?;
        tag_utils::reencode_little_endian(&mut Cursor::new(bytes), entry, self.handler()?)
    }

    /// Reads an ASCII tag, dropping trailing NULs
    pub fn read_ascii(&self, reader: &mut dyn SeekableReader, entry: &IFDEntry) -> QaResult<String> {
        if entry.field_type != field_types::ASCII {
            return Err(QaError::UnsupportedFieldType(entry.field_type));
        }
        let mut bytes = self.read_tag_bytes(reader, entry)?;
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Byte order of the current file, once read
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.byte_order
    }

    /// Gets the current byte order handler
    pub fn get_byte_order_handler(&self) -> Option<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
    }
}
