//! A VCF reader.

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::{self};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::consequence::Format;
use crate::variant::record;
use crate::variant::record::Parsed;
use crate::variant::record::Record;

/// The new line character.
const NEW_LINE: char = '\n';

/// The carriage return character.
const CARRIAGE_RETURN: char = '\r';

/// The prefix for meta lines.
const META_PREFIX: &str = "##";

/// The prefix for the column header line.
const HEADER_PREFIX: char = '#';

/// The extension of gzip-compressed input.
const GZ_EXTENSION: &str = "gz";

/// An error related to a [`Reader`].
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// An invalid variant record.
    Record(record::ParseError, String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Record(err, line) => {
                write!(f, "invalid variant record: {err}\n\nline: {line}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// A VCF reader.
///
/// The reader consumes meta (`##`) lines and the column header line itself,
/// discovering the annotation payload [`Format`] from the `CSQ` meta line
/// along the way, and hands every data line to the variant record parser.
#[derive(Debug)]
pub struct Reader<T>
where
    T: BufRead,
{
    /// The inner reader.
    inner: T,

    /// The annotation payload format, updated when the `CSQ` meta line is
    /// seen.
    format: Format,
}

impl Reader<Box<dyn BufRead>> {
    /// Opens a VCF file from a path, transparently decompressing gzip input.
    ///
    /// Both plain `.vcf` and `.vcf.gz` files are supported, based on the file
    /// extension.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        let inner: Box<dyn BufRead> = match path.extension().and_then(|ext| ext.to_str()) {
            Some(GZ_EXTENSION) => Box::new(BufReader::new(MultiGzDecoder::new(file))),
            _ => Box::new(BufReader::new(file)),
        };

        Ok(Self::new(inner))
    }
}

impl<T> Reader<T>
where
    T: BufRead,
{
    /// Creates a VCF reader.
    ///
    /// # Examples
    ///
    /// ```
    /// let data = b"##fileformat=VCFv4.2\n1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant";
    /// let reader = vartrack::Reader::new(&data[..]);
    /// ```
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            format: Format::default(),
        }
    }

    /// Returns the annotation payload format discovered so far.
    ///
    /// Meta lines precede every data line, so by the time the first record
    /// has been read, the format is final.
    pub fn format(&self) -> &Format {
        &self.format
    }

    /// Gets a reference to the inner reader.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Gets a mutable reference to the inner reader.
    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consumes self and returns the inner reader.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Reads a raw, textual line from the underlying reader.
    pub fn read_line_raw(&mut self, buffer: &mut String) -> io::Result<usize> {
        read_line(&mut self.inner, buffer)
    }

    /// Attempts to read the next data line from the underlying reader,
    /// consuming any header lines in between.
    ///
    /// [`None`] is returned at end of input. A well-formed but unusable
    /// record is returned as [`Parsed::Skipped`] so the caller can log it.
    ///
    /// # Examples
    ///
    /// ```
    /// use vartrack::variant::record::Parsed;
    ///
    /// let data = b"##fileformat=VCFv4.2\n1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant";
    /// let mut reader = vartrack::Reader::new(&data[..]);
    ///
    /// let mut buffer = String::new();
    /// assert!(matches!(
    ///     reader.read_record(&mut buffer)?,
    ///     Some(Parsed::Record(_))
    /// ));
    /// assert!(matches!(reader.read_record(&mut buffer)?, None));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn read_record(&mut self, buffer: &mut String) -> Result<Option<Parsed>, Error> {
        loop {
            let read = self.read_line_raw(buffer).map_err(Error::Io)?;
            if read == 0 {
                return Ok(None);
            }

            if buffer.is_empty() {
                continue;
            }

            if buffer.starts_with(META_PREFIX) {
                if let Some(format) = Format::from_meta_line(buffer) {
                    self.format = format;
                }

                continue;
            }

            if buffer.starts_with(HEADER_PREFIX) {
                continue;
            }

            let parsed = Record::parse(buffer).map_err(|e| Error::Record(e, buffer.clone()))?;
            return Ok(Some(parsed));
        }
    }
}

impl<T> From<T> for Reader<T>
where
    T: BufRead,
{
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

/// Reads a line from a buffered reader.
///
/// This method is copied almost directly from noodles-gtf. I repurposed it
/// because it captures pretty much exactly what I need to do for this reader.
fn read_line<T>(reader: &mut T, buffer: &mut String) -> io::Result<usize>
where
    T: BufRead,
{
    buffer.clear();

    match reader.read_line(buffer) {
        Ok(0) => Ok(0),
        Ok(n) => {
            if buffer.ends_with(NEW_LINE) {
                buffer.pop();

                if buffer.ends_with(CARRIAGE_RETURN) {
                    buffer.pop();
                }
            }

            Ok(n)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_read_line() {
        let data = b"hello\r\nworld!";
        let mut cursor = io::Cursor::new(data);

        let mut buffer = String::new();
        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "hello");
        assert_eq!(len, 7);

        let len = read_line(&mut cursor, &mut buffer).unwrap();
        assert_eq!(buffer, "world!");
        assert_eq!(len, 6);
    }

    #[test]
    fn test_format_discovery_from_meta_lines() -> Result<(), Box<dyn std::error::Error>> {
        let data = b"##fileformat=VCFv4.2\n\
            ##INFO=<ID=CSQ,Number=.,Type=String,Description=\"Consequence annotations. \
            Format: Allele|Consequence|IMPACT|VARIANT_CLASS\">\n\
            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
            1\t10175\trs3\tT\tC\t.\t.\tCSQ=C|intron_variant||SNV\n";

        let mut reader = Reader::new(&data[..]);
        let mut buffer = String::new();

        let parsed = reader.read_record(&mut buffer)?.unwrap();
        assert!(matches!(parsed, Parsed::Record(_)));

        assert_eq!(reader.format().consequence(), 1);
        assert_eq!(reader.format().variant_class(), Some(3));

        assert!(reader.read_record(&mut buffer)?.is_none());

        Ok(())
    }

    #[test]
    fn test_skips_are_surfaced_not_swallowed() -> Result<(), Box<dyn std::error::Error>> {
        let data = b"1\t100\trs1;rs2\tA\tC\t.\t.\tCSQ=C|intron_variant\n";
        let mut reader = Reader::new(&data[..]);
        let mut buffer = String::new();

        let parsed = reader.read_record(&mut buffer)?.unwrap();
        assert!(matches!(parsed, Parsed::Skipped { .. }));

        Ok(())
    }

    #[test]
    fn test_malformed_records_are_errors() {
        let data = b"1\t100\trs1\n";
        let mut reader = Reader::new(&data[..]);
        let mut buffer = String::new();

        let err = reader.read_record(&mut buffer).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid variant record: invalid number of fields in variant record: \
             expected at least 8 fields, found 3 fields\n\nline: 1\t100\trs1"
        );
    }
}
