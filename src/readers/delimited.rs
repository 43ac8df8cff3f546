use crate::error::{ProcessingError, Result};
use crate::models::CanonicalRecord;
use crate::processors::RecordNormalizer;
use crate::schema::HeaderCheck;
use crate::utils::constants::{DEFAULT_BUFFER_SIZE, GZIP_MAGIC, SOURCE_DELIMITER};
use csv::{ByteRecord, ReaderBuilder};
use encoding_rs::WINDOWS_1252;
use flate2::read::MultiGzDecoder;
use std::borrow::Cow;
use std::io::Read;

/// How a downloaded payload is wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Payload must be gzip; anything else is a decompression failure.
    Gzip,
    /// Gzip when the payload starts with the gzip magic bytes, plain otherwise.
    Detect,
    Plain,
}

impl Compression {
    pub fn open<'a>(&self, payload: &'a [u8]) -> Result<Box<dyn Read + Send + 'a>> {
        let is_gzip = payload.starts_with(&GZIP_MAGIC);
        match self {
            Compression::Gzip if !is_gzip => Err(ProcessingError::Decompression(
                "payload is not gzip-compressed".to_string(),
            )),
            Compression::Gzip => Ok(Box::new(MultiGzDecoder::new(payload))),
            Compression::Detect if is_gzip => Ok(Box::new(MultiGzDecoder::new(payload))),
            Compression::Detect | Compression::Plain => Ok(Box::new(payload)),
        }
    }
}

/// UTF-8 when valid, Windows-1252 otherwise.
pub fn decode_field(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

/// Counters for one pass over a payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Source records read, whatever became of them.
    pub observed: u64,
    pub accepted: u64,
    /// Records whose key columns normalized to null or empty.
    pub rejected: u64,
    pub header: HeaderCheck,
}

/// Streams a compressed, delimited payload through a `RecordNormalizer`.
#[derive(Debug, Clone, Copy)]
pub struct DelimitedReader {
    normalizer: RecordNormalizer,
    compression: Compression,
}

impl DelimitedReader {
    pub fn new(normalizer: RecordNormalizer) -> Self {
        Self {
            normalizer,
            compression: Compression::Gzip,
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn normalizer(&self) -> &RecordNormalizer {
        &self.normalizer
    }

    /// Hand every record with a usable key to `sink`, one at a time.
    pub fn for_each<F>(&self, payload: &[u8], mut sink: F) -> Result<ScanStats>
    where
        F: FnMut(CanonicalRecord) -> Result<()>,
    {
        let input = self.compression.open(payload)?;
        let mut reader = ReaderBuilder::new()
            .delimiter(SOURCE_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .buffer_capacity(DEFAULT_BUFFER_SIZE)
            .from_reader(input);

        let header: Vec<String> = reader
            .byte_headers()
            .map_err(read_error)?
            .iter()
            .map(|h| decode_field(h).trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut stats = ScanStats {
            header: self.normalizer.schema().check_header(header.as_slice()),
            ..ScanStats::default()
        };
        let index = self.normalizer.bind_header(header.as_slice());

        // Without its key columns a file cannot yield a single keyed row.
        let absent: Vec<&str> = self
            .normalizer
            .schema()
            .key_sources()
            .into_iter()
            .filter(|source| index.position(source).is_none())
            .collect();
        if !absent.is_empty() {
            return Err(ProcessingError::MissingData(format!(
                "header has no {} column",
                absent.join(", ")
            )));
        }

        let mut raw = ByteRecord::new();
        while reader.read_byte_record(&mut raw).map_err(read_error)? {
            stats.observed += 1;

            let decoded: Vec<Cow<'_, str>> = raw.iter().map(decode_field).collect();
            let record = self.normalizer.normalize(&index.row(decoded.as_slice()));
            if !self.normalizer.has_valid_key(&record) {
                stats.rejected += 1;
                continue;
            }

            sink(record)?;
            stats.accepted += 1;
        }

        Ok(stats)
    }

    /// Collect every accepted record in memory.
    pub fn read_all(&self, payload: &[u8]) -> Result<(Vec<CanonicalRecord>, ScanStats)> {
        let mut records = Vec::new();
        let stats = self.for_each(payload, |record| {
            records.push(record);
            Ok(())
        })?;
        Ok((records, stats))
    }
}

// Read failures underneath the parser come from the decompressor.
fn read_error(err: csv::Error) -> ProcessingError {
    if err.is_io_error() {
        ProcessingError::Decompression(err.to_string())
    } else {
        ProcessingError::Csv(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Value;
    use crate::schema::DatasetKind;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn station_reader() -> DelimitedReader {
        DelimitedReader::new(RecordNormalizer::for_kind(DatasetKind::Station))
    }

    #[test]
    fn test_reads_gzip_payload() -> Result<()> {
        let payload = gzip(b"NUM_POSTE;NOM_USUEL;DATFERM;ALTI\n14002;Paris;;75\n75114001;Orly;2001-06-30;89\n");
        let (records, stats) = station_reader().read_all(&payload)?;

        assert_eq!(stats.observed, 2);
        assert_eq!(stats.accepted, 2);
        assert_eq!(records[0].get("numPoste"), Some(&Value::Text("00014002".to_string())));
        assert_eq!(records[0].get("posteOuvert"), Some(&Value::Bool(true)));
        assert_eq!(records[1].get("posteOuvert"), Some(&Value::Bool(false)));
        assert!(stats.header.missing.contains(&"COMMUNE".to_string()));
        Ok(())
    }

    #[test]
    fn test_rejects_blank_keys() -> Result<()> {
        let payload = gzip(b"NUM_POSTE;NOM_USUEL\n;Nowhere\n14002;Paris\n");
        let (records, stats) = station_reader().read_all(&payload)?;
        assert_eq!(records.len(), 1);
        assert_eq!(stats.observed, 2);
        assert_eq!(stats.rejected, 1);
        Ok(())
    }

    #[test]
    fn test_plain_payload_requires_detection() {
        let payload = b"NUM_POSTE;NOM_USUEL\n14002;Paris\n";
        let err = station_reader().read_all(payload).unwrap_err();
        assert!(matches!(err, ProcessingError::Decompression(_)));

        let (records, _) = station_reader()
            .with_compression(Compression::Detect)
            .read_all(payload)
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_corrupt_gzip_is_decompression_error() {
        let mut payload = gzip(b"NUM_POSTE;NOM_USUEL\n14002;Paris\n75114001;Orly\n");
        // Damage the CRC32 trailer: every row inflates, the checksum fails.
        let crc = payload.len() - 8;
        for byte in &mut payload[crc..crc + 4] {
            *byte ^= 0xFF;
        }
        let err = station_reader().read_all(&payload).unwrap_err();
        assert!(matches!(err, ProcessingError::Decompression(_)));
    }

    #[test]
    fn test_header_without_key_column() {
        let payload = gzip(b"NOM_USUEL;ALTI\nParis;75\n");
        let err = station_reader().read_all(&payload).unwrap_err();
        assert!(matches!(err, ProcessingError::MissingData(_)));
        assert!(err.to_string().contains("NUM_POSTE"));
    }

    #[test]
    fn test_windows_1252_fallback() -> Result<()> {
        // "Sète" in Windows-1252
        let mut data = b"NUM_POSTE;NOM_USUEL\n34301002;S".to_vec();
        data.push(0xE8);
        data.extend_from_slice(b"te\n");
        let (records, _) = station_reader().read_all(&gzip(&data))?;
        assert_eq!(records[0].get("nomUsuel"), Some(&Value::Text("Sète".to_string())));
        Ok(())
    }

    #[test]
    fn test_decode_field() {
        assert_eq!(decode_field(b"Paris"), "Paris");
        assert_eq!(decode_field("Sète".as_bytes()), "Sète");
        assert_eq!(decode_field(&[0x53, 0xE8, 0x74, 0x65]), "Sète");
    }
}
