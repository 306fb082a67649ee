//! Format drivers
//!
//! A driver converts a whole record mapping to and from a byte stream in one
//! wire format. Drivers are stateless; the [`DriverRegistry`] maps each
//! [`Format`] to its driver and fixes the order used for format detection.

use std::fmt;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use std::str::FromStr;

use tracing::debug;

use super::error::{DriverError, StoreError};
use super::value::Value;
use super::Records;

/// A readable, rewindable input stream.
pub trait Source: Read + Seek {}

impl<T: Read + Seek> Source for T {}

/// Wire formats, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// MessagePack, round-trips every [`Value`].
    MsgPack,
    /// Compact JSON object.
    #[default]
    Json,
    /// Two-column CSV, one row per key. Lossy.
    Csv,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::MsgPack, Format::Json, Format::Csv];

    pub fn name(self) -> &'static str {
        match self {
            Format::MsgPack => "msgpack",
            Format::Json => "json",
            Format::Csv => "csv",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "msgpack" | "binary" => Ok(Format::MsgPack),
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            _ => Err(StoreError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Symmetric encoder/decoder for one wire format.
pub trait Driver {
    /// Write the full mapping to `out`.
    fn dump(&self, out: &mut dyn Write, records: &Records) -> Result<(), DriverError>;

    /// Read a mapping from `input`, always starting at offset 0.
    fn load(&self, input: &mut dyn Source) -> Result<Records, DriverError>;
}

fn read_from_start(input: &mut dyn Source) -> Result<Vec<u8>, DriverError> {
    input.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    input.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// MessagePack driver
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackDriver;

impl Driver for MsgPackDriver {
    fn dump(&self, out: &mut dyn Write, records: &Records) -> Result<(), DriverError> {
        let bytes = rmp_serde::to_vec(records)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    fn load(&self, input: &mut dyn Source) -> Result<Records, DriverError> {
        let bytes = read_from_start(input)?;
        let mut cursor = Cursor::new(bytes.as_slice());
        let records: Records = rmp_serde::from_read(&mut cursor)?;
        if cursor.position() as usize != bytes.len() {
            return Err(DriverError::TrailingBytes);
        }
        Ok(records)
    }
}

/// JSON driver, written without whitespace between tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDriver;

impl Driver for JsonDriver {
    fn dump(&self, out: &mut dyn Write, records: &Records) -> Result<(), DriverError> {
        for (key, value) in records {
            if let Some(rest) = value.first_non_json() {
                let path = if rest.is_empty() {
                    key.clone()
                } else {
                    format!("{key}.{rest}")
                };
                return Err(DriverError::NotJsonSafe { path });
            }
        }
        serde_json::to_writer(&mut *out, records)?;
        Ok(())
    }

    fn load(&self, input: &mut dyn Source) -> Result<Records, DriverError> {
        let bytes = read_from_start(input)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Two-column CSV driver.
///
/// Values are written in their [`Display`](fmt::Display) form and read back
/// as [`Value::Text`], so anything that is not text loses its type.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvDriver;

impl Driver for CsvDriver {
    fn dump(&self, out: &mut dyn Write, records: &Records) -> Result<(), DriverError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::CRLF)
            .from_writer(&mut *out);
        for (key, value) in records {
            let rendered = value.to_string();
            writer.write_record([key.as_str(), rendered.as_str()])?;
        }
        writer.flush()?;
        Ok(())
    }

    fn load(&self, input: &mut dyn Source) -> Result<Records, DriverError> {
        input.seek(SeekFrom::Start(0))?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&mut *input);

        let mut records = Records::new();
        for (index, row) in reader.records().enumerate() {
            let row = row?;
            if row.len() != 2 {
                return Err(DriverError::MalformedRow {
                    row: index + 1,
                    columns: row.len(),
                });
            }
            records.insert(row[0].to_string(), Value::Text(row[1].to_string()));
        }
        Ok(records)
    }
}

/// Decode `input` with one driver.
pub fn try_decode(driver: &dyn Driver, input: &mut dyn Source) -> Result<Records, DriverError> {
    driver.load(input)
}

/// Ordered table of drivers keyed by format.
pub struct DriverRegistry {
    drivers: Vec<(Format, Box<dyn Driver>)>,
}

impl DriverRegistry {
    /// Registry with no drivers at all
    pub fn empty() -> Self {
        Self {
            drivers: Vec::new(),
        }
    }

    /// Register `driver` for `format`.
    ///
    /// Replacing an already registered format keeps its detection position;
    /// a new format is tried last.
    pub fn with_driver(mut self, format: Format, driver: impl Driver + 'static) -> Self {
        let driver: Box<dyn Driver> = Box::new(driver);
        match self.drivers.iter_mut().find(|(f, _)| *f == format) {
            Some(slot) => slot.1 = driver,
            None => self.drivers.push((format, driver)),
        }
        self
    }

    pub fn get(&self, format: Format) -> Option<&dyn Driver> {
        self.drivers
            .iter()
            .find(|(f, _)| *f == format)
            .map(|(_, driver)| driver.as_ref())
    }

    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        self.drivers.iter().map(|(format, _)| *format)
    }

    /// Try every driver in registration order and return the first success.
    pub fn detect(&self, input: &mut dyn Source) -> Option<(Format, Records)> {
        for (format, driver) in &self.drivers {
            match try_decode(driver.as_ref(), input) {
                Ok(records) => return Some((*format, records)),
                Err(e) => debug!("Not a {} stream: {}", format, e),
            }
        }
        None
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::empty()
            .with_driver(Format::MsgPack, MsgPackDriver)
            .with_driver(Format::Json, JsonDriver)
            .with_driver(Format::Csv, CsvDriver)
    }
}

impl fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.formats()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use proptest::prelude::*;

    fn roundtrip(driver: &dyn Driver, records: &Records) -> Records {
        let mut buf = Vec::new();
        driver.dump(&mut buf, records).unwrap();
        driver.load(&mut Cursor::new(buf)).unwrap()
    }

    fn nested_records() -> Records {
        let mut options = IndexMap::new();
        options.insert("port".to_string(), Value::Integer(2222));
        options.insert("agent".to_string(), Value::Bool(false));
        options.insert("ratio".to_string(), Value::Float(0.5));

        let mut records = Records::new();
        records.insert("host1".to_string(), Value::from("1.2.3.4"));
        records.insert("options".to_string(), Value::Map(options));
        records.insert(
            "tags".to_string(),
            Value::List(vec!["prod".into(), Value::Null, Value::Integer(-1)]),
        );
        records
    }

    #[test]
    fn test_format_names() {
        for format in Format::ALL {
            assert_eq!(format.name().parse::<Format>().unwrap(), format);
        }
        assert_eq!("binary".parse::<Format>().unwrap(), Format::MsgPack);
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert!(matches!(
            "yaml".parse::<Format>(),
            Err(StoreError::UnsupportedFormat(name)) if name == "yaml"
        ));
        assert_eq!(Format::default(), Format::Json);
    }

    #[test]
    fn test_json_is_compact() {
        let mut records = Records::new();
        records.insert("host1".to_string(), Value::from("1.2.3.4"));
        records.insert("port".to_string(), Value::Integer(22));

        let mut buf = Vec::new();
        JsonDriver.dump(&mut buf, &records).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), r#"{"host1":"1.2.3.4","port":22}"#);
    }

    #[test]
    fn test_json_roundtrip_preserves_order() {
        let records = nested_records();
        let loaded = roundtrip(&JsonDriver, &records);
        assert_eq!(loaded, records);
        assert_eq!(
            loaded.keys().collect::<Vec<_>>(),
            vec!["host1", "options", "tags"]
        );
    }

    #[test]
    fn test_json_refuses_bytes() {
        let mut records = nested_records();
        records
            .get_mut("options")
            .and_then(Value::as_map_mut)
            .unwrap()
            .insert("key".to_string(), Value::Bytes(vec![1, 2, 3]));

        let err = JsonDriver.dump(&mut Vec::new(), &records).unwrap_err();
        assert!(matches!(err, DriverError::NotJsonSafe { ref path } if path == "options.key"));
    }

    #[test]
    fn test_json_rejects_non_object() {
        let err = JsonDriver.load(&mut Cursor::new(b"[1,2]".to_vec()));
        assert!(err.is_err());
    }

    #[test]
    fn test_msgpack_roundtrip_non_json_values() {
        let mut records = nested_records();
        records.insert("blob".to_string(), Value::Bytes(vec![0, 159, 255]));
        records.insert("inf".to_string(), Value::Float(f64::INFINITY));
        assert_eq!(roundtrip(&MsgPackDriver, &records), records);
    }

    #[test]
    fn test_msgpack_rejects_json_text() {
        let input = br#"{"host1":"1.2.3.4"}"#.to_vec();
        assert!(MsgPackDriver.load(&mut Cursor::new(input)).is_err());
    }

    #[test]
    fn test_msgpack_rejects_trailing_bytes() {
        let mut buf = rmp_serde::to_vec(&nested_records()).unwrap();
        buf.push(0xc0);
        let err = MsgPackDriver.load(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, DriverError::TrailingBytes));
    }

    #[test]
    fn test_csv_layout() {
        let mut records = Records::new();
        records.insert("host1".to_string(), Value::from("1.2.3.4"));
        records.insert("note".to_string(), Value::from("a, b"));

        let mut buf = Vec::new();
        CsvDriver.dump(&mut buf, &records).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "host1,1.2.3.4\r\nnote,\"a, b\"\r\n"
        );
    }

    #[test]
    fn test_csv_is_lossy() {
        let records = nested_records();
        let loaded = roundtrip(&CsvDriver, &records);

        assert_eq!(loaded.len(), records.len());
        for ((key, value), (loaded_key, loaded_value)) in records.iter().zip(&loaded) {
            assert_eq!(key, loaded_key);
            assert_eq!(loaded_value, &Value::Text(value.to_string()));
        }
        assert_eq!(loaded["host1"], Value::from("1.2.3.4"));
    }

    #[test]
    fn test_csv_rejects_wrong_column_count() {
        let err = CsvDriver
            .load(&mut Cursor::new(b"a,b\r\nc\r\n".to_vec()))
            .unwrap_err();
        assert!(matches!(err, DriverError::MalformedRow { row: 2, columns: 1 }));
    }

    #[test]
    fn test_load_rewinds_stream() {
        let mut buf = Vec::new();
        JsonDriver.dump(&mut buf, &nested_records()).unwrap();
        let mut cursor = Cursor::new(buf);
        cursor.seek(SeekFrom::End(0)).unwrap();
        assert_eq!(JsonDriver.load(&mut cursor).unwrap(), nested_records());
    }

    #[test]
    fn test_registry_detection_order() {
        let registry = DriverRegistry::default();
        assert_eq!(
            registry.formats().collect::<Vec<_>>(),
            vec![Format::MsgPack, Format::Json, Format::Csv]
        );

        let records = nested_records();
        for format in Format::ALL {
            let mut buf = Vec::new();
            registry.get(format).unwrap().dump(&mut buf, &records).unwrap();
            let (detected, _) = registry.detect(&mut Cursor::new(buf)).unwrap();
            assert_eq!(detected, format);
        }
    }

    #[test]
    fn test_registry_detect_exhausted() {
        let registry = DriverRegistry::default();
        assert!(registry
            .detect(&mut Cursor::new(b"not a store".to_vec()))
            .is_none());
    }

    #[test]
    fn test_registry_replace_keeps_position() {
        let registry = DriverRegistry::default().with_driver(Format::MsgPack, JsonDriver);
        assert_eq!(registry.formats().next(), Some(Format::MsgPack));
        assert_eq!(registry.formats().count(), 3);

        let partial = DriverRegistry::empty().with_driver(Format::Csv, CsvDriver);
        assert!(partial.get(Format::Json).is_none());
    }

    fn json_safe_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            ((1u64 << 63)..=u64::MAX).prop_map(Value::UInteger),
            (-1_000_000i32..1_000_000).prop_map(|n| Value::Float(f64::from(n) / 4.0)),
            "[a-zA-Z0-9 ._-]{0,12}".prop_map(Value::Text),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..4)
                    .prop_map(|pairs| Value::Map(pairs.into_iter().collect())),
            ]
        })
    }

    fn any_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            json_safe_value(),
            prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
            Just(Value::Float(f64::NEG_INFINITY)),
        ]
    }

    proptest! {
        #[test]
        fn prop_json_roundtrip(entries in prop::collection::vec(("[a-z0-9]{1,8}", json_safe_value()), 0..8)) {
            let records: Records = entries.into_iter().collect();
            prop_assert_eq!(roundtrip(&JsonDriver, &records), records);
        }

        #[test]
        fn prop_msgpack_roundtrip(entries in prop::collection::vec(("[a-z0-9]{1,8}", any_value()), 0..8)) {
            let records: Records = entries.into_iter().collect();
            prop_assert_eq!(roundtrip(&MsgPackDriver, &records), records);
        }
    }
}
