//! Persistent dictionary
//!
//! An ordered in-memory mapping that is hydrated from disk when opened and
//! written back only on [`PersistentDict::sync`] / [`PersistentDict::close`]
//! (or when dropped). Input format is detected; output format is fixed by
//! [`StoreOptions`].
//!
//! Writes go to `<path>.tmp` first and are committed with a rename, so a
//! reader sees either the previous file or the new one. Two processes holding
//! the same file still race: the last writer wins.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use indexmap::map::{Entry, Iter, Keys, Values};
use tracing::{debug, warn};

use super::driver::{Driver, DriverRegistry, Format};
use super::error::StoreError;
use super::value::Value;
use super::Records;

/// How the backing file is treated when opening.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Load the file if it exists, write on sync.
    #[default]
    Create,
    /// Load the file if it exists, never write.
    ReadOnly,
    /// Ignore any existing content, write on sync.
    New,
}

impl FromStr for OpenMode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "c" | "create" => Ok(OpenMode::Create),
            "r" | "readonly" | "read-only" => Ok(OpenMode::ReadOnly),
            "n" | "new" => Ok(OpenMode::New),
            _ => Err(StoreError::UnknownMode(s.to_string())),
        }
    }
}

/// Options fixed at construction
#[derive(Debug, Default)]
pub struct StoreOptions {
    pub mode: OpenMode,
    /// Unix permission bits applied to the file after every commit.
    pub permissions: Option<u32>,
    /// Output format; input is always detected.
    pub format: Format,
    pub registry: DriverRegistry,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn permissions(mut self, permissions: u32) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn registry(mut self, registry: DriverRegistry) -> Self {
        self.registry = registry;
        self
    }
}

/// Ordered key/value store persisted to a single file.
#[derive(Debug)]
pub struct PersistentDict {
    records: Records,
    path: PathBuf,
    options: StoreOptions,
    detected: Option<Format>,
    closed: bool,
}

impl PersistentDict {
    /// Open the store at `path`.
    pub fn open(path: impl Into<PathBuf>, options: StoreOptions) -> Result<Self, StoreError> {
        Self::open_with(path, options, std::iter::empty::<(String, Value)>())
    }

    /// Open the store at `path`, then apply `initial` on top of whatever was
    /// loaded.
    pub fn open_with<I, K, V>(
        path: impl Into<PathBuf>,
        options: StoreOptions,
        initial: I,
    ) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let path = path.into();
        let (detected, mut records) = if options.mode == OpenMode::New {
            (None, Records::new())
        } else {
            match hydrate(&path, &options.registry)? {
                Some((format, records)) => (Some(format), records),
                None => (None, Records::new()),
            }
        };
        records.extend(initial.into_iter().map(|(k, v)| (k.into(), v.into())));

        Ok(Self {
            records,
            path,
            options,
            detected,
            closed: false,
        })
    }

    /// Open a store, run `f` on it and close it on every exit path.
    ///
    /// An error from `f` takes precedence over an error from closing.
    pub fn scoped<T, E, F>(path: impl Into<PathBuf>, options: StoreOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut PersistentDict) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut dict = Self::open(path, options)?;
        let result = f(&mut dict);
        let closed = dict.close();
        let value = result?;
        closed?;
        Ok(value)
    }

    /// Write the whole mapping to disk. Does nothing in read-only mode.
    pub fn sync(&mut self) -> Result<(), StoreError> {
        if self.options.mode == OpenMode::ReadOnly {
            return Ok(());
        }

        let format = self.options.format;
        let driver = self
            .options
            .registry
            .get(format)
            .ok_or_else(|| StoreError::UnsupportedFormat(format.name().to_string()))?;

        let temp_path = temp_path(&self.path);
        let committed = write_temp_file(&temp_path, driver, &self.records)
            .and_then(|()| fs::rename(&temp_path, &self.path).map_err(StoreError::from));
        if let Err(e) = committed {
            remove_temp_file(&temp_path);
            return Err(e);
        }

        self.apply_permissions()?;
        debug!(
            "Synced {} entries to {:?} as {}",
            self.records.len(),
            self.path,
            format
        );
        Ok(())
    }

    /// Final sync; the store cannot be used afterwards.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.closed = true;
        self.sync()
    }

    fn apply_permissions(&self) -> Result<(), StoreError> {
        let Some(mode) = self.options.permissions else {
            return Ok(());
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(mode))?;
        }

        #[cfg(not(unix))]
        warn!("Ignoring permissions {:o} for {:?} on this platform", mode, self.path);

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> Format {
        self.options.format
    }

    pub fn mode(&self) -> OpenMode {
        self.options.mode
    }

    /// Format the existing file was read as, if one was loaded.
    pub fn detected_format(&self) -> Option<Format> {
        self.detected
    }

    pub fn records(&self) -> &Records {
        &self.records
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.records.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.records.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    /// Insert or replace; a replaced key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.records.insert(key.into(), value.into())
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.records.shift_remove(key)
    }

    pub fn entry(&mut self, key: impl Into<String>) -> Entry<'_, String, Value> {
        self.records.entry(key.into())
    }

    pub fn update<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.records
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.records.iter()
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.records.keys()
    }

    pub fn values(&self) -> Values<'_, String, Value> {
        self.records.values()
    }
}

impl Drop for PersistentDict {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.sync() {
            warn!("Failed to sync {:?} on drop: {}", self.path, e);
        }
    }
}

impl Index<&str> for PersistentDict {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        &self.records[key]
    }
}

impl<'a> IntoIterator for &'a PersistentDict {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Extend<(String, Value)> for PersistentDict {
    fn extend<T: IntoIterator<Item = (String, Value)>>(&mut self, iter: T) {
        self.records.extend(iter);
    }
}

/// Load `path` with the first driver that accepts it.
///
/// A missing or unreadable file is not an error and yields `None`.
fn hydrate(
    path: &Path,
    registry: &DriverRegistry,
) -> Result<Option<(Format, Records)>, StoreError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            debug!("Starting empty, {:?} not readable: {}", path, e);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    match registry.detect(&mut reader) {
        Some((format, records)) => {
            debug!("Loaded {} entries from {:?} as {}", records.len(), path, format);
            Ok(Some((format, records)))
        }
        None => Err(StoreError::NoSupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

fn write_temp_file(
    temp_path: &Path,
    driver: &dyn Driver,
    records: &Records,
) -> Result<(), StoreError> {
    let mut writer = BufWriter::new(File::create(temp_path)?);
    driver.dump(&mut writer, records)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(())
}

fn remove_temp_file(temp_path: &Path) {
    match fs::remove_file(temp_path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove temp file {:?}: {}", temp_path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_temp_path_appends_suffix() {
        assert_eq!(
            temp_path(Path::new("/tmp/hosts.json")),
            PathBuf::from("/tmp/hosts.json.tmp")
        );
        assert_eq!(temp_path(Path::new("store")), PathBuf::from("store.tmp"));
    }

    #[test]
    fn test_open_mode_names() {
        assert_eq!("c".parse::<OpenMode>().unwrap(), OpenMode::Create);
        assert_eq!("readonly".parse::<OpenMode>().unwrap(), OpenMode::ReadOnly);
        assert_eq!("n".parse::<OpenMode>().unwrap(), OpenMode::New);
        assert!(matches!(
            "w".parse::<OpenMode>(),
            Err(StoreError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_missing_file_starts_empty() {
        let temp = tempdir().unwrap();
        let dict = PersistentDict::open(
            temp.path().join("missing.json"),
            StoreOptions::new().mode(OpenMode::ReadOnly),
        )
        .unwrap();
        assert!(dict.is_empty());
        assert_eq!(dict.detected_format(), None);
    }

    #[test]
    fn test_mapping_operations() {
        let temp = tempdir().unwrap();
        let mut dict = PersistentDict::open(
            temp.path().join("store"),
            StoreOptions::new().mode(OpenMode::ReadOnly),
        )
        .unwrap();

        dict.insert("a", 1i64);
        dict.insert("b", "two");
        dict.insert("c", true);
        assert_eq!(dict.insert("a", 10i64), Some(Value::Integer(1)));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);

        assert_eq!(dict.remove("b"), Some(Value::from("two")));
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["a", "c"]);
        assert!(dict.contains_key("c"));
        assert!(!dict.contains_key("b"));
        assert_eq!(dict["a"], Value::Integer(10));

        dict.entry("d").or_insert(Value::Null);
        dict.update([("e", "five")]);
        assert_eq!(dict.len(), 4);
        assert_eq!((&dict).into_iter().count(), 4);

        dict.clear();
        assert!(dict.is_empty());
    }
}
