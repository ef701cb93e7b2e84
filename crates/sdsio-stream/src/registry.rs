use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::error::{Result, StreamError};
use crate::name::validate_name;

/// Extension of recorded stream files.
pub const DEFAULT_EXTENSION: &str = "sds";

/// Mode requested by an `Open` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `0`: play a recorded stream back. Recognised but not implemented.
    Read,
    /// `1`: record a new stream.
    Write,
}

impl TryFrom<u32> for OpenMode {
    type Error = StreamError;

    fn try_from(mode: u32) -> Result<Self> {
        match mode {
            0 => Ok(Self::Read),
            1 => Ok(Self::Write),
            other => Err(StreamError::UnsupportedMode(other)),
        }
    }
}

/// Snapshot of one stream, as returned by [`StreamRegistry::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    pub id: u32,
    pub name: String,
    pub path: PathBuf,
    pub bytes_written: u64,
}

/// Running counters over the registry's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub opened: u64,
    pub closed: u64,
    pub bytes_written: u64,
}

struct OpenStream {
    name: String,
    path: PathBuf,
    file: File,
    bytes_written: u64,
}

impl OpenStream {
    fn info(&self, id: u32) -> StreamInfo {
        StreamInfo {
            id,
            name: self.name.clone(),
            path: self.path.clone(),
            bytes_written: self.bytes_written,
        }
    }
}

/// Owns every open stream and the id counter.
///
/// Ids start at 1 and increase by one per successful open. They are never
/// reused, and a failed open does not consume one. Id 0 is reserved as the
/// failure sentinel on the wire.
pub struct StreamRegistry {
    out_dir: PathBuf,
    extension: String,
    next_id: u32,
    streams: BTreeMap<u32, OpenStream>,
    stats: RegistryStats,
}

impl StreamRegistry {
    /// Create a registry writing `.sds` files into `out_dir`.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self::with_extension(out_dir, DEFAULT_EXTENSION)
    }

    /// Create a registry with a custom file extension.
    pub fn with_extension(out_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            extension: extension.into(),
            next_id: 1,
            streams: BTreeMap::new(),
            stats: RegistryStats::default(),
        }
    }

    /// Open a stream for recording and return its id.
    ///
    /// `mode` is the raw wire value. The file name is picked fresh on every
    /// call as the lowest unused `<name>.<index>.<ext>` in the output directory.
    pub fn open(&mut self, mode: u32, name: &str) -> Result<u32> {
        match OpenMode::try_from(mode)? {
            OpenMode::Read => return Err(StreamError::ReadModeUnsupported),
            OpenMode::Write => {}
        }
        validate_name(name).map_err(|reason| StreamError::InvalidName {
            name: name.to_string(),
            reason,
        })?;

        let id = self.next_id;
        if id == 0 {
            return Err(StreamError::IdsExhausted);
        }

        let (path, file) = self.create_unique(name)?;
        self.next_id = id.wrapping_add(1);
        self.stats.opened += 1;

        info!(stream_id = id, name, path = %path.display(), "stream opened");
        self.streams.insert(
            id,
            OpenStream {
                name: name.to_string(),
                path,
                file,
                bytes_written: 0,
            },
        );
        Ok(id)
    }

    /// Append `data` to stream `id`. Returns the number of bytes written.
    pub fn write(&mut self, id: u32, data: &[u8]) -> Result<usize> {
        let stream = self
            .streams
            .get_mut(&id)
            .ok_or(StreamError::UnknownStream(id))?;
        stream
            .file
            .write_all(data)
            .map_err(|source| StreamError::Write { id, source })?;

        let len = data.len();
        stream.bytes_written += len as u64;
        self.stats.bytes_written += len as u64;
        trace!(stream_id = id, bytes = len, "stream write");
        Ok(len)
    }

    /// Flush and release stream `id`. The id is dead afterwards.
    pub fn close(&mut self, id: u32) -> Result<StreamInfo> {
        let mut stream = self
            .streams
            .remove(&id)
            .ok_or(StreamError::UnknownStream(id))?;
        self.stats.closed += 1;

        let info = stream.info(id);
        stream
            .file
            .flush()
            .map_err(|source| StreamError::Close { id, source })?;
        drop(stream);

        info!(
            stream_id = id,
            path = %info.path.display(),
            bytes = info.bytes_written,
            "stream closed"
        );
        Ok(info)
    }

    /// Close every open stream. Returns how many were closed.
    ///
    /// Failures are logged and do not stop the sweep.
    pub fn clear(&mut self) -> usize {
        let ids: Vec<u32> = self.streams.keys().copied().collect();
        let mut closed = 0;
        for id in ids {
            match self.close(id) {
                Ok(_) => closed += 1,
                Err(err) => warn!(stream_id = id, error = %err, "stream close failed during clear"),
            }
        }
        debug!(closed, "stream registry cleared");
        closed
    }

    /// Snapshot of an open stream.
    pub fn stream(&self, id: u32) -> Option<StreamInfo> {
        self.streams.get(&id).map(|stream| stream.info(id))
    }

    /// Number of currently open streams.
    pub fn open_count(&self) -> usize {
        self.streams.len()
    }

    /// The id the next successful open will be assigned (0 once exhausted).
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    fn file_path(&self, name: &str, index: u64) -> PathBuf {
        self.out_dir
            .join(format!("{name}.{index}.{}", self.extension))
    }

    fn create_unique(&self, name: &str) -> Result<(PathBuf, File)> {
        let mut index = 0u64;
        loop {
            let path = self.file_path(name, index);
            index += 1;
            if path.exists() {
                continue;
            }
            // create_new guards against a file appearing between the scan and the create.
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => return Err(StreamError::Create { path, source }),
            }
        }
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("out_dir", &self.out_dir)
            .field("next_id", &self.next_id)
            .field("open", &self.streams.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::NameError;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sdsio-stream-{tag}-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn first_open_creates_index_zero() {
        let dir = temp_dir("first-open");
        let mut registry = StreamRegistry::new(&dir);

        assert_eq!(registry.open(1, "sensor").unwrap(), 1);
        assert_eq!(entries(&dir), vec!["sensor.0.sds"]);
        assert_eq!(std::fs::metadata(dir.join("sensor.0.sds")).unwrap().len(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn ids_increase_and_are_never_reused() {
        let dir = temp_dir("ids");
        let mut registry = StreamRegistry::new(&dir);

        assert_eq!(registry.open(1, "a").unwrap(), 1);
        assert_eq!(registry.open(1, "b").unwrap(), 2);
        registry.close(1).unwrap();
        registry.close(2).unwrap();
        assert_eq!(registry.open(1, "a").unwrap(), 3);
        assert_eq!(registry.next_id(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_open_does_not_consume_id() {
        let dir = temp_dir("failed-open");
        let mut registry = StreamRegistry::new(&dir);

        assert!(registry.open(1, "").is_err());
        assert!(registry.open(0, "sensor").is_err());
        assert_eq!(registry.open(1, "sensor").unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn next_free_index_is_picked() {
        let dir = temp_dir("index");
        std::fs::write(dir.join("sensor.0.sds"), b"old").unwrap();
        std::fs::write(dir.join("sensor.2.sds"), b"old").unwrap();
        let mut registry = StreamRegistry::new(&dir);

        let first = registry.open(1, "sensor").unwrap();
        assert_eq!(
            registry.stream(first).unwrap().path,
            dir.join("sensor.1.sds")
        );
        let second = registry.open(1, "sensor").unwrap();
        assert_eq!(
            registry.stream(second).unwrap().path,
            dir.join("sensor.3.sds")
        );
        assert_eq!(std::fs::read(dir.join("sensor.0.sds")).unwrap(), b"old");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn writes_append_in_order() {
        let dir = temp_dir("append");
        let mut registry = StreamRegistry::new(&dir);
        let id = registry.open(1, "sensor").unwrap();

        assert_eq!(registry.write(id, &[1, 2, 3]).unwrap(), 3);
        assert_eq!(registry.write(id, &[]).unwrap(), 0);
        assert_eq!(registry.write(id, &[4]).unwrap(), 1);
        let info = registry.close(id).unwrap();

        assert_eq!(info.bytes_written, 4);
        assert_eq!(std::fs::read(&info.path).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(registry.stats().bytes_written, 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn closed_id_is_dead() {
        let dir = temp_dir("dead-id");
        let mut registry = StreamRegistry::new(&dir);
        let id = registry.open(1, "sensor").unwrap();
        registry.write(id, b"abc").unwrap();
        registry.close(id).unwrap();

        assert!(matches!(
            registry.write(id, b"more"),
            Err(StreamError::UnknownStream(1))
        ));
        assert!(matches!(
            registry.close(id),
            Err(StreamError::UnknownStream(1))
        ));
        assert_eq!(std::fs::read(dir.join("sensor.0.sds")).unwrap(), b"abc");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut registry = StreamRegistry::new(temp_dir("unknown"));
        assert!(matches!(
            registry.write(42, b"x"),
            Err(StreamError::UnknownStream(42))
        ));
        assert!(matches!(
            registry.close(0),
            Err(StreamError::UnknownStream(0))
        ));
        let _ = std::fs::remove_dir_all(registry.out_dir());
    }

    #[test]
    fn counter_wrap_exhausts_ids() {
        let dir = temp_dir("exhausted");
        let mut registry = StreamRegistry::new(&dir);
        registry.next_id = u32::MAX;

        assert_eq!(registry.open(1, "last").unwrap(), u32::MAX);
        assert_eq!(registry.next_id(), 0);
        assert!(matches!(
            registry.open(1, "after"),
            Err(StreamError::IdsExhausted)
        ));
        assert_eq!(entries(&dir), vec!["last.0.sds"]);

        registry.close(u32::MAX).unwrap();
        assert!(matches!(
            registry.open(1, "last"),
            Err(StreamError::IdsExhausted)
        ));
        assert_eq!(registry.stats().opened, 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn read_mode_is_rejected() {
        let dir = temp_dir("read-mode");
        let mut registry = StreamRegistry::new(&dir);

        assert!(matches!(
            registry.open(0, "sensor"),
            Err(StreamError::ReadModeUnsupported)
        ));
        assert!(matches!(
            registry.open(7, "sensor"),
            Err(StreamError::UnsupportedMode(7))
        ));
        assert!(entries(&dir).is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn invalid_names_create_no_file() {
        let dir = temp_dir("invalid-name");
        let mut registry = StreamRegistry::new(&dir);

        for (name, reason) in [
            ("", NameError::Empty),
            ("a/b", NameError::ReservedChar('/')),
            ("a\\b", NameError::ReservedChar('\\')),
            ("a\0b", NameError::ControlChar(0)),
        ] {
            match registry.open(1, name) {
                Err(StreamError::InvalidName { reason: got, .. }) => assert_eq!(got, reason),
                other => panic!("expected invalid name for {name:?}, got {other:?}"),
            }
        }
        assert!(entries(&dir).is_empty());
        assert_eq!(registry.next_id(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_failure_is_reported() {
        let dir = temp_dir("create-fail").join("missing");
        let mut registry = StreamRegistry::new(&dir);

        assert!(matches!(
            registry.open(1, "sensor"),
            Err(StreamError::Create { .. })
        ));
        assert_eq!(registry.next_id(), 1);
    }

    #[test]
    fn clear_closes_everything() {
        let dir = temp_dir("clear");
        let mut registry = StreamRegistry::new(&dir);
        registry.open(1, "a").unwrap();
        registry.open(1, "b").unwrap();
        registry.open(1, "c").unwrap();
        registry.close(2).unwrap();

        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.open_count(), 0);
        assert_eq!(registry.stats().closed, 3);
        assert_eq!(registry.open(1, "d").unwrap(), 4);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn registries_are_independent() {
        let dir_a = temp_dir("indep-a");
        let dir_b = temp_dir("indep-b");
        let mut a = StreamRegistry::new(&dir_a);
        let mut b = StreamRegistry::new(&dir_b);

        assert_eq!(a.open(1, "x").unwrap(), 1);
        assert_eq!(a.open(1, "x").unwrap(), 2);
        assert_eq!(b.open(1, "x").unwrap(), 1);

        let _ = std::fs::remove_dir_all(&dir_a);
        let _ = std::fs::remove_dir_all(&dir_b);
    }

    #[test]
    fn custom_extension() {
        let dir = temp_dir("ext");
        let mut registry = StreamRegistry::with_extension(&dir, "bin");
        registry.open(1, "raw").unwrap();
        assert_eq!(entries(&dir), vec!["raw.0.bin"]);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
