//! Compact record container.
//!
//! The container is a sequence of whole-frame records (see [`schema`]). On
//! open every record is decoded and the rectangular tables the engine works
//! with are rebuilt ([`import`]). On flush the tables are expressed as records
//! again ([`export`]) and compared with the records on disk: only changed or
//! new records are encoded, and when the change is new records after
//! unchanged ones they are appended instead of rewriting the file.
//!
//! Containers written under the historical schema ([`legacy`]) are
//! transcoded on open by [`convert::read_frames`].

pub mod container;
pub mod convert;
mod export;
mod import;
pub mod legacy;
pub mod schema;

use std::ffi::OsString;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub use export::export;
pub use import::import;

use super::{Backend, BackendKind, TableStore};
use crate::util::{Error, Result};

/// Encode a table store as a record container.
pub fn encode_store(store: &TableStore) -> Result<Vec<u8>> {
    container::write_container(schema::SCHEMA_ID, &export(store)?)
}

/// Decode a record container (current or historical schema) into tables.
pub fn decode_store(bytes: &[u8]) -> Result<TableStore> {
    import(convert::read_frames(bytes)?)
}

/// A record as it is on disk.
struct Persisted {
    frame: schema::Frame,
    /// Encoded record, length prefix included.
    bytes: Vec<u8>,
}

/// Backend over a record container file.
pub struct RecordBackend {
    path: PathBuf,
    store: TableStore,
    read_only: bool,
    /// Records of the file under the current schema; empty when the file
    /// must be rewritten whole.
    persisted: Vec<Persisted>,
    /// Records encoded by the last flush.
    encoded: usize,
}

impl RecordBackend {
    /// Create (or truncate) a container holding no tables.
    pub fn create(path: &Path) -> Result<Self> {
        let mut backend = Self {
            path: path.to_path_buf(),
            store: TableStore::new(),
            read_only: false,
            persisted: Vec::new(),
            encoded: 0,
        };
        backend.store.mark_dirty();
        backend.flush()?;
        tracing::debug!(path = %path.display(), "created record container");
        Ok(backend)
    }

    /// Open an existing container and rebuild its tables.
    pub fn open(path: &Path, read_only: bool) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;
        let (schema_id, section) = container::read_schema_id(&bytes)?;
        let (store, persisted) = if schema_id == schema::SCHEMA_ID && !read_only {
            let mut persisted = Vec::new();
            for record in container::split_records(section)? {
                persisted.push(Persisted {
                    frame: container::decode_record(record)?,
                    bytes: record.to_vec(),
                });
            }
            let frames = persisted.iter().map(|p| p.frame.clone()).collect();
            (import(frames)?, persisted)
        } else {
            (decode_store(&bytes)?, Vec::new())
        };
        tracing::debug!(
            path = %path.display(),
            tables = store.table_names().len(),
            records = persisted.len(),
            read_only,
            "opened record container"
        );
        Ok(Self {
            path: path.to_path_buf(),
            store,
            read_only,
            persisted,
            encoded: 0,
        })
    }

    /// Number of records the last flush had to encode.
    pub fn last_flush_encoded(&self) -> usize {
        self.encoded
    }
}

/// Replace the file with `records`.
fn rewrite(path: &Path, records: &[Persisted]) -> Result<usize> {
    let mut bytes = container::header(schema::SCHEMA_ID)?;
    for p in records {
        bytes.extend_from_slice(&p.bytes);
    }
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(bytes.len())
}

/// Append `records` to the file.
fn append(path: &Path, records: &[Persisted]) -> Result<usize> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    let mut written = 0;
    for p in records {
        file.write_all(&p.bytes)?;
        written += p.bytes.len();
    }
    file.sync_data()?;
    Ok(written)
}

impl Backend for RecordBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Record
    }

    fn store(&self) -> &TableStore {
        &self.store
    }

    fn store_mut(&mut self) -> &mut TableStore {
        &mut self.store
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn flush(&mut self) -> Result<()> {
        if self.read_only || !self.store.is_dirty() {
            return Ok(());
        }
        let _span = tracing::debug_span!("record_flush", path = %self.path.display()).entered();

        let frames = export(&self.store)?;
        let previous = std::mem::take(&mut self.persisted);
        let on_disk = previous.len();
        let mut old = previous.into_iter();
        // Leading records kept as they are on disk.
        let mut kept = 0;
        let mut encoded = 0;
        let mut records = Vec::with_capacity(frames.len());
        for frame in frames {
            let record = match old.next() {
                Some(p) if p.frame == frame => {
                    if encoded == 0 {
                        kept += 1;
                    }
                    p
                }
                _ => {
                    encoded += 1;
                    Persisted {
                        bytes: container::encode_record(&frame)?,
                        frame,
                    }
                }
            };
            records.push(record);
        }

        let appended = on_disk > 0 && kept == on_disk;
        let bytes = if appended {
            append(&self.path, &records[kept..])?
        } else {
            rewrite(&self.path, &records)?
        };
        self.persisted = records;
        self.encoded = encoded;
        self.store.mark_clean();
        tracing::debug!(
            bytes,
            encoded,
            records = self.persisted.len(),
            appended,
            "flushed record container"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DenseArray;
    use crate::core::names;
    use crate::util::{Extent, Value, ValueType};

    fn strings(values: &[&str]) -> DenseArray {
        DenseArray::from_cells(
            ValueType::String,
            Extent::d1(values.len()),
            values.iter().map(|s| Value::String(s.to_string())).collect(),
        )
        .unwrap()
    }

    /// Root with one child carrying a static float and a per-frame float.
    fn sample_store() -> TableStore {
        let mut s = TableStore::new();
        s.set_attribute(names::VERSION_ATTRIBUTE, names::VERSION);
        s.set_attribute(names::DESCRIPTION_ATTRIBUTE, "sample\n");
        s.insert(names::NODE_NAME, strings(&["root", "atom"]));
        s.insert(names::CATEGORY_NAMES, strings(&["physics"]));
        s.insert(names::FRAME_NAMES, strings(&["f0", "f1"]));
        s.insert("physics_float_list", strings(&["mass"]));
        s.insert("physics_float_per_frame_list", strings(&["charge"]));

        let mut nd = DenseArray::new(ValueType::Index, 2);
        nd.resize(&Extent::d2(2, 4)).unwrap();
        nd.set(&[0, 0], Value::Index(0)).unwrap();
        nd.set(&[0, 1], Value::Index(1)).unwrap();
        nd.set(&[1, 0], Value::Index(1)).unwrap();
        nd.set(&[1, 3], Value::Index(0)).unwrap();
        s.insert(names::node_data(1), nd);

        let mut st = DenseArray::new(ValueType::Float, 2);
        st.resize(&Extent::d2(1, 1)).unwrap();
        st.set(&[0, 0], Value::Float(12.0)).unwrap();
        s.insert("physics_float_storage", st);

        let mut pf = DenseArray::new(ValueType::Float, 3);
        pf.resize(&Extent::d3(1, 1, 2)).unwrap();
        pf.set(&[0, 0, 1], Value::Float(-0.5)).unwrap();
        s.insert("physics_float_per_frame_storage", pf);
        s
    }

    #[test]
    fn test_store_survives_records() {
        let store = sample_store();
        let back = decode_store(&encode_store(&store).unwrap()).unwrap();

        for name in store.table_names() {
            assert_eq!(
                back.table(&name).unwrap(),
                store.table(&name).unwrap(),
                "table {name}"
            );
        }
        assert_eq!(back.get_attribute("description"), Some("sample\n"));
        assert_eq!(back.get_attribute("version"), Some("rmf 1"));
        assert!(!back.is_dirty());
    }

    /// The atom holds row 1 and the root holds row 0 without any values.
    #[test]
    fn test_rows_survive_records() {
        let mut store = sample_store();
        let mut nd = store.table(names::node_data(1)).unwrap().clone();
        nd.set(&[0, 3], Value::Index(0)).unwrap();
        nd.set(&[1, 3], Value::Index(1)).unwrap();
        store.insert(names::node_data(1), nd);
        let mut st = DenseArray::new(ValueType::Float, 2);
        st.resize(&Extent::d2(2, 1)).unwrap();
        st.set(&[1, 0], Value::Float(12.0)).unwrap();
        store.insert("physics_float_storage", st);
        let mut pf = DenseArray::new(ValueType::Float, 3);
        pf.resize(&Extent::d3(2, 1, 2)).unwrap();
        pf.set(&[1, 0, 1], Value::Float(-0.5)).unwrap();
        store.insert("physics_float_per_frame_storage", pf);

        let frames = export(&store).unwrap();
        let schema::Info::File(info) = &frames[0].info else {
            panic!("first record is not the file record");
        };
        assert_eq!(info.rows.len(), 1);
        assert_eq!(
            info.rows[0].rows,
            vec![
                schema::NodeValue { id: 0, value: 0 },
                schema::NodeValue { id: 1, value: 1 },
            ]
        );

        let back = import(frames).unwrap();
        for name in store.table_names() {
            assert_eq!(
                back.table(&name).unwrap(),
                store.table(&name).unwrap(),
                "table {name}"
            );
        }
    }

    #[test]
    fn test_export_layout() {
        let frames = export(&sample_store()).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(matches!(frames[0].info, schema::Info::File(_)));
        assert_eq!(frames[0].nodes.len(), 2);
        assert_eq!(frames[0].nodes[1].parents, vec![0]);
        assert_eq!(frames[0].keys.len(), 1);
        assert_eq!(frames[1].keys.len(), 1);
        assert!(frames[1].keys[0].per_frame);
        assert!(frames[1].data.float_data.is_empty());
        assert_eq!(frames[2].data.float_data[0].values[0].value, -0.5);
    }

    /// Adds frame 2 with a charge for the atom.
    fn add_frame(store: &mut TableStore) {
        store.insert(names::FRAME_NAMES, strings(&["f0", "f1", "f2"]));
        let mut pf = store.table("physics_float_per_frame_storage").unwrap().clone();
        pf.resize(&Extent::d3(1, 1, 3)).unwrap();
        pf.set(&[0, 0, 2], Value::Float(0.5)).unwrap();
        store.insert("physics_float_per_frame_storage", pf);
    }

    #[test]
    fn test_flush_appends_new_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.rmfz");
        let mut b = RecordBackend::create(&path).unwrap();
        *b.store_mut() = sample_store();
        b.store_mut().mark_dirty();
        b.flush().unwrap();
        assert_eq!(b.last_flush_encoded(), 3);
        drop(b);
        let before = std::fs::read(&path).unwrap();

        let mut b = RecordBackend::open(&path, false).unwrap();
        add_frame(b.store_mut());
        b.store_mut().mark_dirty();
        b.flush().unwrap();
        assert_eq!(b.last_flush_encoded(), 1);

        let after = std::fs::read(&path).unwrap();
        assert!(after.len() > before.len());
        assert_eq!(&after[..before.len()], &before[..]);
        let back = decode_store(&after).unwrap();
        assert_eq!(
            back.table("physics_float_per_frame_storage").unwrap().get(&[0, 0, 2]),
            Value::Float(0.5)
        );
    }

    #[test]
    fn test_flush_reencodes_changed_frames_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.rmfz");
        let mut b = RecordBackend::create(&path).unwrap();
        *b.store_mut() = sample_store();
        add_frame(b.store_mut());
        b.store_mut().mark_dirty();
        b.flush().unwrap();

        let mut pf = b.store().table("physics_float_per_frame_storage").unwrap().clone();
        pf.set(&[0, 0, 0], Value::Float(1.0)).unwrap();
        b.store_mut().insert("physics_float_per_frame_storage", pf);
        b.store_mut().mark_dirty();
        b.flush().unwrap();
        assert_eq!(b.last_flush_encoded(), 1);

        b.store_mut().mark_dirty();
        b.flush().unwrap();
        assert_eq!(b.last_flush_encoded(), 0);
        drop(b);

        let b = RecordBackend::open(&path, true).unwrap();
        let pf = b.store().table("physics_float_per_frame_storage").unwrap();
        assert_eq!(pf.get(&[0, 0, 0]), Value::Float(1.0));
        assert_eq!(pf.get(&[0, 0, 1]), Value::Float(-0.5));
        assert_eq!(pf.get(&[0, 0, 2]), Value::Float(0.5));
    }

    #[test]
    fn test_backend_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.rmfz");
        {
            let mut b = RecordBackend::create(&path).unwrap();
            *b.store_mut() = sample_store();
            b.store_mut().mark_dirty();
            b.flush().unwrap();
        }
        let mut b = RecordBackend::open(&path, true).unwrap();
        assert_eq!(
            b.get_value("physics_float_storage", &[0, 0]).unwrap(),
            Value::Float(12.0)
        );
        assert!(matches!(
            b.set_value("physics_float_storage", &[0, 0], Value::Float(1.0)),
            Err(Error::ReadOnly)
        ));
    }
}
