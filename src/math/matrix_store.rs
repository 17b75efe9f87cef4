use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::error::{NnError, Result};
use crate::math::storage::WeightStorage;

const F64_BYTES: usize = 8;

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

/// Out-of-core matrix: rows live in a private backing file and are paged
/// through a single row buffer.
///
/// The backing file is headerless, row-major little-endian `f64`; row `i`
/// starts at byte `i * cols * 8`. Each instance creates its own file with
/// create-new semantics and deletes it when closed or dropped.
#[derive(Debug)]
pub struct MatrixStore {
    rows: usize,
    cols: usize,
    path: PathBuf,
    file: Option<File>,
    row: Vec<f64>,
    bytes: Vec<u8>,
}

impl MatrixStore {
    /// Creates a store in the system temp directory.
    pub fn new(rows: usize, cols: usize) -> Result<MatrixStore> {
        MatrixStore::new_in(std::env::temp_dir(), rows, cols)
    }

    /// Creates a store with a process-unique file name inside `dir`.
    pub fn new_in(dir: impl AsRef<Path>, rows: usize, cols: usize) -> Result<MatrixStore> {
        let id = NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed);
        let name = format!("seedsearch-{}-{id}.matrix", std::process::id());
        MatrixStore::create_at(dir.as_ref().join(name), rows, cols)
    }

    /// Creates a store at an explicit path. Fails with
    /// [`NnError::BackingFileCollision`] if the file already exists.
    pub fn create_at(path: impl Into<PathBuf>, rows: usize, cols: usize) -> Result<MatrixStore> {
        let path = path.into();
        let len = rows
            .checked_mul(cols)
            .and_then(|n| n.checked_mul(F64_BYTES))
            .ok_or_else(|| NnError::InvalidTopology(format!("{rows}x{cols} matrix is too large")))?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => NnError::BackingFileCollision(path.clone()),
                _ => NnError::Io(e),
            })?;

        // From here on Drop owns the cleanup.
        let store = MatrixStore {
            rows,
            cols,
            path,
            file: Some(file),
            row: vec![0.0; cols],
            bytes: vec![0; cols * F64_BYTES],
        };
        store.handle()?.set_len(len as u64)?;
        trace!("created backing file {} ({rows}x{cols})", store.path.display());
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads row `index` into the row buffer and returns a view of it.
    pub fn read_row(&mut self, index: usize) -> Result<&[f64]> {
        self.seek_row(index)?;
        let file = self.file.as_mut().ok_or_else(closed)?;
        file.read_exact(&mut self.bytes)
            .map_err(|e| NnError::from_read(e, "matrix store"))?;
        LittleEndian::read_f64_into(&self.bytes, &mut self.row);
        Ok(&self.row)
    }

    /// The row buffer, for editing before [`write_row`](Self::write_row).
    pub fn row_buffer_mut(&mut self) -> &mut [f64] {
        &mut self.row
    }

    /// Flushes the row buffer to row `index` of the backing file.
    pub fn write_row(&mut self, index: usize) -> Result<()> {
        LittleEndian::write_f64_into(&self.row, &mut self.bytes);
        self.seek_row(index)?;
        let file = self.file.as_mut().ok_or_else(closed)?;
        file.write_all(&self.bytes)?;
        Ok(())
    }

    /// Closes the handle and deletes the backing file, reporting failures
    /// that a plain drop would swallow.
    pub fn close(mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            drop(file);
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    fn handle(&self) -> Result<&File> {
        self.file.as_ref().ok_or_else(closed)
    }

    fn seek_row(&mut self, index: usize) -> Result<()> {
        if index >= self.rows {
            return Err(NnError::RowOutOfRange { row: index, rows: self.rows });
        }
        let offset = (index * self.cols * F64_BYTES) as u64;
        let mut file = self.handle()?;
        file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

fn closed() -> NnError {
    NnError::Io(io::Error::new(io::ErrorKind::NotConnected, "matrix store is closed"))
}

impl Drop for MatrixStore {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            drop(file);
            if let Err(e) = fs::remove_file(&self.path) {
                log::warn!("could not remove backing file {}: {e}", self.path.display());
            }
        }
    }
}

impl WeightStorage for MatrixStore {
    fn allocate(rows: usize, cols: usize) -> Result<Self> {
        MatrixStore::new(rows, cols)
    }

    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn row(&mut self, index: usize) -> Result<&[f64]> {
        self.read_row(index)
    }

    fn update_row<F>(&mut self, index: usize, edit: F) -> Result<()>
    where
        F: FnOnce(&mut [f64]),
    {
        self.read_row(index)?;
        edit(&mut self.row);
        self.write_row(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_round_trip_at_the_edges_and_middle() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MatrixStore::new_in(dir.path(), 5, 3).unwrap();
        for &i in &[0usize, 2, 4] {
            let values = [i as f64 + 0.25, -(i as f64) * 1e-9, f64::MAX / (i as f64 + 1.0)];
            store.row_buffer_mut().copy_from_slice(&values);
            store.write_row(i).unwrap();
        }
        // Untouched rows stay zero.
        assert_eq!(store.read_row(1).unwrap(), &[0.0, 0.0, 0.0]);
        for &i in &[4usize, 0, 2] {
            let expected = [i as f64 + 0.25, -(i as f64) * 1e-9, f64::MAX / (i as f64 + 1.0)];
            assert_eq!(store.read_row(i).unwrap(), &expected);
        }
    }

    #[test]
    fn row_offsets_follow_the_headerless_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MatrixStore::new_in(dir.path(), 3, 2).unwrap();
        store.fill_row(2, &[1.5, -2.5]).unwrap();
        let raw = fs::read(store.path()).unwrap();
        assert_eq!(raw.len(), 3 * 2 * 8);
        assert_eq!(LittleEndian::read_f64(&raw[32..40]), 1.5);
        assert_eq!(LittleEndian::read_f64(&raw[40..48]), -2.5);
    }

    #[test]
    fn out_of_range_rows_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MatrixStore::new_in(dir.path(), 2, 2).unwrap();
        assert!(matches!(store.read_row(2), Err(NnError::RowOutOfRange { row: 2, rows: 2 })));
        assert!(store.write_row(7).is_err());
    }

    #[test]
    fn colliding_paths_fail_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.matrix");
        let _first = MatrixStore::create_at(&path, 2, 2).unwrap();
        let err = MatrixStore::create_at(&path, 2, 2).unwrap_err();
        assert!(matches!(err, NnError::BackingFileCollision(p) if p == path));
    }

    #[test]
    fn backing_file_is_removed_on_drop_and_close() {
        let dir = tempfile::tempdir().unwrap();
        let dropped = MatrixStore::new_in(dir.path(), 1, 1).unwrap();
        let dropped_path = dropped.path().to_path_buf();
        let closed = MatrixStore::new_in(dir.path(), 1, 1).unwrap();
        let closed_path = closed.path().to_path_buf();
        assert_ne!(dropped_path, closed_path);

        drop(dropped);
        closed.close().unwrap();
        assert!(!dropped_path.exists());
        assert!(!closed_path.exists());
    }
}
