use std::fs::File;
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::data::dataset::check_pairs;
use crate::error::{NnError, Result};

const HEADER_BYTES: u64 = 4;
const F64_BYTES: u64 = 8;

/// Random-access reader over a fixed-width dataset file.
///
/// Layout: `count: i32` followed by `count` records of `inputs` then
/// `outputs` little-endian `f64`s. The record widths are not stored in the
/// file, so the caller supplies them; `open` rejects files whose length does
/// not match.
#[derive(Debug)]
pub struct DataStream {
    path: PathBuf,
    reader: BufReader<File>,
    count: usize,
    inputs: usize,
    outputs: usize,
}

impl DataStream {
    pub fn open(path: impl AsRef<Path>, inputs: usize, outputs: usize) -> Result<DataStream> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let count = reader
            .read_i32::<LittleEndian>()
            .map_err(|e| NnError::from_read(e, "dataset header"))?;
        let count = usize::try_from(count)
            .map_err(|_| NnError::Corrupt(format!("dataset has negative record count {count}")))?;

        let record = (inputs + outputs) as u64 * F64_BYTES;
        let expected = HEADER_BYTES + count as u64 * record;
        if file_len != expected {
            return Err(NnError::Corrupt(format!(
                "{} holds {file_len} bytes, expected {expected} for {count} records of {inputs}+{outputs} values",
                path.display()
            )));
        }

        Ok(DataStream { path, reader, count, inputs, outputs })
    }

    /// Opens an independent reader over the same file.
    pub fn try_clone(&self) -> Result<DataStream> {
        DataStream::open(&self.path, self.inputs, self.outputs)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of record `index`.
    pub fn offset_of(&self, index: usize) -> u64 {
        HEADER_BYTES + index as u64 * (self.inputs + self.outputs) as u64 * F64_BYTES
    }

    /// Reads record `index` as `(input, target)`.
    pub fn read_entry(&mut self, index: usize) -> Result<(Vec<f64>, Vec<f64>)> {
        if index >= self.count {
            return Err(NnError::EntryOutOfRange { index, count: self.count });
        }
        self.reader.seek(SeekFrom::Start(self.offset_of(index)))?;

        let mut input = vec![0.0; self.inputs];
        let mut target = vec![0.0; self.outputs];
        self.reader
            .read_f64_into::<LittleEndian>(&mut input)
            .and_then(|_| self.reader.read_f64_into::<LittleEndian>(&mut target))
            .map_err(|e| NnError::from_read(e, "dataset record"))?;
        Ok((input, target))
    }
}

/// Writes `inputs`/`targets` in the layout [`DataStream`] reads.
pub fn write_dataset(path: impl AsRef<Path>, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<()> {
    check_pairs(inputs, targets)?;
    let count = i32::try_from(inputs.len())
        .map_err(|_| NnError::InvalidConfig(format!("{} records do not fit the dataset header", inputs.len())))?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_i32::<LittleEndian>(count)?;
    for (input, target) in inputs.iter().zip(targets) {
        for &v in input.iter().chain(target) {
            writer.write_f64::<LittleEndian>(v)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Reads every record of `stream` into memory.
pub(crate) fn read_all(stream: &mut DataStream) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    let mut inputs = Vec::with_capacity(stream.count());
    let mut targets = Vec::with_capacity(stream.count());
    for i in 0..stream.count() {
        let (input, target) = stream.read_entry(i)?;
        inputs.push(input);
        targets.push(target);
    }
    Ok((inputs, targets))
}
