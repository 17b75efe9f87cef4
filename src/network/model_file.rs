//! Binary model format, little-endian throughout:
//!
//! ```text
//! seed: i32, learning_rate: f64, activation_id: i32, derivative_id: i32,
//! output_len: i32, output: [f64; output_len],
//! layer_count: i32,
//! per layer: out_rows: i32, out_cols: i32, out: [f64; rows * cols],
//!            in_rows: i32,  in_cols: i32,  in:  [f64; rows * cols]
//! ```
//!
//! Matrices are row-major. The function ids index the activation table, so
//! its order is part of the format.

use std::io::{Read, Write};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::activation::ActivationKind;
use crate::error::{NnError, Result};
use crate::layers::Layer;
use crate::math::WeightStorage;

const F64_BYTES: usize = 8;

/// Everything in a model file except the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelHeader {
    pub seed: i32,
    pub learning_rate: f64,
    pub activation: ActivationKind,
    pub output: Vec<f64>,
}

pub fn write_model<W: Write, M: WeightStorage>(
    writer: &mut W,
    header: &ModelHeader,
    layers: &mut [Layer<M>],
) -> Result<()> {
    writer.write_i32::<LittleEndian>(header.seed)?;
    writer.write_f64::<LittleEndian>(header.learning_rate)?;
    writer.write_i32::<LittleEndian>(header.activation.activation().id())?;
    writer.write_i32::<LittleEndian>(header.activation.derivative().id())?;

    write_len(writer, header.output.len())?;
    for &v in &header.output {
        writer.write_f64::<LittleEndian>(v)?;
    }

    write_len(writer, layers.len())?;
    for layer in layers.iter_mut() {
        write_matrix(writer, layer.weights_out_mut())?;
        write_matrix(writer, layer.weights_in_mut())?;
    }
    Ok(())
}

/// Reads a whole model. Nothing is returned unless every field and every
/// matrix is present and the layers chain into the stored output width.
pub fn read_model<R: Read, M: WeightStorage>(reader: &mut R) -> Result<(ModelHeader, Vec<Layer<M>>)> {
    let seed = read(reader.read_i32::<LittleEndian>())?;
    let learning_rate = read(reader.read_f64::<LittleEndian>())?;
    let activation_id = read(reader.read_i32::<LittleEndian>())?;
    let derivative_id = read(reader.read_i32::<LittleEndian>())?;
    let activation = ActivationKind::from_ids(activation_id, derivative_id)
        .map_err(|e| NnError::Corrupt(e.to_string()))?;

    let output_len = read_len(reader, "output length")?;
    let output = read_values(reader, output_len, &mut Vec::new())?;

    let layer_count = read_len(reader, "layer count")?;
    let mut layers = Vec::new();
    for i in 0..layer_count {
        let weights_out: M = read_matrix(reader)?;
        let weights_in: M = read_matrix(reader)?;
        let layer = Layer::from_weights(weights_in, weights_out)
            .map_err(|e| NnError::Corrupt(format!("layer {i}: {e}")))?;
        layers.push(layer);
    }

    check_chain(&layers, output_len)?;
    Ok((ModelHeader { seed, learning_rate, activation, output }, layers))
}

fn check_chain<M: WeightStorage>(layers: &[Layer<M>], output_len: usize) -> Result<()> {
    let Some(last) = layers.last() else {
        return Err(NnError::Corrupt("model has no layers".into()));
    };
    for (i, pair) in layers.windows(2).enumerate() {
        if pair[0].output_size() != pair[1].input_size() {
            return Err(NnError::Corrupt(format!(
                "layer {i} outputs {} values but layer {} takes {}",
                pair[0].output_size(),
                i + 1,
                pair[1].input_size()
            )));
        }
    }
    if last.output_size() != output_len {
        return Err(NnError::Corrupt(format!(
            "last layer outputs {} values but the output buffer holds {output_len}",
            last.output_size()
        )));
    }
    Ok(())
}

fn read<T>(value: std::io::Result<T>) -> Result<T> {
    value.map_err(|e| NnError::from_read(e, "model"))
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<()> {
    let len = i32::try_from(len)
        .map_err(|_| NnError::InvalidTopology(format!("dimension {len} does not fit the model format")))?;
    writer.write_i32::<LittleEndian>(len)?;
    Ok(())
}

fn read_len<R: Read>(reader: &mut R, what: &str) -> Result<usize> {
    let len = read(reader.read_i32::<LittleEndian>())?;
    usize::try_from(len).map_err(|_| NnError::Corrupt(format!("negative {what} {len}")))
}

/// Reads `len` values. Buffers grow with the bytes actually present, so a
/// short file claiming a huge `len` fails as `Corrupt` without reserving it.
fn read_values<R: Read>(reader: &mut R, len: usize, bytes: &mut Vec<u8>) -> Result<Vec<f64>> {
    let byte_len = len
        .checked_mul(F64_BYTES)
        .ok_or_else(|| NnError::Corrupt(format!("{len} values do not fit in memory")))?;
    bytes.clear();
    read((&mut *reader).take(byte_len as u64).read_to_end(bytes))?;
    if bytes.len() != byte_len {
        return Err(NnError::Corrupt(format!(
            "model: expected {len} values, file ends after {}",
            bytes.len() / F64_BYTES
        )));
    }
    let mut values = vec![0.0; len];
    LittleEndian::read_f64_into(bytes, &mut values);
    Ok(values)
}

fn write_matrix<W: Write, M: WeightStorage>(writer: &mut W, matrix: &mut M) -> Result<()> {
    write_len(writer, matrix.rows())?;
    write_len(writer, matrix.cols())?;
    for i in 0..matrix.rows() {
        for &v in matrix.row(i)? {
            writer.write_f64::<LittleEndian>(v)?;
        }
    }
    Ok(())
}

fn read_matrix<R: Read, M: WeightStorage>(reader: &mut R) -> Result<M> {
    let rows = read_len(reader, "matrix rows")?;
    let cols = read_len(reader, "matrix cols")?;
    if rows == 0 || cols == 0 {
        return Err(NnError::Corrupt(format!("empty {rows}x{cols} weight matrix")));
    }
    let mut bytes = Vec::new();
    M::from_row_source(rows, cols, |_| read_values(reader, cols, &mut bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Matrix;

    fn layer(inputs: usize, nodes: usize, outputs: usize, base: f64) -> Layer {
        let fill = |rows: usize, cols: usize, offset: f64| {
            let data = (0..rows)
                .map(|r| (0..cols).map(|c| base + offset + (r * cols + c) as f64 * 0.125).collect())
                .collect();
            Matrix::from_data(data).unwrap()
        };
        Layer::from_weights(fill(inputs, nodes, 0.0), fill(nodes, outputs, 100.0)).unwrap()
    }

    fn header(output_len: usize) -> ModelHeader {
        ModelHeader {
            seed: -17,
            learning_rate: 0.3,
            activation: ActivationKind::Swish,
            output: vec![0.5; output_len],
        }
    }

    fn encode(layers: &mut [Layer], output_len: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        write_model(&mut bytes, &header(output_len), layers).unwrap();
        bytes
    }

    #[test]
    fn byte_layout_is_fixed() {
        let mut layers = vec![layer(1, 1, 1, 2.0)];
        let bytes = encode(&mut layers, 1);
        // header: 4 + 8 + 4 + 4, output: 4 + 8, count: 4, two 1x1 matrices: 2 * (8 + 8)
        assert_eq!(bytes.len(), 20 + 12 + 4 + 32);
        assert_eq!(&bytes[0..4], &(-17i32).to_le_bytes());
        assert_eq!(&bytes[12..16], &8i32.to_le_bytes());
        assert_eq!(&bytes[16..20], &9i32.to_le_bytes());
        // Output matrix is written before the input matrix.
        assert_eq!(&bytes[44..52], &102.0f64.to_le_bytes());
        assert_eq!(&bytes[60..68], &2.0f64.to_le_bytes());
    }

    #[test]
    fn reads_back_what_was_written() {
        let mut layers = vec![layer(3, 4, 2, 0.0), layer(2, 5, 1, 1.0)];
        let bytes = encode(&mut layers, 1);
        let (read_header, mut read_layers) = read_model::<_, Matrix>(&mut bytes.as_slice()).unwrap();
        assert_eq!(read_header, header(1));
        assert_eq!(read_layers.len(), 2);
        for (a, b) in layers.iter().zip(&read_layers) {
            assert_eq!(a.weights_in(), b.weights_in());
            assert_eq!(a.weights_out(), b.weights_out());
        }
        assert_eq!(read_layers[1].weights_out_mut().row(4).unwrap(), layers[1].weights_out().data[4].as_slice());
    }

    #[test]
    fn every_truncation_is_rejected() {
        let mut layers = vec![layer(2, 2, 1, 0.0)];
        let bytes = encode(&mut layers, 1);
        for cut in 0..bytes.len() {
            let result = read_model::<_, Matrix>(&mut &bytes[..cut]);
            assert!(matches!(result, Err(NnError::Corrupt(_))), "cut at {cut}");
        }
    }

    fn short_file(output_len: i32, rows: i32, cols: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3i32.to_le_bytes());
        bytes.extend_from_slice(&0.1f64.to_le_bytes());
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&output_len.to_le_bytes());
        if output_len == 1 {
            bytes.extend_from_slice(&0.5f64.to_le_bytes());
        }
        bytes.extend_from_slice(&1i32.to_le_bytes());
        bytes.extend_from_slice(&rows.to_le_bytes());
        bytes.extend_from_slice(&cols.to_le_bytes());
        bytes.extend_from_slice(&1.0f64.to_le_bytes());
        bytes
    }

    #[test]
    fn huge_claimed_dimensions_fail_without_allocating() {
        use crate::math::MatrixStore;
        use crate::network::{DeepNetwork, Model};

        // 44 bytes of header claiming an i32::MAX x 1 output matrix, plus one value.
        let tall = short_file(1, i32::MAX, 1);
        assert_eq!(tall.len(), 52);
        assert!(matches!(read_model::<_, Matrix>(&mut &tall[..44]), Err(NnError::Corrupt(_))));
        assert!(matches!(read_model::<_, Matrix>(&mut tall.as_slice()), Err(NnError::Corrupt(_))));
        assert!(matches!(DeepNetwork::<Matrix>::load(&mut tall.as_slice()), Err(NnError::Corrupt(_))));

        let wide = short_file(1, 1, i32::MAX);
        assert!(matches!(read_model::<_, Matrix>(&mut wide.as_slice()), Err(NnError::Corrupt(_))));
        assert!(matches!(read_model::<_, MatrixStore>(&mut wide.as_slice()), Err(NnError::Corrupt(_))));

        let long_output = short_file(i32::MAX, 1, 1);
        assert!(matches!(read_model::<_, Matrix>(&mut long_output.as_slice()), Err(NnError::Corrupt(_))));
    }

    #[test]
    fn inconsistent_models_are_rejected() {
        // Layers that do not chain.
        let mut layers = vec![layer(2, 3, 2, 0.0), layer(3, 2, 1, 0.0)];
        let bytes = encode(&mut layers, 1);
        assert!(matches!(read_model::<_, Matrix>(&mut bytes.as_slice()), Err(NnError::Corrupt(_))));

        // Output buffer width disagrees with the last layer.
        let mut layers = vec![layer(2, 2, 1, 0.0)];
        let bytes = encode(&mut layers, 3);
        assert!(matches!(read_model::<_, Matrix>(&mut bytes.as_slice()), Err(NnError::Corrupt(_))));

        // Ids that are not a table pair.
        let mut layers = vec![layer(2, 2, 1, 0.0)];
        let mut bytes = encode(&mut layers, 1);
        bytes[16..20].copy_from_slice(&11i32.to_le_bytes());
        assert!(matches!(read_model::<_, Matrix>(&mut bytes.as_slice()), Err(NnError::Corrupt(_))));
    }
}
