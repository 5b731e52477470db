use std::{fs, io, path::Path};

use ndarray::Array2;

use super::error::{Result, StoreErr};

/// Identifies the binary model cache format.
pub const MAGIC: [u8; 8] = *b"RECONH01";

type DimType = u64;
const DIM_SIZE: usize = size_of::<DimType>();
const HEADER_SIZE: usize = MAGIC.len() + 2 * DIM_SIZE;
const VALUE_SIZE: usize = size_of::<f32>();

/// Parses a comma separated matrix, one row per line.
///
/// # Arguments
/// * `text` - The whole file's contents.
///
/// # Returns
/// The raw matrix or an error if a value isn't a number or the rows are ragged.
pub fn parse_csv(text: &str) -> Result<Array2<f32>> {
    let mut values = Vec::new();
    let mut cols = None;
    let mut rows = 0;

    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let before = values.len();
        for (j, field) in line.split(',').enumerate() {
            let field = field.trim();
            let value = field.parse::<f32>().map_err(|_| StoreErr::Parse {
                line: i + 1,
                col: j + 1,
                value: field.to_string(),
            })?;

            values.push(value);
        }

        let got = values.len() - before;
        let expected = *cols.get_or_insert(got);
        if got != expected {
            return Err(StoreErr::Ragged {
                line: i + 1,
                got,
                expected,
            });
        }

        rows += 1;
    }

    let cols = cols.unwrap_or(0);
    let got = values.len();
    Array2::from_shape_vec((rows, cols), values).map_err(|_| StoreErr::Ragged {
        line: rows,
        got,
        expected: rows * cols,
    })
}

/// Serializes a raw matrix into the binary cache format.
///
/// # Arguments
/// * `raw` - The raw matrix.
///
/// # Returns
/// The header followed by the row-major little-endian values.
pub fn encode_binary(raw: &Array2<f32>) -> Vec<u8> {
    let (rows, cols) = raw.dim();
    let mut buf = Vec::with_capacity(HEADER_SIZE + raw.len() * VALUE_SIZE);

    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&(rows as DimType).to_le_bytes());
    buf.extend_from_slice(&(cols as DimType).to_le_bytes());

    // Logical iteration order is row-major regardless of the memory layout.
    for x in raw.iter() {
        buf.extend_from_slice(&x.to_le_bytes());
    }

    buf
}

/// Deserializes a raw matrix from the binary cache format.
///
/// # Arguments
/// * `path` - Where the bytes came from, used for error reporting.
/// * `bytes` - The binary contents.
///
/// # Returns
/// The raw matrix or a `Corrupt` error if the contents don't add up.
pub fn decode_binary(path: &Path, bytes: &[u8]) -> Result<Array2<f32>> {
    let corrupt = |reason| StoreErr::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.len() < HEADER_SIZE {
        return Err(corrupt("truncated header"));
    }

    let (magic, rest) = bytes.split_at(MAGIC.len());
    if magic != MAGIC {
        return Err(corrupt("bad magic"));
    }

    let (rows, rest) = read_dim(rest);
    let (cols, data) = read_dim(rest);

    let len = rows
        .checked_mul(cols)
        .and_then(|len| len.checked_mul(VALUE_SIZE))
        .ok_or_else(|| corrupt("dimensions overflow"))?;

    if data.len() != len {
        return Err(corrupt("length doesn't match the dimensions"));
    }

    let values = data
        .chunks_exact(VALUE_SIZE)
        .map(|chunk| {
            let mut buf = [0; VALUE_SIZE];
            buf.copy_from_slice(chunk);
            f32::from_le_bytes(buf)
        })
        .collect();

    Array2::from_shape_vec((rows, cols), values).map_err(|_| corrupt("invalid shape"))
}

/// Writes the binary form of `raw` to `path` atomically.
///
/// The contents go to a sibling temporary file first, then it's renamed over `path`, so
/// readers never observe a partial write.
///
/// # Arguments
/// * `path` - The destination file.
/// * `raw` - The raw matrix.
pub fn write_binary(path: &Path, raw: &Array2<f32>) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| StoreErr::io(dir, e))?;
    }

    let tmp = path.with_extension("bin.tmp");
    fs::write(&tmp, encode_binary(raw)).map_err(|e| StoreErr::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreErr::io(path, e))
}

/// Reads the binary form stored at `path`, if any.
///
/// # Returns
/// `None` if the file doesn't exist, the matrix or an error otherwise.
pub fn read_binary(path: &Path) -> Result<Option<Array2<f32>>> {
    match fs::read(path) {
        Ok(bytes) => decode_binary(path, &bytes).map(Some),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreErr::io(path, e)),
    }
}

fn read_dim(bytes: &[u8]) -> (usize, &[u8]) {
    let (dim, rest) = bytes.split_at(DIM_SIZE);
    let mut buf = [0; DIM_SIZE];
    buf.copy_from_slice(dim);

    (DimType::from_le_bytes(buf) as usize, rest)
}
