//! Minimal NumPy `.npy` codec for 2-D depth arrays.
//!
//! Writes version 1.0, little-endian `<f4`, C order. Reads versions 1-3 with
//! `<f4`, `<f8`, `<u2` or `|u1` payloads, converting to `f32`.

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};

const MAGIC: &[u8; 6] = b"\x93NUMPY";
const ALIGN: usize = 64;

/// A decoded `(rows, cols)` array.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    F32,
    F64,
    U16,
    U8,
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self> {
        Ok(match descr {
            "<f4" => Self::F32,
            "<f8" => Self::F64,
            "<u2" => Self::U16,
            "|u1" | "<u1" => Self::U8,
            other => bail!("unsupported npy dtype '{other}'"),
        })
    }

    fn size(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
            Self::U16 => 2,
            Self::U8 => 1,
        }
    }
}

pub fn encode_f32(rows: usize, cols: usize, data: &[f32]) -> Result<Vec<u8>> {
    ensure!(
        data.len() == rows * cols,
        "npy payload holds {} values, shape ({rows}, {cols}) needs {}",
        data.len(),
        rows * cols
    );

    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {cols}), }}");
    // magic + version + u16 length + header + '\n' is a multiple of ALIGN.
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    header.extend(std::iter::repeat_n(' ', unpadded.next_multiple_of(ALIGN) - unpadded));
    header.push('\n');
    let header_len = u16::try_from(header.len()).context("npy header too long")?;

    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + data.len() * 4);
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    Ok(out)
}

pub fn decode(bytes: &[u8]) -> Result<NpyArray> {
    ensure!(bytes.len() >= 10 && &bytes[..6] == MAGIC, "not an npy file (bad magic)");
    let (header_len, offset) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            ensure!(bytes.len() >= 12, "truncated npy header");
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        v => bail!("unsupported npy version {v}"),
    };
    let header_end = offset + header_len;
    ensure!(bytes.len() >= header_end, "truncated npy header");
    let header = std::str::from_utf8(&bytes[offset..header_end]).context("npy header is not text")?;

    let dtype = Dtype::parse(header_field(header, "descr")?.trim_matches(|c| c == '\'' || c == '"'))?;
    ensure!(
        header_field(header, "fortran_order")?.trim() == "False",
        "fortran-ordered npy arrays are not supported"
    );
    let (rows, cols) = parse_shape(header_field(header, "shape")?)?;

    let payload = &bytes[header_end..];
    let needed = rows
        .checked_mul(cols)
        .and_then(|n| n.checked_mul(dtype.size()))
        .with_context(|| format!("npy shape ({rows}, {cols}) is too large"))?;
    ensure!(payload.len() >= needed, "npy payload holds {} bytes, expected {needed}", payload.len());
    let payload = &payload[..needed];

    let data = match dtype {
        Dtype::F32 => payload.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect(),
        Dtype::F64 => payload
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f32)
            .collect(),
        Dtype::U16 => payload.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]]) as f32).collect(),
        Dtype::U8 => payload.iter().map(|&b| b as f32).collect(),
    };
    Ok(NpyArray { rows, cols, data })
}

pub fn read(path: &Path) -> Result<NpyArray> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    decode(&bytes).with_context(|| format!("decoding {}", path.display()))
}

pub fn write_f32(path: &Path, rows: usize, cols: usize, data: &[f32]) -> Result<()> {
    let bytes = encode_f32(rows, cols, data)?;
    fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
}

/// Raw text of `key`'s value in a Python dict literal, up to the next top-level comma.
fn header_field<'a>(header: &'a str, key: &str) -> Result<&'a str> {
    let quoted = [format!("'{key}'"), format!("\"{key}\"")];
    let start = quoted
        .iter()
        .find_map(|k| header.find(k.as_str()).map(|i| i + k.len()))
        .with_context(|| format!("npy header has no '{key}'"))?;
    let rest = header[start..].trim_start();
    let rest = rest.strip_prefix(':').with_context(|| format!("malformed '{key}' in npy header"))?;

    let mut depth = 0i32;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' | '}' if depth == 0 => return Ok(rest[..i].trim()),
            _ => {}
        }
    }
    bail!("unterminated '{key}' in npy header")
}

/// `(H, W)`; a 3-D shape is accepted only with a single trailing channel.
fn parse_shape(text: &str) -> Result<(usize, usize)> {
    let inner = text.trim().trim_start_matches('(').trim_end_matches(')');
    let dims = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().with_context(|| format!("bad npy dimension '{s}'")))
        .collect::<Result<Vec<_>>>()?;
    match dims.as_slice() {
        [h, w] | [h, w, 1] => Ok((*h, *w)),
        _ => bail!("expected a 2-D npy array, got shape ({inner})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_aligned_and_well_formed() {
        let bytes = encode_f32(2, 3, &[0.0; 6]).unwrap();
        assert_eq!(&bytes[..8], b"\x93NUMPY\x01\x00");
        let header_len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        assert_eq!((10 + header_len) % ALIGN, 0);
        let header = std::str::from_utf8(&bytes[10..10 + header_len]).unwrap();
        assert!(header.starts_with("{'descr': '<f4', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
        assert_eq!(bytes.len(), 10 + header_len + 6 * 4);
    }

    #[test]
    fn float32_survives_a_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.npy");
        let data = vec![1.5, 0.0, f32::NAN, 7.25, -1.0, 1e-3];
        write_f32(&path, 2, 3, &data).unwrap();

        let arr = read(&path).unwrap();
        assert_eq!((arr.rows, arr.cols), (2, 3));
        assert_eq!(arr.data[0], 1.5);
        assert!(arr.data[2].is_nan());
        assert_eq!(arr.data[5], 1e-3);
    }

    fn handmade(descr: &str, shape: &str, payload: &[u8]) -> Vec<u8> {
        with_order(descr, "False", shape, payload)
    }

    fn with_order(descr: &str, order: &str, shape: &str, payload: &[u8]) -> Vec<u8> {
        let header = format!("{{'descr': '{descr}', 'fortran_order': {order}, 'shape': {shape}, }}\n");
        let mut out = MAGIC.to_vec();
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn other_dtypes_convert_to_f32() {
        let f64s: Vec<u8> = [2.5f64, 4.0].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(decode(&handmade("<f8", "(1, 2)", &f64s)).unwrap().data, vec![2.5, 4.0]);

        let u16s: Vec<u8> = [1000u16, 65535].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(decode(&handmade("<u2", "(2, 1)", &u16s)).unwrap().data, vec![1000.0, 65535.0]);

        assert_eq!(decode(&handmade("|u1", "(1, 2, 1)", &[3, 9])).unwrap().data, vec![3.0, 9.0]);
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(decode(b"PNG....").is_err());
        assert!(decode(&handmade("<i8", "(1, 1)", &[0; 8])).is_err());
        assert!(decode(&handmade("<f4", "(4,)", &[0; 16])).is_err());
        assert!(decode(&handmade("<f4", "(2, 2)", &[0; 12])).is_err());
        assert!(encode_f32(2, 2, &[0.0; 3]).is_err());

        assert!(decode(&with_order("<f4", "True", "(1, 1)", &[0; 4])).is_err());
    }

    #[test]
    fn overflowing_shape_is_an_error() {
        let err = decode(&handmade("<f4", "(4611686018427387904, 8)", &[0; 16])).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
        let err = decode(&handmade("<f8", "(18446744073709551615, 1)", &[])).unwrap_err();
        assert!(err.to_string().contains("too large"), "{err}");
    }
}
