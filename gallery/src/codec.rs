use std::io::{BufReader, BufWriter, Read, Write};
use std::sync::Arc;

use crate::error::GalleryError;
use crate::record::{FaceRecord, Records};

/// Binary format magic and version.
const GALLERY_MAGIC: [u8; 4] = [b'F', b'A', b'C', b'E'];
const GALLERY_VERSION: u32 = 1;

/// Upper bound on a stored name in bytes. Also rejects garbage length
/// prefixes before allocating.
pub const MAX_NAME_LEN: usize = 4096;

/// Encoded header size in bytes.
const HEADER_LEN: usize = 16;

/// Largest embedding capacity reserved ahead of reading its bytes.
const MAX_PREALLOC: usize = 4096;

/// Encode serializes a gallery snapshot in a compact binary format:
///
/// ```text
/// [4B magic "FACE"] [4B version=1]
/// [4B dim] [4B count]
/// For each record (ascending name order):
///   [4B nameLen] [nameLen bytes UTF-8 name]
///   [dim x 4B float32 bits]
/// ```
///
/// All multi-byte values are little-endian. Floats are written as raw bits,
/// so decoding yields bit-identical embeddings.
pub fn encode(records: &Records, dim: usize, w: &mut dyn Write) -> Result<(), GalleryError> {
    let mut bw = BufWriter::new(w);
    let write_err = |e: std::io::Error| GalleryError::Persistence(e.to_string());

    bw.write_all(&GALLERY_MAGIC).map_err(write_err)?;
    bw.write_all(&GALLERY_VERSION.to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(dim as u32).to_le_bytes()).map_err(write_err)?;
    bw.write_all(&(records.len() as u32).to_le_bytes()).map_err(write_err)?;

    for record in records.values() {
        check_name_len(&record.name)?;
        if record.embedding.len() != dim {
            return Err(GalleryError::DimensionMismatch {
                expected: dim,
                got: record.embedding.len(),
            });
        }
        let name = record.name.as_bytes();
        bw.write_all(&(name.len() as u32).to_le_bytes()).map_err(write_err)?;
        bw.write_all(name).map_err(write_err)?;
        for &v in &record.embedding {
            bw.write_all(&v.to_bits().to_le_bytes()).map_err(write_err)?;
        }
    }

    bw.flush().map_err(write_err)?;
    Ok(())
}

/// Encode into a fresh byte buffer.
pub fn encode_to_vec(records: &Records, dim: usize) -> Result<Vec<u8>, GalleryError> {
    let mut buf = Vec::new();
    encode(records, dim, &mut buf)?;
    Ok(buf)
}

/// Header of an encoded gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub dim: usize,
    pub count: usize,
}

/// Rejects names the decoder would refuse.
pub fn check_name_len(name: &str) -> Result<(), GalleryError> {
    if name.is_empty() {
        return Err(GalleryError::InvalidName("name must not be empty".into()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(GalleryError::InvalidName(format!(
            "name is {} bytes, limit is {MAX_NAME_LEN}",
            name.len()
        )));
    }
    Ok(())
}

/// Decode deserializes a gallery written by [`encode`].
///
/// Returns the stored dimension along with the records. When
/// `expected_dim` is set, a header with any other dimension is rejected
/// before record data is read. Any structural problem (bad magic, unknown
/// version, dimension mismatch, truncation, trailing bytes, duplicate or
/// non-UTF-8 names) is a [`GalleryError::CorruptState`].
///
/// Embeddings grow as their bytes arrive, so a forged header cannot force
/// a large allocation.
pub fn decode(
    r: &mut dyn Read,
    expected_dim: Option<usize>,
) -> Result<(usize, Records), GalleryError> {
    let mut br = BufReader::new(r);
    let header = read_header(&mut br)?;
    check_expected_dim(&header, expected_dim)?;

    let mut records = Records::new();
    for i in 0..header.count {
        let name_len = read_u32(&mut br)? as usize;
        if name_len == 0 || name_len > MAX_NAME_LEN {
            return Err(corrupt(format!("record {i}: invalid name length {name_len}")));
        }
        let mut name_bytes = vec![0u8; name_len];
        br.read_exact(&mut name_bytes).map_err(truncated)?;
        let name = String::from_utf8(name_bytes)
            .map_err(|e| corrupt(format!("record {i}: {e}")))?;

        let mut embedding = Vec::with_capacity(header.dim.min(MAX_PREALLOC));
        for _ in 0..header.dim {
            embedding.push(f32::from_bits(read_u32(&mut br)?));
        }

        if records.contains_key(&name) {
            return Err(corrupt(format!("duplicate name {name:?}")));
        }
        records.insert(name.clone(), Arc::new(FaceRecord { name, embedding }));
    }

    let mut extra = [0u8; 1];
    match br.read(&mut extra) {
        Ok(0) => {}
        Ok(_) => return Err(corrupt("trailing bytes after last record".into())),
        Err(e) => return Err(GalleryError::Persistence(e.to_string())),
    }

    Ok((header.dim, records))
}

/// Decode from an in-memory buffer. The header is checked against the
/// buffer length before any record is read.
pub fn decode_slice(
    data: &[u8],
    expected_dim: Option<usize>,
) -> Result<(usize, Records), GalleryError> {
    let header = read_header(&mut &data[..])?;
    check_expected_dim(&header, expected_dim)?;

    let body = (data.len() - HEADER_LEN) as u64;
    let min_record = 4 + 1 + 4 * header.dim as u64;
    if (header.count as u64).saturating_mul(min_record) > body {
        return Err(corrupt(format!(
            "{} records of dimension {} do not fit in {body} bytes",
            header.count, header.dim
        )));
    }

    let mut data = data;
    decode(&mut data, expected_dim)
}

fn check_expected_dim(header: &Header, expected_dim: Option<usize>) -> Result<(), GalleryError> {
    match expected_dim {
        Some(dim) if dim != header.dim => Err(corrupt(format!(
            "stored dimension {} does not match configured {dim}",
            header.dim
        ))),
        _ => Ok(()),
    }
}

/// Read and validate only the header.
pub fn read_header(r: &mut dyn Read) -> Result<Header, GalleryError> {
    let mut buf4 = [0u8; 4];
    r.read_exact(&mut buf4).map_err(truncated)?;
    if buf4 != GALLERY_MAGIC {
        return Err(corrupt(format!("invalid magic {buf4:?}")));
    }

    let version = read_u32(r)?;
    if version != GALLERY_VERSION {
        return Err(corrupt(format!(
            "unsupported version {version} (want {GALLERY_VERSION})"
        )));
    }

    let dim = read_u32(r)? as usize;
    if dim == 0 {
        return Err(corrupt("invalid dimension 0".into()));
    }
    let count = read_u32(r)? as usize;

    Ok(Header {
        version,
        dim,
        count,
    })
}

fn read_u32(r: &mut dyn Read) -> Result<u32, GalleryError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(truncated)?;
    Ok(u32::from_le_bytes(buf))
}

fn truncated(e: std::io::Error) -> GalleryError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        corrupt("unexpected end of file".into())
    } else {
        GalleryError::Persistence(e.to_string())
    }
}

fn corrupt(msg: String) -> GalleryError {
    GalleryError::CorruptState(msg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery(entries: &[(&str, Vec<f32>)]) -> Records {
        entries
            .iter()
            .map(|(name, v)| (name.to_string(), Arc::new(FaceRecord::new(*name, v.clone()))))
            .collect()
    }

    #[test]
    fn test_encode_decode() {
        let g = gallery(&[
            ("alice", vec![0.6, 0.8, 0.0]),
            ("bob", vec![0.0, -0.0, 1.0]),
            ("zero", vec![0.0, 0.0, 0.0]),
        ]);
        let buf = encode_to_vec(&g, 3).unwrap();
        let (dim, g2) = decode_slice(&buf, None).unwrap();
        assert_eq!(dim, 3);
        assert_eq!(g2.len(), 3);
        for (name, rec) in &g {
            let other = &g2[name];
            assert_eq!(other.name, rec.name);
            let a: Vec<u32> = rec.embedding.iter().map(|v| v.to_bits()).collect();
            let b: Vec<u32> = other.embedding.iter().map(|v| v.to_bits()).collect();
            assert_eq!(a, b, "{name}: bits differ");
        }
    }

    #[test]
    fn test_empty_gallery() {
        let buf = encode_to_vec(&Records::new(), 192).unwrap();
        assert_eq!(buf.len(), 16);
        let (dim, g) = decode_slice(&buf, None).unwrap();
        assert_eq!(dim, 192);
        assert!(g.is_empty());
    }

    #[test]
    fn test_header() {
        let g = gallery(&[("a", vec![1.0, 0.0])]);
        let buf = encode_to_vec(&g, 2).unwrap();
        let h = read_header(&mut buf.as_slice()).unwrap();
        assert_eq!(
            h,
            Header {
                version: 1,
                dim: 2,
                count: 1
            }
        );
    }

    #[test]
    fn test_encode_rejects_wrong_dim() {
        let g = gallery(&[("a", vec![1.0, 0.0])]);
        assert!(matches!(
            encode_to_vec(&g, 3),
            Err(GalleryError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn test_invalid_magic() {
        assert!(matches!(
            decode_slice(b"NOPE\x01\x00\x00\x00", None),
            Err(GalleryError::CorruptState(_))
        ));
    }

    #[test]
    fn test_unknown_version() {
        let mut buf = encode_to_vec(&Records::new(), 4).unwrap();
        buf[4..8].copy_from_slice(&99u32.to_le_bytes());
        let err = decode_slice(&buf, None).unwrap_err();
        assert!(err.to_string().contains("unsupported version 99"), "{err}");
    }

    #[test]
    fn test_zero_dim() {
        let mut buf = encode_to_vec(&Records::new(), 4).unwrap();
        buf[8..12].copy_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode_slice(&buf, None), Err(GalleryError::CorruptState(_))));
    }

    #[test]
    fn test_truncated() {
        let g = gallery(&[("alice", vec![0.6, 0.8])]);
        let buf = encode_to_vec(&g, 2).unwrap();
        for cut in 0..buf.len() {
            assert!(
                matches!(decode_slice(&buf[..cut], None), Err(GalleryError::CorruptState(_))),
                "cut at {cut} should be corrupt"
            );
        }
    }

    #[test]
    fn test_trailing_bytes() {
        let g = gallery(&[("alice", vec![0.6, 0.8])]);
        let mut buf = encode_to_vec(&g, 2).unwrap();
        buf.push(0);
        assert!(matches!(decode_slice(&buf, None), Err(GalleryError::CorruptState(_))));
    }

    #[test]
    fn test_duplicate_name() {
        let g = gallery(&[("alice", vec![1.0])]);
        let one = encode_to_vec(&g, 1).unwrap();
        let mut buf = one.clone();
        buf[12..16].copy_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&one[16..]);
        let err = decode_slice(&buf, None).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn test_invalid_utf8_name() {
        let g = gallery(&[("ab", vec![1.0])]);
        let mut buf = encode_to_vec(&g, 1).unwrap();
        buf[20] = 0xff;
        assert!(matches!(decode_slice(&buf, None), Err(GalleryError::CorruptState(_))));
    }

    fn forged_header(dim: u32, count: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"FACE");
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&dim.to_le_bytes());
        buf.extend_from_slice(&count.to_le_bytes());
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.push(b'a');
        buf
    }

    #[test]
    fn test_huge_dim_is_corrupt() {
        let buf = forged_header(u32::MAX, 1);
        assert!(matches!(decode_slice(&buf, None), Err(GalleryError::CorruptState(_))));
        assert!(matches!(decode(&mut buf.as_slice(), None), Err(GalleryError::CorruptState(_))));
        let err = decode_slice(&buf, Some(192)).unwrap_err();
        assert!(err.to_string().contains("does not match"), "{err}");
    }

    #[test]
    fn test_huge_count_is_corrupt() {
        let buf = forged_header(2, u32::MAX);
        assert!(matches!(decode_slice(&buf, Some(2)), Err(GalleryError::CorruptState(_))));
        assert!(matches!(decode(&mut buf.as_slice(), Some(2)), Err(GalleryError::CorruptState(_))));
    }

    #[test]
    fn test_expected_dim() {
        let g = gallery(&[("a", vec![1.0, 0.0])]);
        let buf = encode_to_vec(&g, 2).unwrap();
        assert_eq!(decode_slice(&buf, Some(2)).unwrap().1, g);
        assert!(matches!(decode_slice(&buf, Some(3)), Err(GalleryError::CorruptState(_))));
    }

    #[test]
    fn test_encode_rejects_long_name() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let g = gallery(&[(long.as_str(), vec![1.0])]);
        assert!(matches!(encode_to_vec(&g, 1), Err(GalleryError::InvalidName(_))));

        let max = "x".repeat(MAX_NAME_LEN);
        let g = gallery(&[(max.as_str(), vec![1.0])]);
        let buf = encode_to_vec(&g, 1).unwrap();
        assert_eq!(decode_slice(&buf, Some(1)).unwrap().1, g);
    }
}
