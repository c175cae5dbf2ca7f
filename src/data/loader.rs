// ============================================================
// Layer 4 — MNIST File Loader
// ============================================================
// Reads the MNIST partitions from the IDX files distributed
// with the dataset, downloading them first if absent.
//
// On-disk layout (relative to the data directory):
//   MNIST/raw/train-images-idx3-ubyte.gz
//   MNIST/raw/train-labels-idx1-ubyte.gz
//   MNIST/raw/t10k-images-idx3-ubyte.gz
//   MNIST/raw/t10k-labels-idx1-ubyte.gz
//
// IDX format (all header integers are big-endian i32):
//   labels: magic 2049, count,              then count bytes
//   images: magic 2051, count, rows, cols,  then count*rows*cols bytes
//
// The files stay gzip-compressed on disk and are decoded while
// reading, so a partial download is never mistaken for data.

use anyhow::{bail, Context, Result};
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use std::{
    fs,
    io::Read,
    path::{Path, PathBuf},
};

use crate::domain::sample::{DigitSample, IMAGE_HEIGHT, IMAGE_WIDTH, NUM_CLASSES};
use crate::domain::traits::{DigitSource, Split};

/// CVDF mirror of the original MNIST distribution
pub const MIRROR_URL: &str = "https://storage.googleapis.com/cvdf-datasets/mnist/";

const LABELS_MAGIC: i32 = 2049;
const IMAGES_MAGIC: i32 = 2051;

/// MNIST stored as gzip'd IDX files under a local directory.
pub struct MnistFiles {
    /// Directory holding the `MNIST/raw` tree
    root: PathBuf,
    /// Base URL the files are fetched from when missing
    mirror: String,
}

impl MnistFiles {
    /// Point the loader at a data directory (e.g. `files/`)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { root: dir.into(), mirror: MIRROR_URL.to_string() }
    }

    /// Fetch from a different mirror
    #[cfg(test)]
    pub fn with_mirror(mut self, url: impl Into<String>) -> Self {
        self.mirror = url.into();
        self
    }

    /// Directory the raw `.gz` files live in
    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("MNIST").join("raw")
    }

    /// Make sure both files of a split exist locally, downloading
    /// any that are missing. Returns (images_path, labels_path).
    pub fn ensure_split(&self, split: Split) -> Result<(PathBuf, PathBuf)> {
        let raw = self.raw_dir();
        fs::create_dir_all(&raw)
            .with_context(|| format!("Cannot create data directory '{}'", raw.display()))?;

        let images = self.ensure_file(&raw, &images_file_name(split))?;
        let labels = self.ensure_file(&raw, &labels_file_name(split))?;
        Ok((images, labels))
    }

    fn ensure_file(&self, raw: &Path, name: &str) -> Result<PathBuf> {
        let path = raw.join(name);
        if path.exists() {
            tracing::debug!("Found '{}'", path.display());
            return Ok(path);
        }

        let url = format!("{}{}", self.mirror, name);
        tracing::info!("Downloading {}", url);

        let bytes = reqwest::blocking::get(&url)
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .with_context(|| format!("Failed to download '{url}'"))?;

        // Only complete downloads ever appear under the final name.
        let partial = path.with_extension("gz.part");
        fs::write(&partial, &bytes)
            .with_context(|| format!("Cannot write '{}'", partial.display()))?;
        fs::rename(&partial, &path)
            .with_context(|| format!("Cannot move download into '{}'", path.display()))?;

        tracing::info!("Saved {} bytes to '{}'", bytes.len(), path.display());
        Ok(path)
    }
}

impl DigitSource for MnistFiles {
    fn load(&self, split: Split) -> Result<Vec<DigitSample>> {
        let (images_path, labels_path) = self.ensure_split(split)?;

        let images = read_gz(&images_path)?;
        let labels = read_gz(&labels_path)?;

        let samples = decode_samples(&images, &labels)
            .with_context(|| format!("Invalid {:?} partition in '{}'", split, self.root.display()))?;

        tracing::info!("Loaded {} {:?} samples", samples.len(), split);
        Ok(samples)
    }
}

fn images_file_name(split: Split) -> String {
    format!("{}-images-idx3-ubyte.gz", split.file_prefix())
}

fn labels_file_name(split: Split) -> String {
    format!("{}-labels-idx1-ubyte.gz", split.file_prefix())
}

/// Read a whole file and gunzip it in memory.
fn read_gz(path: &Path) -> Result<Vec<u8>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    let mut out = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut out)
        .with_context(|| format!("Cannot decompress '{}'", path.display()))?;
    Ok(out)
}

/// Pair up decoded IDX image and label payloads into samples.
pub fn decode_samples(images: &[u8], labels: &[u8]) -> Result<Vec<DigitSample>> {
    let pixels = parse_idx_images(images)?;
    let labels = parse_idx_labels(labels)?;

    if pixels.len() != labels.len() {
        bail!(
            "image count ({}) does not match label count ({})",
            pixels.len(),
            labels.len()
        );
    }

    pixels
        .into_iter()
        .zip(labels)
        .map(|(px, label)| {
            if label as usize >= NUM_CLASSES {
                bail!("label {} is not a digit", label);
            }
            Ok(DigitSample::new(px, label))
        })
        .collect()
}

/// Parse an uncompressed IDX3 image file into one byte vector per image.
pub fn parse_idx_images(bytes: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut r = bytes;
    let magic = r.read_i32::<BigEndian>().context("image header truncated")?;
    if magic != IMAGES_MAGIC {
        bail!("bad image file magic {magic}, expected {IMAGES_MAGIC}");
    }
    let count = read_header_len(&mut r, "image")?;
    let rows  = read_header_len(&mut r, "image")?;
    let cols  = read_header_len(&mut r, "image")?;

    if rows != IMAGE_HEIGHT || cols != IMAGE_WIDTH {
        bail!("expected {IMAGE_HEIGHT}x{IMAGE_WIDTH} images, header says {rows}x{cols}");
    }

    let image_len = rows * cols;
    let Some(payload_len) = count.checked_mul(image_len) else {
        bail!("image count {count} is too large");
    };
    if r.len() < payload_len {
        bail!(
            "image payload truncated: need {} bytes, have {}",
            payload_len,
            r.len()
        );
    }

    Ok(r[..payload_len]
        .chunks(image_len)
        .map(|chunk| chunk.to_vec())
        .collect())
}

/// Header dimensions are unsigned 32-bit big-endian integers.
fn read_header_len(r: &mut &[u8], kind: &str) -> Result<usize> {
    let value = r
        .read_u32::<BigEndian>()
        .with_context(|| format!("{kind} header truncated"))?;
    usize::try_from(value).with_context(|| format!("{kind} header value {value} does not fit in usize"))
}

/// Parse an uncompressed IDX1 label file.
pub fn parse_idx_labels(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut r = bytes;
    let magic = r.read_i32::<BigEndian>().context("label header truncated")?;
    if magic != LABELS_MAGIC {
        bail!("bad label file magic {magic}, expected {LABELS_MAGIC}");
    }
    let count = read_header_len(&mut r, "label")?;

    if r.len() < count {
        bail!("label payload truncated: need {} bytes, have {}", count, r.len());
    }
    Ok(r[..count].to_vec())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;
    use flate2::{write::GzEncoder, Compression};
    use std::io::Write;

    fn idx_images(count: usize, rows: i32, cols: i32, fill: u8) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<BigEndian>(IMAGES_MAGIC).unwrap();
        out.write_i32::<BigEndian>(count as i32).unwrap();
        out.write_i32::<BigEndian>(rows).unwrap();
        out.write_i32::<BigEndian>(cols).unwrap();
        out.extend(std::iter::repeat(fill).take(count * (rows * cols) as usize));
        out
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.write_i32::<BigEndian>(LABELS_MAGIC).unwrap();
        out.write_i32::<BigEndian>(labels.len() as i32).unwrap();
        out.extend_from_slice(labels);
        out
    }

    fn gz(bytes: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("mnist-loader-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_decode_well_formed_payload() {
        let samples = decode_samples(&idx_images(3, 28, 28, 9), &idx_labels(&[0, 5, 9])).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].label, 5);
        assert!(samples[2].pixels.iter().all(|&p| p == 9));
    }

    #[test]
    fn test_rejects_oversized_counts() {
        let mut images = idx_images(0, 28, 28, 0);
        images[4..8].copy_from_slice(&(-1i32).to_be_bytes());
        let err = parse_idx_images(&images).unwrap_err();
        assert!(err.to_string().contains("truncated") || err.to_string().contains("too large"));

        let mut labels = idx_labels(&[]);
        labels[4..8].copy_from_slice(&(-1i32).to_be_bytes());
        assert!(parse_idx_labels(&labels).is_err());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut images = idx_images(1, 28, 28, 0);
        images[3] = 0x00;
        assert!(parse_idx_images(&images).is_err());
        assert!(parse_idx_labels(&idx_images(1, 28, 28, 0)).is_err());
    }

    #[test]
    fn test_rejects_wrong_dimensions() {
        assert!(parse_idx_images(&idx_images(1, 32, 32, 0)).is_err());
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let mut images = idx_images(2, 28, 28, 0);
        images.truncate(images.len() - 1);
        assert!(parse_idx_images(&images).is_err());

        let mut labels = idx_labels(&[1, 2, 3]);
        labels.pop();
        assert!(parse_idx_labels(&labels).is_err());
    }

    #[test]
    fn test_rejects_count_mismatch() {
        assert!(decode_samples(&idx_images(2, 28, 28, 0), &idx_labels(&[1])).is_err());
    }

    #[test]
    fn test_rejects_non_digit_label() {
        assert!(decode_samples(&idx_images(1, 28, 28, 0), &idx_labels(&[12])).is_err());
    }

    #[test]
    fn test_loads_existing_gz_files_without_network() {
        let dir   = temp_dir("existing");
        let files = MnistFiles::new(&dir).with_mirror("http://127.0.0.1:9/");
        let raw   = files.raw_dir();
        fs::create_dir_all(&raw).unwrap();

        fs::write(raw.join(images_file_name(Split::Test)), gz(&idx_images(4, 28, 28, 1))).unwrap();
        fs::write(raw.join(labels_file_name(Split::Test)), gz(&idx_labels(&[3, 1, 4, 1]))).unwrap();

        let samples = files.load(Split::Test).unwrap();
        assert_eq!(samples.iter().map(|s| s.label).collect::<Vec<_>>(), vec![3, 1, 4, 1]);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_names_follow_idx_convention() {
        assert_eq!(images_file_name(Split::Train), "train-images-idx3-ubyte.gz");
        assert_eq!(labels_file_name(Split::Test),  "t10k-labels-idx1-ubyte.gz");
    }
}
