use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Pixel, Rgb, RgbImage};
use log::debug;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::errors::{Result, SearchError};

/// Number of buckets per color channel. Only powers of two up to 256 are accepted, which are
/// exactly the values that split 0..=255 into equal integer-width buckets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Depth(u32);

impl Depth {
    pub fn new(d: u32) -> Result<Self> {
        if d == 0 || d > 256 || 256 % d != 0 {
            return Err(SearchError::InvalidDepth(d));
        }
        Ok(Depth(d))
    }

    /// Inverse of [`Depth::bin_count`], used when a histogram is read back from a dump.
    pub fn for_bin_count(n: usize) -> Option<Self> {
        (0..=8).map(|s| Depth(1 << s)).find(|d| d.bin_count() == n)
    }

    pub fn get(self) -> u32 { self.0 }

    /// Width of one bucket in channel units.
    pub fn step(self) -> u32 { 256 / self.0 }

    pub fn bin_count(self) -> usize {
        let d = self.0 as usize;
        d * d * d
    }

    #[inline]
    pub fn bucket(self, c: u8) -> usize { (c as u32 / self.step()) as usize }

    #[inline]
    pub fn bin_index(self, r: u8, g: u8, b: u8) -> usize {
        let d = self.0 as usize;
        self.bucket(r) * d * d + self.bucket(g) * d + self.bucket(b)
    }
}

// wide samples keep their high byte (v >> 8); `to_rgb8` would round instead and can push a
// value just below a bucket edge into the next bucket
fn to_rgb8_truncated(img: &DynamicImage) -> RgbImage {
    let color = img.color();
    if color.bytes_per_pixel() == color.channel_count() {
        return img.to_rgb8();
    }
    let wide = img.to_rgb16();
    ImageBuffer::from_fn(wide.width(), wide.height(), |x, y| {
        let p = wide.get_pixel(x, y);
        Rgb([(p[0] >> 8) as u8, (p[1] >> 8) as u8, (p[2] >> 8) as u8])
    })
}

/// Normalized color histogram of one image. Bin values are non-negative and sum to 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Histogram {
    name: String,
    depth: Depth,
    values: Vec<f64>,
}

impl Histogram {
    /// Build from any 8-bit pixel grid. Alpha (if any) is ignored.
    pub fn from_image<I>(name: impl Into<String>, img: &I, depth: Depth) -> Result<Self>
    where
        I: GenericImageView,
        I::Pixel: Pixel<Subpixel = u8>,
    {
        let name = name.into();
        let (w, h) = img.dimensions();
        let n_pixels = w as u64 * h as u64;
        if n_pixels == 0 {
            return Err(SearchError::EmptyImage(name));
        }

        let mut counts = vec![0u64; depth.bin_count()];
        for (_, _, p) in img.pixels() {
            let rgb = p.to_rgb();
            counts[depth.bin_index(rgb[0], rgb[1], rgb[2])] += 1;
        }

        let total = n_pixels as f64;
        let values = counts.into_iter().map(|c| c as f64 / total).collect();
        Ok(Histogram { name, depth, values })
    }

    /// Open, decode and bucket an image file. The file handle does not outlive the decode.
    pub fn from_file(path: &Path, depth: Depth) -> Result<Self> {
        let img = ImageReader::open(path)
            .and_then(|r| r.with_guessed_format())
            .map_err(|e| SearchError::io(path, e))?
            .decode()
            .map_err(|source| SearchError::Decode { path: path.to_path_buf(), source })?;
        debug!("decoded {} ({}x{}, {:?})", path.display(), img.width(), img.height(), img.color());
        Self::from_image(path.display().to_string(), &to_rgb8_truncated(&img), depth)
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn into_name(self) -> String { self.name }

    pub fn depth(&self) -> Depth { self.depth }

    pub fn values(&self) -> &[f64] { &self.values }

    pub fn len(&self) -> usize { self.values.len() }

    pub fn is_empty(&self) -> bool { self.values.is_empty() }

    /// Write as text: bin count on the first line, space separated bin values on the second.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| SearchError::io(path, e))?;
        let mut w = BufWriter::new(file);
        let line = self.values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
        writeln!(w, "{}", self.values.len())
            .and_then(|_| writeln!(w, "{}", line))
            .and_then(|_| w.flush())
            .map_err(|e| SearchError::io(path, e))
    }

    /// Read a histogram written by [`Histogram::save`]. Values are re-normalized by their sum,
    /// so raw per-bin pixel counts are accepted as well.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SearchError::io(path, e))?;
        let mut lines = BufReader::new(file).lines();

        let header = lines
            .next()
            .transpose()
            .map_err(|e| SearchError::io(path, e))?
            .ok_or_else(|| SearchError::format(path, "missing bin count"))?;
        let header = header.trim();
        let n: usize = header
            .parse()
            .map_err(|_| SearchError::format(path, format!("invalid bin count '{}'", header)))?;
        let depth = Depth::for_bin_count(n)
            .ok_or_else(|| SearchError::format(path, format!("{} is not a valid bin count", n)))?;

        let body = lines.next().transpose().map_err(|e| SearchError::io(path, e))?.unwrap_or_default();
        let values = body
            .split_whitespace()
            .map(|s| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .ok_or_else(|| SearchError::format(path, format!("invalid bin value '{}'", s)))
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != n {
            return Err(SearchError::format(path, format!("expected {} values, found {}", n, values.len())));
        }

        let sum: f64 = values.iter().sum();
        if sum <= 0.0 {
            return Err(SearchError::format(path, "bin values sum to zero"));
        }
        let values = values.into_iter().map(|v| v / sum).collect();
        Ok(Histogram { name: path.display().to_string(), depth, values })
    }
}
