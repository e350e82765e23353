//! Icon resolution and caching
//!
//! Icons are ordinary RGBA images converted once per (name, size, polarity)
//! into a 1-bit bitmap:
//!
//! 1. Scale to fit `size x size`, keeping aspect ratio (nearest neighbour)
//! 2. Composite onto white (normal) or black (inverted) through alpha
//! 3. Threshold luminance at 128
//!
//! Each polarity has its own asset directory so inverted cells can use
//! artwork drawn for a dark background.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use log::{debug, warn};
use thiserror::Error;

use crate::threshold::Polarity;

/// Icon loading errors
#[derive(Debug, Error)]
pub enum IconError {
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("icon {name} scales to an empty image at size {size}")]
    Empty { name: String, size: u32 },
}

/// Provider of source images
pub trait IconSource {
    /// Load the RGBA artwork for `name` in the given polarity
    fn load(&self, name: &str, polarity: Polarity) -> Result<RgbaImage, IconError>;
}

/// Loads icons from a pair of directories on disk
#[derive(Debug, Clone)]
pub struct DirectoryIconSource {
    normal: PathBuf,
    inverted: PathBuf,
}

impl DirectoryIconSource {
    pub fn new(normal: impl Into<PathBuf>, inverted: impl Into<PathBuf>) -> Self {
        Self {
            normal: normal.into(),
            inverted: inverted.into(),
        }
    }

    /// Directory used for `polarity`
    pub fn dir(&self, polarity: Polarity) -> &Path {
        match polarity {
            Polarity::Normal => &self.normal,
            Polarity::Inverted => &self.inverted,
        }
    }
}

impl IconSource for DirectoryIconSource {
    fn load(&self, name: &str, polarity: Polarity) -> Result<RgbaImage, IconError> {
        let path = self.dir(polarity).join(name);
        match image::open(&path) {
            Ok(img) => Ok(img.to_rgba8()),
            Err(source) => Err(IconError::Load { path, source }),
        }
    }
}

/// 1-bit icon, row-major, `true` = ink
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconBitmap {
    width: u32,
    height: u32,
    ink: Vec<bool>,
}

impl IconBitmap {
    /// Build a bitmap from a per-pixel predicate
    pub fn from_fn(width: u32, height: u32, mut is_ink: impl FnMut(u32, u32) -> bool) -> Self {
        let mut ink = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                ink.push(is_ink(x, y));
            }
        }
        Self { width, height, ink }
    }

    /// Convert RGBA artwork to a 1-bit icon fitting `size x size`
    pub fn rasterize(
        name: &str,
        source: &RgbaImage,
        size: u32,
        polarity: Polarity,
    ) -> Result<Self, IconError> {
        let (orig_w, orig_h) = source.dimensions();
        let empty = || IconError::Empty {
            name: name.to_owned(),
            size,
        };
        if orig_w == 0 || orig_h == 0 {
            return Err(empty());
        }

        let scale = f64::min(
            f64::from(size) / f64::from(orig_w),
            f64::from(size) / f64::from(orig_h),
        );
        let new_w = (f64::from(orig_w) * scale) as u32;
        let new_h = (f64::from(orig_h) * scale) as u32;
        if new_w == 0 || new_h == 0 {
            return Err(empty());
        }

        let scaled = imageops::resize(source, new_w, new_h, FilterType::Nearest);
        let background: u32 = match polarity {
            Polarity::Normal => 255,
            Polarity::Inverted => 0,
        };

        Ok(Self::from_fn(new_w, new_h, |x, y| {
            let [r, g, b, a] = scaled.get_pixel(x, y).0;
            let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
            let alpha = u32::from(a);
            let blended = (luma * alpha + background * (255 - alpha)) / 255;
            blended < 128
        }))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether (x, y) is ink; out of bounds reads as paper
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.ink[(y * self.width + x) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IconKey {
    name: String,
    size: u32,
    polarity: Polarity,
}

/// Memoizing icon resolver
///
/// Successful conversions are kept for the life of the cache. The key space
/// is bounded by the layout, so there is no eviction. Failures are logged
/// and retried on the next lookup.
pub struct IconCache<S> {
    source: S,
    entries: HashMap<IconKey, IconBitmap>,
}

impl<S: IconSource> IconCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: HashMap::new(),
        }
    }

    /// Resolve `name` at `size` for `polarity`
    ///
    /// Returns `None` if the icon could not be loaded or converted.
    pub fn resolve(&mut self, name: &str, size: u32, polarity: Polarity) -> Option<&IconBitmap> {
        let key = IconKey {
            name: name.to_owned(),
            size,
            polarity,
        };

        if !self.entries.contains_key(&key) {
            let loaded = self
                .source
                .load(name, polarity)
                .and_then(|img| IconBitmap::rasterize(name, &img, size, polarity));
            match loaded {
                Ok(bitmap) => {
                    debug!(
                        "Cached icon {} ({}x{}, {:?})",
                        name,
                        bitmap.width(),
                        bitmap.height(),
                        polarity
                    );
                    self.entries.insert(key.clone(), bitmap);
                }
                Err(e) => {
                    warn!("Icon unavailable: {}", e);
                    return None;
                }
            }
        }

        self.entries.get(&key)
    }

    /// Number of cached icons
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
