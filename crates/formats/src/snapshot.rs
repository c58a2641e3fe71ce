use std::fmt;
use std::io::Cursor;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};

/// Sky gradient stops, top (0.0) to bottom (1.0).
pub const SKY_STOPS: [(f64, [u8; 3]); 3] = [
    (0.0, [0x98, 0xc8, 0xf6]),
    (0.4, [0xcb, 0xeb, 0xff]),
    (1.0, [0xf0, 0xf9, 0xff]),
];

#[derive(Debug)]
pub enum SnapshotError {
    EmptySize { width: u32, height: u32 },
    Image(image::ImageError),
    Io(std::io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::EmptySize { width, height } => {
                write!(f, "snapshot size {width}x{height} is empty")
            }
            SnapshotError::Image(err) => write!(f, "image error: {err}"),
            SnapshotError::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for SnapshotError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub width: u32,
    pub height: u32,
    /// Composite the sky gradient behind transparent pixels.
    pub sky: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            sky: true,
        }
    }
}

/// Gradient color at `t` in `[0, 1]`, top to bottom.
pub fn sky_color(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    for pair in SKY_STOPS.windows(2) {
        let ((t0, c0), (t1, c1)) = (pair[0], pair[1]);
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            return std::array::from_fn(|i| lerp_u8(c0[i], c1[i], f));
        }
    }
    SKY_STOPS[SKY_STOPS.len() - 1].1
}

fn lerp_u8(a: u8, b: u8, f: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * f).round().clamp(0.0, 255.0) as u8
}

/// Resizes `frame` to the requested size and, if asked, blends it over the sky.
pub fn compose(frame: &RgbaImage, opts: SnapshotOptions) -> Result<RgbaImage, SnapshotError> {
    if opts.width == 0 || opts.height == 0 {
        return Err(SnapshotError::EmptySize {
            width: opts.width,
            height: opts.height,
        });
    }
    let mut out = if frame.dimensions() == (opts.width, opts.height) {
        frame.clone()
    } else {
        imageops::resize(frame, opts.width, opts.height, FilterType::Triangle)
    };
    if !opts.sky {
        return Ok(out);
    }

    let denom = (opts.height.max(2) - 1) as f64;
    for (_, y, px) in out.enumerate_pixels_mut() {
        let sky = sky_color(y as f64 / denom);
        let a = px[3] as f64 / 255.0;
        let blended: [u8; 3] = std::array::from_fn(|i| lerp_u8(sky[i], px[i], a));
        *px = Rgba([blended[0], blended[1], blended[2], 255]);
    }
    Ok(out)
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, SnapshotError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(SnapshotError::Image)?;
    Ok(bytes)
}

pub fn save_png(path: impl AsRef<Path>, frame: &RgbaImage, opts: SnapshotOptions) -> Result<(), SnapshotError> {
    let bytes = encode_png(&compose(frame, opts)?)?;
    std::fs::write(path, bytes).map_err(SnapshotError::Io)
}

#[cfg(test)]
mod tests {
    use super::{SnapshotError, SnapshotOptions, compose, encode_png, save_png, sky_color};
    use image::{Rgba, RgbaImage};

    #[test]
    fn gradient_hits_stops() {
        assert_eq!(sky_color(0.0), [0x98, 0xc8, 0xf6]);
        assert_eq!(sky_color(0.4), [0xcb, 0xeb, 0xff]);
        assert_eq!(sky_color(1.0), [0xf0, 0xf9, 0xff]);
        assert_eq!(sky_color(7.0), [0xf0, 0xf9, 0xff]);
    }

    #[test]
    fn transparent_pixels_show_sky_opaque_ones_do_not() {
        let mut frame = RgbaImage::new(4, 4);
        frame.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let out = compose(
            &frame,
            SnapshotOptions {
                width: 4,
                height: 4,
                sky: true,
            },
        )
        .expect("compose");
        assert_eq!(out.get_pixel(0, 0), &Rgba([0x98, 0xc8, 0xf6, 255]));
        assert_eq!(out.get_pixel(1, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(0, 3), &Rgba([0xf0, 0xf9, 0xff, 255]));
    }

    #[test]
    fn resizes_and_encodes_png() {
        let frame = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]));
        let out = compose(
            &frame,
            SnapshotOptions {
                width: 3,
                height: 2,
                sky: false,
            },
        )
        .expect("compose");
        assert_eq!(out.dimensions(), (3, 2));

        let png = encode_png(&out).expect("png");
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory(&png).expect("decode").to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
    }

    #[test]
    fn empty_size_is_rejected_and_files_are_written() {
        let frame = RgbaImage::new(2, 2);
        assert!(matches!(
            compose(&frame, SnapshotOptions { width: 0, height: 5, sky: true }),
            Err(SnapshotError::EmptySize { .. })
        ));

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("view.png");
        save_png(&path, &frame, SnapshotOptions::default()).expect("save");
        assert!(std::fs::metadata(&path).expect("meta").len() > 0);
    }
}
