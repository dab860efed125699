//! PNG output.
//!
//! PNG stores straight alpha, so the premultiplied pipeline result is
//! unscaled on the way out: `c = (c' * 255 + a/2) / a`, clamped.

use std::path::Path;

use image::{ImageBuffer, Rgba};

use crate::surface::{PixelSurface, Premultiplied};

pub fn write_png(surface: &PixelSurface<Premultiplied>, path: &Path) -> anyhow::Result<()> {
    let mut rgba = Vec::with_capacity(surface.data().len() * 4);
    for &sample in surface.data() {
        let a = sample >> 24;
        let r = unpremultiply((sample >> 16) & 0xff, a);
        let g = unpremultiply((sample >> 8) & 0xff, a);
        let b = unpremultiply(sample & 0xff, a);
        rgba.extend_from_slice(&[r, g, b, a as u8]);
    }

    let img: ImageBuffer<Rgba<u8>, Vec<u8>> =
        ImageBuffer::from_raw(surface.width(), surface.height(), rgba)
            .ok_or_else(|| anyhow::anyhow!("Buffer creation failed"))?;
    img.save(path)?;
    Ok(())
}

fn unpremultiply(c: u32, a: u32) -> u8 {
    if a == 0 {
        return 0;
    }
    ((c * 255 + a / 2) / a).min(255) as u8
}
