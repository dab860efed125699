//! Owned ARGB pixel buffers and the straight-to-premultiplied conversion.
//!
//! The two alpha conventions are kept apart with a zero-sized type tag so a
//! straight-alpha buffer cannot reach the PNG writer by accident. Ownership
//! of the backing `Vec<u32>` moves with the surface; nothing is shared.

use std::marker::PhantomData;

/// Color channels stored independent of alpha, as read off the wire.
pub struct Straight;

/// Color channels pre-scaled by the alpha fraction, ready for output.
pub struct Premultiplied;

/// A rectangular buffer of packed `A:8 R:8 G:8 B:8` samples.
pub struct PixelSurface<State> {
    width: u32,
    height: u32,
    data: Vec<u32>,
    _state: PhantomData<State>,
}

impl<State> PixelSurface<State> {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

impl PixelSurface<Straight> {
    /// Wrap a straight-alpha sample buffer. `data` must hold exactly
    /// `width * height` samples in row-major order.
    pub fn from_argb(width: u32, height: u32, data: Vec<u32>) -> Self {
        debug_assert_eq!(data.len() as u64, u64::from(width) * u64::from(height));
        PixelSurface {
            width,
            height,
            data,
            _state: PhantomData,
        }
    }

    /// Clear a pixel to fully transparent. Used by the mask compositor.
    pub fn clear_pixel(&mut self, x: u32, y: u32) {
        let idx = y as usize * self.width as usize + x as usize;
        self.data[idx] = 0;
    }

    /// Scale each color channel by the alpha fraction, producing a new
    /// buffer. Each output sample depends only on the same-index input
    /// sample; the input is consumed, never mutated.
    pub fn premultiply(self) -> PixelSurface<Premultiplied> {
        let data = self.data.into_iter().map(premultiply_sample).collect();
        PixelSurface {
            width: self.width,
            height: self.height,
            data,
            _state: PhantomData,
        }
    }
}

fn premultiply_sample(sample: u32) -> u32 {
    let a = sample >> 24;
    let scale = |c: u32| c * a / 255;
    let r = scale((sample >> 16) & 0xff);
    let g = scale((sample >> 8) & 0xff);
    let b = scale(sample & 0xff);
    (a << 24) | (r << 16) | (g << 8) | b
}
