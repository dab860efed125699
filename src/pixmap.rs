//! Drawable decoding for the legacy icon path.
//!
//! `GetImage` hands back raw server-formatted bytes; everything here turns
//! those into ARGB samples. Depth-1 drawables (and masks) come over as
//! XY-format bitmaps whose bit order and scanline padding are dictated by
//! the server setup, color pixmaps as Z-format pixels interpreted through
//! the screen's default visual channel masks.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    ConnectionExt, GetGeometryReply, ImageFormat, ImageOrder, Pixmap, Screen, Visualid,
    Visualtype,
};

use crate::error::ExtractError;
use crate::surface::{PixelSurface, Straight};

/// A decoded 1-bit-per-pixel stencil.
pub struct MaskBitmap {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl MaskBitmap {
    /// Bit at `(x, y)`; positions outside the stencil count as clear, the
    /// way a mask smaller than its pixmap leaves the uncovered area
    /// transparent.
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[y as usize * self.width as usize + x as usize]
    }
}

/// Find the visual description for `id` among the screen's allowed depths.
pub fn find_visual(screen: &Screen, id: Visualid) -> Option<&Visualtype> {
    screen
        .allowed_depths
        .iter()
        .flat_map(|depth| depth.visuals.iter())
        .find(|visual| visual.visual_id == id)
}

/// Fetch a 1-bit drawable as a stencil.
pub fn fetch_bitmap(
    conn: &impl Connection,
    drawable: Pixmap,
    width: u16,
    height: u16,
) -> Result<MaskBitmap, ExtractError> {
    let reply = conn
        .get_image(ImageFormat::XY_PIXMAP, drawable, 0, 0, width, height, 1)?
        .reply()?;
    let setup = conn.setup();
    Ok(decode_bitmap(
        &reply.data,
        u32::from(width),
        u32::from(height),
        setup.bitmap_format_bit_order,
        setup.bitmap_format_scanline_pad,
    ))
}

/// Fetch a color pixmap and decode it to straight-alpha ARGB.
///
/// A depth-1 "color" pixmap is itself a bitmap and decodes directly, set
/// bits becoming opaque black. Anything deeper goes through the default
/// visual's channel masks; depth 24 comes out opaque, depth 32 keeps the
/// alpha bits the server sent.
pub fn fetch_color_surface(
    conn: &impl Connection,
    screen: &Screen,
    pixmap: Pixmap,
    geometry: &GetGeometryReply,
) -> Result<PixelSurface<Straight>, ExtractError> {
    if geometry.depth == 1 {
        let bits = fetch_bitmap(conn, pixmap, geometry.width, geometry.height)?;
        return Ok(bitmap_to_surface(&bits));
    }

    let visual = find_visual(screen, screen.root_visual).ok_or_else(|| {
        ExtractError::Protocol("root visual not advertised by the screen".into())
    })?;
    let reply = conn
        .get_image(
            ImageFormat::Z_PIXMAP,
            pixmap,
            0,
            0,
            geometry.width,
            geometry.height,
            !0,
        )?
        .reply()?;
    let setup = conn.setup();
    let format = setup
        .pixmap_formats
        .iter()
        .find(|format| format.depth == reply.depth)
        .ok_or_else(|| {
            ExtractError::Protocol(format!("no pixmap format for depth {}", reply.depth))
        })?;

    decode_zpixmap(
        &reply.data,
        u32::from(geometry.width),
        u32::from(geometry.height),
        reply.depth,
        format.bits_per_pixel,
        format.scanline_pad,
        setup.image_byte_order,
        visual,
    )
}

/// Apply a stencil over a color surface: clear bits (and pixels the mask
/// does not cover) become fully transparent, set bits keep the color pixel.
pub fn apply_mask(surface: &mut PixelSurface<Straight>, mask: &MaskBitmap) {
    for y in 0..surface.height() {
        for x in 0..surface.width() {
            if !mask.get(x, y) {
                surface.clear_pixel(x, y);
            }
        }
    }
}

/// Render a stencil as an image of its own: set bits are opaque black,
/// clear bits transparent.
pub fn bitmap_to_surface(bits: &MaskBitmap) -> PixelSurface<Straight> {
    let data = bits
        .bits
        .iter()
        .map(|&set| if set { 0xff00_0000 } else { 0 })
        .collect();
    PixelSurface::from_argb(bits.width, bits.height, data)
}

fn decode_bitmap(
    data: &[u8],
    width: u32,
    height: u32,
    bit_order: ImageOrder,
    scanline_pad: u8,
) -> MaskBitmap {
    let pad_bits = usize::from(scanline_pad).max(8);
    let stride = (width as usize).div_ceil(pad_bits) * pad_bits / 8;

    let mut bits = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let byte = data.get(y * stride + x / 8).copied().unwrap_or(0);
            let shift = if bit_order == ImageOrder::LSB_FIRST {
                x % 8
            } else {
                7 - x % 8
            };
            bits.push((byte >> shift) & 1 == 1);
        }
    }
    MaskBitmap {
        width,
        height,
        bits,
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_zpixmap(
    data: &[u8],
    width: u32,
    height: u32,
    depth: u8,
    bits_per_pixel: u8,
    scanline_pad: u8,
    byte_order: ImageOrder,
    visual: &Visualtype,
) -> Result<PixelSurface<Straight>, ExtractError> {
    if bits_per_pixel % 8 != 0 || bits_per_pixel > 32 || bits_per_pixel == 0 {
        return Err(ExtractError::Protocol(format!(
            "unsupported pixel size: {bits_per_pixel} bits"
        )));
    }
    let bytes_per_pixel = usize::from(bits_per_pixel) / 8;
    let pad_bits = usize::from(scanline_pad).max(8);
    let row_bits = width as usize * usize::from(bits_per_pixel);
    let stride = row_bits.div_ceil(pad_bits) * pad_bits / 8;

    // Alpha only exists when the depth says so; the byte left over above
    // a 24-bit visual in a 32-bit pixel is undefined otherwise.
    let alpha_mask = if depth == 32 {
        !(visual.red_mask | visual.green_mask | visual.blue_mask)
    } else {
        0
    };

    let mut samples = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = y * stride + x * bytes_per_pixel;
            let mut value: u32 = 0;
            for i in 0..bytes_per_pixel {
                let byte = u32::from(data.get(offset + i).copied().unwrap_or(0));
                if byte_order == ImageOrder::LSB_FIRST {
                    value |= byte << (8 * i);
                } else {
                    value = (value << 8) | byte;
                }
            }

            let r = channel(value, visual.red_mask);
            let g = channel(value, visual.green_mask);
            let b = channel(value, visual.blue_mask);
            let a = if alpha_mask == 0 {
                0xff
            } else {
                channel(value, alpha_mask)
            };
            samples.push(
                (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b),
            );
        }
    }
    Ok(PixelSurface::from_argb(width, height, samples))
}

/// Extract the channel selected by `mask` and widen it to 8 bits.
fn channel(value: u32, mask: u32) -> u8 {
    if mask == 0 {
        return 0;
    }
    let shift = mask.trailing_zeros();
    let raw = (value & mask) >> shift;
    let bits = (mask >> shift).count_ones();
    if bits >= 8 {
        (raw >> (bits - 8)) as u8
    } else {
        (raw * 255 / ((1u32 << bits) - 1)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::VisualClass;

    fn mask_from_rows(width: u32, rows: &[&[bool]]) -> MaskBitmap {
        MaskBitmap {
            width,
            height: rows.len() as u32,
            bits: rows.concat(),
        }
    }

    fn test_visual(red_mask: u32, green_mask: u32, blue_mask: u32) -> Visualtype {
        Visualtype {
            visual_id: 0,
            class: VisualClass::TRUE_COLOR,
            bits_per_rgb_value: 8,
            colormap_entries: 256,
            red_mask,
            green_mask,
            blue_mask,
        }
    }

    fn rgb888_visual() -> Visualtype {
        test_visual(0x00ff_0000, 0x0000_ff00, 0x0000_00ff)
    }

    #[test]
    fn bitmap_decode_lsb_first() {
        // Row of 8 pixels in one byte: 0b0000_0101 = pixels 0 and 2 set.
        let mask = decode_bitmap(&[0b0000_0101], 8, 1, ImageOrder::LSB_FIRST, 8);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(mask.get(2, 0));
        assert!(!mask.get(7, 0));
    }

    #[test]
    fn bitmap_decode_msb_first() {
        let mask = decode_bitmap(&[0b1000_0001], 8, 1, ImageOrder::MSB_FIRST, 8);
        assert!(mask.get(0, 0));
        assert!(mask.get(7, 0));
        assert!(!mask.get(3, 0));
    }

    #[test]
    fn bitmap_decode_honors_scanline_padding() {
        // 2x2 bitmap with 32-bit padded rows: 4 bytes per row.
        let data = [0b01, 0, 0, 0, 0b10, 0, 0, 0];
        let mask = decode_bitmap(&data, 2, 2, ImageOrder::LSB_FIRST, 32);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(0, 1));
        assert!(mask.get(1, 1));
    }

    #[test]
    fn out_of_bounds_mask_lookups_are_clear() {
        let mask = mask_from_rows(1, &[&[true]]);
        assert!(mask.get(0, 0));
        assert!(!mask.get(1, 0));
        assert!(!mask.get(0, 1));
    }

    #[test]
    fn all_ones_mask_is_a_no_op() {
        let pixels = vec![0x11223344, 0x55667788, 0x99aabbcc, 0xddeeff00];
        let mut masked = PixelSurface::from_argb(2, 2, pixels.clone());
        let t = &[true, true];
        apply_mask(&mut masked, &mask_from_rows(2, &[t, t]));
        assert_eq!(masked.data(), pixels.as_slice());
    }

    #[test]
    fn clear_mask_bits_punch_transparent_holes() {
        let mut surface = PixelSurface::from_argb(2, 1, vec![0xffff_ffff, 0xffff_ffff]);
        apply_mask(&mut surface, &mask_from_rows(2, &[&[false, true]]));
        assert_eq!(surface.data(), &[0, 0xffff_ffff]);
    }

    #[test]
    fn bitmap_surface_is_opaque_black_on_transparent() {
        let surface = bitmap_to_surface(&mask_from_rows(2, &[&[true, false]]));
        assert_eq!(surface.data(), &[0xff00_0000, 0]);
    }

    #[test]
    fn zpixmap_decode_depth24_is_opaque() {
        // One 32bpp little-endian pixel: B=0x10, G=0x20, R=0x30, pad=0xAA.
        let data = [0x10, 0x20, 0x30, 0xaa];
        let surface = decode_zpixmap(
            &data,
            1,
            1,
            24,
            32,
            32,
            ImageOrder::LSB_FIRST,
            &rgb888_visual(),
        )
        .unwrap();
        assert_eq!(surface.data(), &[0xff30_2010]);
    }

    #[test]
    fn zpixmap_decode_depth32_keeps_alpha() {
        let data = [0x10, 0x20, 0x30, 0x40];
        let surface = decode_zpixmap(
            &data,
            1,
            1,
            32,
            32,
            32,
            ImageOrder::LSB_FIRST,
            &rgb888_visual(),
        )
        .unwrap();
        assert_eq!(surface.data(), &[0x4030_2010]);
    }

    #[test]
    fn zpixmap_decode_big_endian_pixels() {
        let data = [0x00, 0x30, 0x20, 0x10];
        let surface = decode_zpixmap(
            &data,
            1,
            1,
            24,
            32,
            32,
            ImageOrder::MSB_FIRST,
            &rgb888_visual(),
        )
        .unwrap();
        assert_eq!(surface.data(), &[0xff30_2010]);
    }

    #[test]
    fn zpixmap_decode_rgb565() {
        let visual = test_visual(0xf800, 0x07e0, 0x001f);
        // 0xffff = white in RGB565.
        let surface = decode_zpixmap(
            &[0xff, 0xff],
            1,
            1,
            16,
            16,
            16,
            ImageOrder::LSB_FIRST,
            &visual,
        )
        .unwrap();
        assert_eq!(surface.data(), &[0xffff_ffff]);
    }

    #[test]
    fn unsupported_pixel_size_is_an_error() {
        let result = decode_zpixmap(&[], 1, 1, 4, 4, 8, ImageOrder::LSB_FIRST, &rgb888_visual());
        assert!(matches!(result, Err(ExtractError::Protocol(_))));
    }
}
