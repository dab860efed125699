//! The modern icon source: the `_NET_WM_ICON` window property (EWMH).
//!
//! The property value is a flat CARDINAL array holding any number of icons
//! packed back-to-back, each as `width, height, width*height ARGB words`.
//! One left-to-right pass validates every record against the remaining
//! length and keeps the best match for the preferred size.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Window};

use crate::atoms::Atoms;
use crate::error::ExtractError;
use crate::surface::{PixelSurface, Premultiplied, Straight};

/// One icon image inside the property blob. Borrows the blob; lives only
/// for the duration of the selection pass.
struct IconRecord<'a> {
    width: u32,
    height: u32,
    pixels: &'a [u32],
}

/// Query `_NET_WM_ICON` and return the best-matching icon, premultiplied.
///
/// A missing property, or one containing only empty or truncated records,
/// is `Ok(None)`. A property that is not 32-bit CARDINAL data is malformed.
pub fn fetch(
    conn: &impl Connection,
    atoms: &Atoms,
    window: Window,
    preferred_size: u32,
) -> Result<Option<PixelSurface<Premultiplied>>, ExtractError> {
    let reply = conn
        .get_property(
            false,
            window,
            atoms._NET_WM_ICON,
            AtomEnum::CARDINAL,
            0,
            u32::MAX,
        )?
        .reply()?;

    if reply.type_ == u32::from(AtomEnum::NONE) {
        log::debug!("window {window:#x} has no _NET_WM_ICON property");
        return Ok(None);
    }
    if reply.type_ != u32::from(AtomEnum::CARDINAL) || reply.format != 32 {
        return Err(ExtractError::MalformedProperty(
            "expected 32-bit CARDINAL data",
        ));
    }
    let words: Vec<u32> = match reply.value32() {
        Some(iter) => iter.collect(),
        None => {
            return Err(ExtractError::MalformedProperty(
                "value not readable as 32-bit units",
            ))
        }
    };

    let best = select_best(&words, preferred_size).map(|record| {
        log::debug!(
            "selected {}x{} icon for preferred size {preferred_size}",
            record.width,
            record.height
        );
        PixelSurface::<Straight>::from_argb(record.width, record.height, record.pixels.to_vec())
            .premultiply()
    });
    Ok(best)
}

/// Walk the blob once and pick the icon that best matches `preferred_size`.
///
/// When no exact match exists, the closest bigger size wins over the
/// closest smaller one. Records whose declared pixel count does not fit in
/// the remaining buffer end the pass; whatever candidate was found before
/// that point is still returned.
fn select_best(words: &[u32], preferred_size: u32) -> Option<IconRecord<'_>> {
    let mut best: Option<IconRecord<'_>> = None;
    let mut best_size: u32 = 0;
    let mut offset: usize = 0;

    while words.len() - offset >= 2 {
        let width = words[offset];
        let height = words[offset + 1];

        // Widened multiply so adversarial dimensions cannot wrap around.
        let declared_pixels = u64::from(width) * u64::from(height);
        let remaining = (words.len() - offset - 2) as u64;
        if declared_pixels > remaining {
            break;
        }

        let size = width.max(height);
        let empty = width == 0 || height == 0;
        let best_too_small = best_size < preferred_size;
        let best_too_large = best_size > preferred_size;
        let better_because_bigger = best_too_small && size > best_size;
        let better_because_smaller =
            best_too_large && size >= preferred_size && size < best_size;

        if !empty && (best.is_none() || better_because_bigger || better_because_smaller) {
            let pixels = &words[offset + 2..offset + 2 + declared_pixels as usize];
            best = Some(IconRecord {
                width,
                height,
                pixels,
            });
            best_size = size;
        }

        offset += 2 + declared_pixels as usize;
    }

    best
}
