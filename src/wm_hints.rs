//! The legacy icon source: the ICCCM `WM_HINTS` property.
//!
//! `WM_HINTS` carries a color icon pixmap and, optionally, a 1-bit mask
//! pixmap. Both are server-side resources; geometry for pixmap and mask is
//! requested in a pipelined pair (two cookies issued, then both replies
//! awaited) before any image data moves.

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt, Pixmap, Screen, Window};

use crate::error::ExtractError;
use crate::pixmap;
use crate::surface::{PixelSurface, Premultiplied};

const ICON_PIXMAP_HINT: u32 = 1 << 2;
const ICON_MASK_HINT: u32 = 1 << 5;

// Word positions in the WM_HINTS property (ICCCM 4.1.2.4).
const HINTS_FLAGS: usize = 0;
const HINTS_ICON_PIXMAP: usize = 3;
const HINTS_ICON_MASK: usize = 7;

/// The two fields of `WM_HINTS` this tool cares about.
struct IconHints {
    icon_pixmap: Option<Pixmap>,
    icon_mask: Option<Pixmap>,
}

/// Query `WM_HINTS` and build one composited icon from the advertised
/// pixmap, stenciled through the mask when one is advertised.
pub fn fetch(
    conn: &impl Connection,
    screen: &Screen,
    window: Window,
) -> Result<Option<PixelSurface<Premultiplied>>, ExtractError> {
    let reply = conn
        .get_property(
            false,
            window,
            AtomEnum::WM_HINTS,
            AtomEnum::WM_HINTS,
            0,
            16,
        )?
        .reply()?;

    if reply.type_ == u32::from(AtomEnum::NONE) {
        log::debug!("window {window:#x} has no WM_HINTS property");
        return Ok(None);
    }
    let words: Vec<u32> = match reply.value32() {
        Some(iter) => iter.collect(),
        None => return Ok(None),
    };

    let hints = parse_icon_hints(&words);
    let Some(icon_pixmap) = hints.icon_pixmap else {
        log::debug!("WM_HINTS carries no icon pixmap");
        return Ok(None);
    };

    // Pipelined geometry lookups: both requests leave before either reply
    // is read.
    let icon_geom_cookie = conn.get_geometry(icon_pixmap)?;
    let mask_geom_cookie = match hints.icon_mask {
        Some(mask) => Some(conn.get_geometry(mask)?),
        None => None,
    };
    let icon_geom = icon_geom_cookie
        .reply()
        .map_err(|_| ExtractError::GeometryUnavailable("icon pixmap"))?;
    let mask_geom = match mask_geom_cookie {
        Some(cookie) => Some(
            cookie
                .reply()
                .map_err(|_| ExtractError::GeometryUnavailable("icon mask"))?,
        ),
        None => None,
    };

    if icon_geom.width == 0 || icon_geom.height == 0 {
        return Ok(None);
    }

    let mut color = pixmap::fetch_color_surface(conn, screen, icon_pixmap, &icon_geom)?;

    if let (Some(mask_id), Some(geom)) = (hints.icon_mask, &mask_geom) {
        let mask = pixmap::fetch_bitmap(conn, mask_id, geom.width, geom.height)?;
        pixmap::apply_mask(&mut color, &mask);
    }

    log::debug!(
        "decoded {}x{} depth-{} WM_HINTS icon (mask: {})",
        icon_geom.width,
        icon_geom.height,
        icon_geom.depth,
        mask_geom.is_some()
    );
    Ok(Some(color.premultiply()))
}

/// Pull the icon pixmap and mask ids out of the raw property words. A hint
/// whose flag is unset, or whose resource id is zero, counts as absent.
fn parse_icon_hints(words: &[u32]) -> IconHints {
    let flags = words.get(HINTS_FLAGS).copied().unwrap_or(0);
    let field = |flag: u32, index: usize| {
        if flags & flag != 0 {
            words.get(index).copied().filter(|&id| id != 0)
        } else {
            None
        }
    };
    IconHints {
        icon_pixmap: field(ICON_PIXMAP_HINT, HINTS_ICON_PIXMAP),
        icon_mask: field(ICON_MASK_HINT, HINTS_ICON_MASK),
    }
}
