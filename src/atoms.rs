//! Interned atom table.
//!
//! All atom lookups are issued in one batch right after connecting and the
//! replies resolved once; the table then lives for the whole (one-shot)
//! process. `WM_HINTS` is predefined by the core protocol and needs no
//! interning.

x11rb::atom_manager! {
    pub Atoms:
    AtomsCookie {
        _NET_WM_ICON,
    }
}
