mod atoms;
mod error;
mod net_wm_icon;
mod output;
mod pixmap;
mod surface;
mod wm_hints;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use x11rb::connection::Connection;

use atoms::Atoms;
use error::ExtractError;
use surface::{PixelSurface, Premultiplied};

const DEFAULT_NET_WM_ICON_FILE: &str = "net_wm_hints-icon.png";
const DEFAULT_WM_HINTS_FILE: &str = "wm_hints-icon.png";

/// Extract a window's icon to a PNG file.
///
/// Queries both the EWMH `_NET_WM_ICON` property and the ICCCM `WM_HINTS`
/// pixmap; each source that yields an icon is written to its own file.
#[derive(Parser)]
#[command(name = "xwin-icon", version)]
struct Cli {
    /// X window identifier, 0x-prefixed hex or decimal
    window: String,

    /// Preferred icon size when _NET_WM_ICON offers several
    #[arg(short, long, default_value_t = 64)]
    size: u32,

    /// Which icon source(s) to query
    #[arg(long, value_enum, default_value_t = Source::Both)]
    source: Source,

    /// Output file; only meaningful with a single --source
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Both,
    NetWmIcon,
    WmHints,
}

fn main() -> ExitCode {
    // Invalid usage exits 1, matching the id/connection failures below;
    // --help and --version stay successful.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code: u8 = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            log::error!("No icon found for window {}", cli.window);
            ExitCode::from(2)
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<bool> {
    if cli.output.is_some() && cli.source == Source::Both {
        anyhow::bail!("--output requires picking one source (--source net-wm-icon or wm-hints)");
    }

    let window = parse_xid(&cli.window)
        .with_context(|| format!("Invalid window id format: {}", cli.window))?;

    let (conn, screen_num) = x11rb::connect(None).context("Failed to open display")?;
    let screen = &conn.setup().roots[screen_num];
    let atoms = Atoms::new(&conn)?
        .reply()
        .context("Failed to intern atoms")?;

    let mut found_some_icon = false;

    if cli.source != Source::NetWmIcon {
        let result = wm_hints::fetch(&conn, screen, window);
        if emit(result, "WM_HINTS", DEFAULT_WM_HINTS_FILE, cli)? {
            found_some_icon = true;
        }
    }

    if cli.source != Source::WmHints {
        let result = net_wm_icon::fetch(&conn, &atoms, window, cli.size);
        if emit(result, "_NET_WM_ICON", DEFAULT_NET_WM_ICON_FILE, cli)? {
            found_some_icon = true;
        }
    }

    Ok(found_some_icon)
}

/// Write one path's icon, if it produced one. Path-local errors are
/// demoted to "nothing found" so the other source still gets its chance;
/// an icon that was found but cannot be written is a hard failure.
fn emit(
    result: Result<Option<PixelSurface<Premultiplied>>, ExtractError>,
    source_name: &str,
    default_file: &str,
    cli: &Cli,
) -> anyhow::Result<bool> {
    let surface = match result {
        Ok(Some(surface)) => surface,
        Ok(None) => return Ok(false),
        Err(err) => {
            log::warn!("{source_name} icon unavailable: {err}");
            return Ok(false);
        }
    };

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(default_file));
    output::write_png(&surface, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    log::info!("Found {source_name} icon ({})", path.display());
    Ok(true)
}

/// Accepts `0x`-prefixed hex or plain decimal; zero is not a valid window.
fn parse_xid(id: &str) -> Option<u32> {
    let xid = match id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => id.parse().ok()?,
    };
    (xid != 0).then_some(xid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_xid_accepts_hex_and_decimal() {
        assert_eq!(parse_xid("0x1e00003"), Some(0x1e00003));
        assert_eq!(parse_xid("0X1E00003"), Some(0x1e00003));
        assert_eq!(parse_xid("31457283"), Some(31457283));
    }

    #[test]
    fn parse_xid_rejects_garbage_and_zero() {
        assert_eq!(parse_xid(""), None);
        assert_eq!(parse_xid("zebra"), None);
        assert_eq!(parse_xid("0xzz"), None);
        assert_eq!(parse_xid("0"), None);
        assert_eq!(parse_xid("0x0"), None);
        assert_eq!(parse_xid("-5"), None);
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["xwin-icon", "0x1e00003"]).unwrap();
        assert_eq!(cli.size, 64);
        assert!(cli.source == Source::Both);
        assert!(cli.output.is_none());
    }

    #[test]
    fn missing_window_id_is_a_usage_error() {
        assert!(Cli::try_parse_from(["xwin-icon"]).is_err());
    }
}
