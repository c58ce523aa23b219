//! 現在のスレッドのスタックトレース取得
//!
//! `backtrace` でフレームを列挙し、シンボル名をデマングルしてエントリにします。
//! トレース取得処理自身のフレームは取り除きます。

use crate::entry::Entry;
use backtrace::{Backtrace, BacktraceSymbol};
use tracey_source::nix_slashes;
use tracing::debug;

/// このフレーム以前（取得処理の内部）は結果に含めない
const CAPTURE_MARKERS: [&str; 2] = [
    "tracey_core::trace::Trace::capture",
    "<tracey_core::trace::Trace>::capture",
];

/// `Trace` を経由せずに呼ばれた場合の境界
const FRAMES_MARKER: &str = "tracey_core::capture::current_frames";

/// 呼び出し元から順にフレームを取得する
#[inline(never)]
pub(crate) fn current_frames() -> Vec<Entry> {
    let backtrace = Backtrace::new();

    let frames: Vec<Entry> = backtrace
        .frames()
        .iter()
        .flat_map(|frame| frame.symbols())
        .map(symbol_entry)
        .collect();

    let start = frames
        .iter()
        .rposition(|entry| CAPTURE_MARKERS.iter().any(|m| entry.callee.starts_with(m)))
        .or_else(|| {
            debug!("Capture frame not found, skipping up to the frame collector");
            frames.iter().rposition(|entry| entry.callee.starts_with(FRAMES_MARKER))
        })
        .map_or(0, |pos| pos + 1);

    frames.into_iter().skip(start).collect()
}

/// シンボル情報をエントリに変換する
fn symbol_entry(symbol: &BacktraceSymbol) -> Entry {
    let callee = symbol.name().map(|name| match name.as_str() {
        Some(raw) => format!("{:#}", rustc_demangle::demangle(raw)),
        None => name.to_string(),
    });
    let callee = callee.unwrap_or_default();

    let file = symbol
        .filename()
        .map(|path| nix_slashes(&path.to_string_lossy()))
        .unwrap_or_default();
    let line = symbol.lineno();
    let column = symbol.colno();

    let before_parse = if file.is_empty() {
        format!("at {}", callee)
    } else {
        format!(
            "at {} ({}:{}:{})",
            callee,
            file,
            line.unwrap_or(0),
            column.unwrap_or(0)
        )
    };

    Entry {
        before_parse,
        callee_short: callee.rsplit("::").next().unwrap_or_default().to_string(),
        native: file.is_empty(),
        callee,
        file,
        line,
        column,
        ..Entry::default()
    }
}
