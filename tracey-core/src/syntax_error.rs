//! 構文エラーからのエントリ合成
//!
//! 構文エラーは通常のスタックフレームを持たないため、
//! エラー自身の説明文（`file:line` / ソース行 / `^` の行）から
//! 疑似エントリを1つ作ります。

use crate::config::TraceConfig;
use crate::entry::Entry;
use crate::markers::SYNTAX_ERROR_CALLEE;
use crate::parse::parse_int;
use crate::thrown::ErrorLike;
use crate::trace::Trace;
use std::sync::Arc;
use tracey_source::nix_slashes;
use tracing::debug;

/// 解析時の構文エラー
///
/// `description` は次の形式の説明文:
///
/// ```text
/// /path/to/file.js:2
/// foo->bar ()
///     ^^
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxErrorReport {
    pub description: String,
    pub stack: Option<String>,
}

impl SyntaxErrorReport {
    /// 構文エラーを作成する
    pub fn new(description: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            description: description.into(),
            stack,
        }
    }
}

impl ErrorLike for SyntaxErrorReport {
    fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}

/// 説明文から疑似エントリを合成する（ファイルが取れなければ `None`）
pub fn synthesize_entry(description: &str) -> Option<Entry> {
    let mut lines = description.split('\n');
    let header = lines.next()?;
    let source_line = lines.next().unwrap_or_default();
    let caret_line = lines.next().unwrap_or_default();

    let (file, line) = header.rsplit_once(':')?;
    if file.is_empty() {
        return None;
    }

    // 列は1始まり。`^` の行がなければ0ではなく不明とする
    let column = caret_line
        .chars()
        .position(|c| c == '^')
        .and_then(|pos| u32::try_from(pos + 1).ok());

    Some(Entry {
        before_parse: header.to_string(),
        callee: SYNTAX_ERROR_CALLEE.to_string(),
        file: nix_slashes(file),
        line: parse_int(line),
        column,
        source_line: source_line.to_string(),
        syntax_error: true,
        ..Entry::default()
    })
}

impl Trace {
    /// 構文エラーからトレースを作成する
    pub fn from_syntax_error(report: &SyntaxErrorReport) -> Self {
        Self::from_syntax_error_with(Arc::new(TraceConfig::default()), report)
    }

    /// 設定を指定して構文エラーからトレースを作成する
    ///
    /// 合成エントリはスタックのフレームより前に置かれる。
    /// ブラウザモードでは説明文の形式が異なるため合成しない。
    pub fn from_syntax_error_with(config: Arc<TraceConfig>, report: &SyntaxErrorReport) -> Self {
        let trace = Self::from_error_with(Arc::clone(&config), report);

        if config.root.is_document() {
            return trace;
        }

        match synthesize_entry(&report.description) {
            Some(entry) => {
                let entry = config.extract_metadata(entry);
                Self::from_entries_with(config, [entry]).concat(&trace)
            }
            None => {
                debug!("No file in syntax error description, skipping synthetic entry");
                trace
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathRoot;

    const DESCRIPTION: &str = "/home/user/app/test_files/syntax_error.js:2\nfoo->bar ()\n    ^^\n\nSyntaxError: Unexpected token >";

    #[test]
    fn test_synthesize_entry() {
        let entry = synthesize_entry(DESCRIPTION).unwrap();
        assert_eq!(entry.file, "/home/user/app/test_files/syntax_error.js");
        assert_eq!(entry.line, Some(2));
        assert_eq!(entry.column, Some(5));
        assert_eq!(entry.source_line, "foo->bar ()");
        assert_eq!(entry.callee, "(syntax error)");
        assert!(entry.syntax_error);
    }

    #[test]
    fn test_synthesize_without_caret() {
        let entry = synthesize_entry("C:\\app\\bad.js:7\nlet = ;").unwrap();
        assert_eq!(entry.file, "C:/app/bad.js");
        assert_eq!(entry.line, Some(7));
        assert_eq!(entry.column, None);

        // 空白だけの行も `^` なしと同じ
        let entry = synthesize_entry("/app/bad.js:7\nlet = ;\n    \n").unwrap();
        assert_eq!(entry.column, None);

        // 先頭の `^` は列1
        let entry = synthesize_entry("/app/bad.js:7\nlet = ;\n^").unwrap();
        assert_eq!(entry.column, Some(1));
    }

    #[test]
    fn test_synthesize_without_file() {
        assert!(synthesize_entry("SyntaxError: Unexpected token").is_some_and(|e| e.file == "SyntaxError"));
        assert!(synthesize_entry("no colon here").is_none());
        assert!(synthesize_entry(":3\nx").is_none());
    }

    #[test]
    fn test_trace_from_syntax_error() {
        let config = Arc::new(TraceConfig::new().with_root(PathRoot::process("/home/user/app")));
        let report = SyntaxErrorReport::new(
            DESCRIPTION,
            Some("SyntaxError: Unexpected token >\n    at Module._compile (internal/modules/cjs/loader.js:723:23)".to_string()),
        );

        let trace = Trace::from_syntax_error_with(config, &report);
        assert_eq!(trace.len(), 2);

        let top = trace.at(0);
        assert!(top.syntax_error);
        assert_eq!(top.file_short, "test_files/syntax_error.js");
        assert_eq!(top.callee_short, "(syntax error)");
        assert_eq!(trace.at(1).callee, "Module._compile");
    }

    #[test]
    fn test_document_mode_skips_synthesis() {
        let config = Arc::new(TraceConfig::new().with_root(PathRoot::document("http://localhost/")));
        let report = SyntaxErrorReport::new(DESCRIPTION, None);
        assert!(Trace::from_syntax_error_with(config, &report).is_empty());
    }
}
