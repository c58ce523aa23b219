//! トレース処理で使う文字列定数

/// 範囲外アクセス時のプレースホルダ
pub const UNKNOWN: &str = "<???>";

/// 名前のない関数
pub const ANONYMOUS: &str = "<anonymous>";

/// 重複行を統合するときの区切り
pub const MERGE_ARROW: &str = " → ";

/// この行をクリーンなトレースから除外するコメント
pub const HIDE_MARKER: &str = "// @hide";

/// バンドラのランタイムコードを示す文字列（webpack）
pub const BUNDLER_RUNTIME_MARKERS: [&str; 2] = ["__webpack_require__", "/******/ ({"];

/// 構文エラーから合成したエントリの関数名
pub const SYNTAX_ERROR_CALLEE: &str = "(syntax error)";

/// 解決できない疑似パス（`<anonymous>` など）を示す文字
pub const UNRESOLVABLE_MARKER: char = '<';

/// 切り詰め時の省略記号
pub const ELLIPSIS: char = '…';
