//! ソース解決のエラー

use serde::{Serialize, Serializer};
use thiserror::Error;

/// ソース解決のエラー
///
/// エントリにデータとして保持されるため `Clone` を実装する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// ファイルを読み込めない
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
    /// ソースマップを解釈できない
    #[error("Invalid source map for {path}: {message}")]
    SourceMap { path: String, message: String },
    /// 非同期の読み込みタスクが失敗した
    #[error("Source task failed: {0}")]
    Task(String),
}

impl SourceError {
    /// I/Oエラーから作成する
    pub fn io(path: &str, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl Serialize for SourceError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
