//! 読み込み済みソースファイル

use crate::sourcemap::SourceMap;
use crate::SourceError;
use std::sync::Arc;

/// 読み込み済みソースファイル
///
/// 読み込みに失敗した場合も `error` を設定した値として表現する。
#[derive(Debug)]
pub struct SourceFile {
    /// 正規化済みのパス
    pub path: String,
    pub text: String,
    pub lines: Vec<String>,
    pub error: Option<SourceError>,
    /// 生成ファイルに付随するソースマップ
    pub source_map: Option<Arc<SourceMap>>,
}

impl SourceFile {
    /// テキストからソースファイルを作成する
    pub fn from_text(path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let lines = text.lines().map(str::to_string).collect();
        Self {
            path: path.into(),
            text,
            lines,
            error: None,
            source_map: None,
        }
    }

    /// 読み込みに失敗したソースファイルを作成する
    pub fn failed(path: impl Into<String>, error: SourceError) -> Self {
        Self {
            path: path.into(),
            text: String::new(),
            lines: Vec::new(),
            error: Some(error),
            source_map: None,
        }
    }

    /// ソースマップを付与する
    pub fn with_source_map(mut self, map: Arc<SourceMap>) -> Self {
        self.source_map = Some(map);
        self
    }

    /// 1始まりの行番号でソース行を取得する
    pub fn line(&self, line: u32) -> Option<&str> {
        let index = line.checked_sub(1)? as usize;
        self.lines.get(index).map(String::as_str)
    }
}
