//! スタックトレースのエントリ

use crate::markers::UNKNOWN;
use serde::Serialize;
use std::sync::Arc;
use tracey_source::{Location, SourceError, SourceFile};

/// スタックトレースの1フレーム（または合成された疑似フレーム）
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// 解析前の行（診断用）
    pub before_parse: String,
    /// 完全修飾された関数名（不明なら空文字列）
    pub callee: String,
    /// `callee` の最後のセグメント
    pub callee_short: String,
    /// ページ自身のURLで実行されたフレームかどうか（ブラウザのみ）
    pub index: bool,
    /// ネイティブ（組み込み）コードかどうか
    pub native: bool,

    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,

    /// ルートからの相対パス
    pub file_relative: String,
    /// ノイズとなる接頭辞を取り除いた相対パス
    pub file_short: String,
    pub file_name: String,
    pub third_party: bool,
    /// ページとは異なるホストのURLの場合、そのホスト名
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_domain: Option<String>,

    /// ソース行に `// @hide` が付いている
    pub hide: bool,
    /// 解決済みのソース行（未解決なら空文字列）
    pub source_line: String,
    #[serde(skip)]
    pub source_file: Option<Arc<SourceFile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SourceError>,
    /// 構文エラーから合成されたエントリ
    pub syntax_error: bool,
}

impl Entry {
    /// 位置だけを持つエントリを作成する
    pub fn new(file: impl Into<String>, line: Option<u32>, column: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
            ..Self::default()
        }
    }

    /// 関数名を設定する
    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = callee.into();
        self
    }

    /// 範囲外アクセス時に返すプレースホルダ
    pub fn placeholder() -> Self {
        Self {
            callee: UNKNOWN.to_string(),
            file: UNKNOWN.to_string(),
            line: Some(0),
            column: Some(0),
            ..Self::default()
        }
    }

    /// 位置を取得する
    pub fn location(&self) -> Location {
        Location::new(self.file.clone(), self.line, self.column)
    }

    /// ファイル・行・列が等しいかどうか
    pub fn same_location(&self, other: &Entry) -> bool {
        self.file == other.file && self.line == other.line && self.column == other.column
    }
}
