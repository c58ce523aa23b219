//! トレース処理の設定

use crate::classify::ThirdPartyPredicate;
use tracey_source::nix_slashes;
use tracing::warn;
use url::Url;

/// 相対パスを計算する基準
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRoot {
    /// プロセスのカレントディレクトリ（末尾は `/`）
    Process { cwd: String },
    /// ブラウザで開かれているドキュメントのURL
    Document { url: String },
}

impl PathRoot {
    /// カレントディレクトリを基準にする
    pub fn current_dir() -> Self {
        let cwd = match std::env::current_dir() {
            Ok(dir) => nix_slashes(&dir.to_string_lossy()),
            Err(e) => {
                warn!("Failed to get current directory: {}", e);
                String::new()
            }
        };
        Self::process(cwd)
    }

    /// 指定したディレクトリを基準にする
    pub fn process(cwd: impl Into<String>) -> Self {
        let mut cwd = cwd.into();
        if !cwd.ends_with('/') {
            cwd.push('/');
        }
        Self::Process { cwd }
    }

    /// ドキュメントURLを基準にする
    pub fn document(url: impl Into<String>) -> Self {
        Self::Document { url: url.into() }
    }

    /// ドキュメントのURL（プロセスモードでは `None`）
    pub fn page_url(&self) -> Option<&str> {
        match self {
            Self::Document { url } => Some(url),
            Self::Process { .. } => None,
        }
    }

    /// 現在のページのホスト名
    pub fn host(&self) -> Option<String> {
        let url = self.page_url()?;
        Url::parse(url).ok()?.host_str().map(str::to_string)
    }

    /// ブラウザ（ドキュメント）モードかどうか
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }
}

/// 表の各列の最大幅
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnWidths {
    pub callee: usize,
    pub file: usize,
    pub source_line: usize,
}

impl Default for ColumnWidths {
    fn default() -> Self {
        Self {
            callee: 30,
            file: 60,
            source_line: 80,
        }
    }
}

/// トレース処理の設定
///
/// すべての派生トレースに引き継がれる。
#[derive(Debug, Clone)]
pub struct TraceConfig {
    pub root: PathRoot,
    pub third_party: ThirdPartyPredicate,
    /// 短縮パスで順に1回ずつ取り除く接頭辞
    pub noise_prefixes: Vec<String>,
    /// 組み込みメソッドとみなす名前空間（例: `Array.reduce`）
    pub native_namespaces: Vec<String>,
    pub column_widths: ColumnWidths,
}

impl TraceConfig {
    /// 既定の設定を作成する
    pub fn new() -> Self {
        Self {
            root: PathRoot::current_dir(),
            third_party: ThirdPartyPredicate::default(),
            noise_prefixes: vec![
                "node_modules/".to_string(),
                "webpack/bootstrap/".to_string(),
                "__parcel_source_root/".to_string(),
            ],
            native_namespaces: vec!["Array".to_string()],
            column_widths: ColumnWidths::default(),
        }
    }

    /// 基準パスを設定する
    pub fn with_root(mut self, root: PathRoot) -> Self {
        self.root = root;
        self
    }

    /// サードパーティ判定を設定する
    pub fn with_third_party(mut self, predicate: ThirdPartyPredicate) -> Self {
        self.third_party = predicate;
        self
    }

    /// 表の列幅を設定する
    pub fn with_column_widths(mut self, widths: ColumnWidths) -> Self {
        self.column_widths = widths;
        self
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_root_trailing_slash() {
        assert_eq!(
            PathRoot::process("/home/user/app"),
            PathRoot::Process { cwd: "/home/user/app/".to_string() }
        );
        assert_eq!(PathRoot::process("/home/user/app/").page_url(), None);
    }

    #[test]
    fn test_document_root_host() {
        let root = PathRoot::document("http://localhost:8080/index.html");
        assert_eq!(root.page_url(), Some("http://localhost:8080/index.html"));
        assert_eq!(root.host().as_deref(), Some("localhost"));
        assert!(root.is_document());
        assert_eq!(PathRoot::process("/").host(), None);
    }
}
