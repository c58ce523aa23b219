//! ソース上の位置

use serde::Serialize;

/// ソース上の位置
///
/// `line` と `column` は1始まり。不明な場合は `None`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Location {
    /// 位置を作成する
    pub fn new(file: impl Into<String>, line: Option<u32>, column: Option<u32>) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// バックスラッシュのパス区切りをスラッシュに変換する
pub fn nix_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nix_slashes() {
        assert_eq!(nix_slashes(r"C:\projects\app\test.js"), "C:/projects/app/test.js");
        assert_eq!(nix_slashes("/already/unix.js"), "/already/unix.js");
    }
}
