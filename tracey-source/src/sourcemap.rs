//! ソースマップ（v3）の解析と位置変換

use crate::vlq::{decode_mappings, Mapping};
use crate::Result;
use base64::Engine;
use serde::Deserialize;
use std::sync::Arc;

/// `sourceMappingURL` コメントの接頭辞
const MAPPING_URL_MARKERS: [&str; 2] = ["//# sourceMappingURL=", "//@ sourceMappingURL="];

/// base64埋め込みソースマップの接頭辞
const DATA_URI_PREFIX: &str = "data:application/json";

/// ソースマップJSONの生の形
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: Option<u32>,
    #[serde(default)]
    sources: Vec<Option<String>>,
    #[serde(default)]
    source_root: Option<String>,
    #[serde(default)]
    sources_content: Vec<Option<String>>,
    #[serde(default)]
    mappings: String,
}

/// ソースマップの参照先
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapReference {
    /// data URIに埋め込まれたJSON
    Inline(String),
    /// 生成ファイルからの相対パスを解決したファイルパス
    Path(String),
}

/// 元ソース上の位置（1始まり）
#[derive(Debug, Clone)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    /// `sourcesContent` に含まれていた元ソース
    pub content: Option<Arc<str>>,
}

/// 解析済みソースマップ
#[derive(Debug)]
pub struct SourceMap {
    sources: Vec<String>,
    sources_content: Vec<Option<Arc<str>>>,
    lines: Vec<Vec<Mapping>>,
}

impl SourceMap {
    /// ソースマップJSONを解析する
    ///
    /// `map_path` はソースパスを解決する基準となるマップ自身のパス。
    pub fn parse(map_path: &str, json: &str) -> Result<Self> {
        let raw: RawSourceMap = serde_json::from_str(json)
            .map_err(|e| anyhow::anyhow!("Failed to parse source map JSON: {}", e))?;

        if let Some(version) = raw.version {
            if version != 3 {
                anyhow::bail!("Unsupported source map version {}", version);
            }
        }

        let base_dir = parent_dir(map_path);
        let root = raw.source_root.unwrap_or_default();

        let sources = raw
            .sources
            .into_iter()
            .map(|source| {
                let source = source.unwrap_or_default();
                let rooted = if root.is_empty() {
                    source
                } else {
                    format!("{}/{}", root.trim_end_matches('/'), source)
                };
                join_path(base_dir, &rooted)
            })
            .collect();

        let sources_content = raw
            .sources_content
            .into_iter()
            .map(|c| c.map(Arc::from))
            .collect();

        let lines = decode_mappings(&raw.mappings)?;

        Ok(Self {
            sources,
            sources_content,
            lines,
        })
    }

    /// 元ソースのパス一覧
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// 生成ファイル上の位置（1始まり）を元ソース上の位置に変換する
    ///
    /// 生成行上で、生成列が指定列以下のうち最大のセグメントを採用する。
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let segments = self.lines.get(line.checked_sub(1)? as usize)?;
        let column0 = column.saturating_sub(1);

        let mapping = segments
            .iter()
            .take_while(|m| m.generated_column <= column0)
            .last()
            .or_else(|| segments.first())?;

        let index = mapping.source? as usize;
        let source = self.sources.get(index)?.clone();
        let content = self.sources_content.get(index).cloned().flatten();

        Some(OriginalPosition {
            source,
            line: mapping.original_line + 1,
            column: mapping.original_column + 1,
            content,
        })
    }
}

/// ファイル末尾の `sourceMappingURL` コメントからURLを取り出す
pub fn find_mapping_url(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find_map(|line| {
        MAPPING_URL_MARKERS
            .iter()
            .find_map(|marker| line.strip_prefix(marker))
            .map(str::trim)
            .filter(|url| !url.is_empty())
    })
}

/// マッピングURLを、生成ファイルのパスを基準に参照先へ変換する
pub fn map_reference(file_path: &str, url: &str) -> Result<MapReference> {
    if let Some(rest) = url.strip_prefix(DATA_URI_PREFIX) {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Malformed data URI in sourceMappingURL"))?;

        if !meta.ends_with(";base64") {
            anyhow::bail!("Only base64 data URIs are supported");
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| anyhow::anyhow!("Invalid base64 in sourceMappingURL: {}", e))?;
        let json = String::from_utf8(bytes)
            .map_err(|e| anyhow::anyhow!("Source map is not UTF-8: {}", e))?;

        return Ok(MapReference::Inline(json));
    }

    Ok(MapReference::Path(join_path(parent_dir(file_path), url)))
}

/// パスの親ディレクトリ（区切りがなければ空文字列）
fn parent_dir(path: &str) -> &str {
    path.rfind('/').map(|i| &path[..i]).unwrap_or("")
}

/// ディレクトリと相対パスを連結し、`.` と `..` を畳み込む
///
/// 絶対パスやURLスキーム付きのパスはそのまま返す。
pub fn join_path(dir: &str, path: &str) -> String {
    if path.starts_with('/') || path.contains("://") || dir.is_empty() {
        return normalize(path);
    }
    normalize(&format!("{}/{}", dir, path))
}

fn normalize(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if matches!(parts.last(), Some(last) if *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            _ => parts.push(part),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"{
        "version": 3,
        "file": "bundle.min.js",
        "sources": ["src/app.js", "src/util.js"],
        "sourcesContent": ["let a = 1\nthrow new Error('boom')\n", null],
        "names": [],
        "mappings": "AAAA,UACA;ICAA"
    }"#;

    #[test]
    fn test_original_position_for() {
        let map = SourceMap::parse("/project/dist/bundle.min.js.map", MAP).unwrap();
        assert_eq!(map.sources(), &["/project/dist/src/app.js", "/project/dist/src/util.js"]);

        // 生成列10以降は2番目のセグメント（元の2行目）
        let pos = map.original_position_for(1, 12).unwrap();
        assert_eq!(pos.source, "/project/dist/src/app.js");
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 1);
        assert!(pos.content.unwrap().contains("boom"));

        // それより前は最初のセグメント
        let pos = map.original_position_for(1, 3).unwrap();
        assert_eq!(pos.line, 1);

        // 2行目は2番目のソース
        let pos = map.original_position_for(2, 5).unwrap();
        assert_eq!(pos.source, "/project/dist/src/util.js");
        assert!(pos.content.is_none());

        assert!(map.original_position_for(9, 1).is_none());
    }

    #[test]
    fn test_find_mapping_url() {
        let text = "function a(){}\n//# sourceMappingURL=a.min.js.map\n";
        assert_eq!(find_mapping_url(text), Some("a.min.js.map"));

        let legacy = "x()\n//@ sourceMappingURL=legacy.map";
        assert_eq!(find_mapping_url(legacy), Some("legacy.map"));

        assert_eq!(find_mapping_url("plain()"), None);
    }

    #[test]
    fn test_map_reference() {
        assert_eq!(
            map_reference("/a/b/c.js", "../maps/c.js.map").unwrap(),
            MapReference::Path("/a/maps/c.js.map".to_string())
        );

        // {"version":3} をbase64で埋め込んだもの
        let inline = map_reference("/a/c.js", "data:application/json;charset=utf-8;base64,eyJ2ZXJzaW9uIjozfQ==").unwrap();
        assert_eq!(inline, MapReference::Inline(r#"{"version":3}"#.to_string()));

        assert!(map_reference("/a/c.js", "data:application/json,{}").is_err());
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/a/b", "./c/d.js"), "/a/b/c/d.js");
        assert_eq!(join_path("/a/b", "../../../x.js"), "/x.js");
        assert_eq!(join_path("a", "../../x.js"), "../x.js");
        assert_eq!(join_path("/a", "/abs.js"), "/abs.js");
        assert_eq!(join_path("", "rel.js"), "rel.js");
    }
}
