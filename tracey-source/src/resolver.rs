//! 位置からソース行への解決
//!
//! ファイルシステムから読み込み、ソースマップがあれば元ソースまで辿ります。
//! 同期版（`std::fs`）と非同期版（`tokio::fs`）の両方を提供します。

use crate::cache::SourceCache;
use crate::sourcemap::{find_mapping_url, map_reference, MapReference, SourceMap};
use crate::{Location, SourceError, SourceFile};
use std::future::Future;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

/// ソースマップを辿る最大の深さ
const MAX_MAP_DEPTH: usize = 8;

/// 解決結果
#[derive(Debug, Clone, Default)]
pub struct ResolvedLocation {
    /// 解決後のファイル（ソースマップ経由なら元ソースのパス）
    pub file: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// ソース行のテキスト（解決できなければ空文字列）
    pub source_line: String,
    pub source_file: Option<Arc<SourceFile>>,
    pub error: Option<SourceError>,
}

/// 同期のソース解決
///
/// ファイルが存在しない・読めない場合はパニックせず `error` を設定する。
pub trait SourceResolver {
    fn resolve(&self, location: &Location) -> ResolvedLocation;
}

/// 非同期のソース解決
///
/// `Err` は読み込み途中の失敗を表す。呼び出し側がエントリのエラーに変換する。
pub trait AsyncSourceResolver {
    fn resolve_async(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<ResolvedLocation, SourceError>>;
}

/// 1ファイル分の解決ステップ
enum Step {
    /// 解決完了
    Done(ResolvedLocation),
    /// ソースマップが指す元ソースへ進む
    Follow {
        location: Location,
        content: Option<Arc<str>>,
    },
}

/// ファイルシステムからソースを読み込むリゾルバ
#[derive(Debug, Default)]
pub struct FsSourceResolver {
    cache: SourceCache,
}

static SHARED: LazyLock<FsSourceResolver> = LazyLock::new(FsSourceResolver::new);

/// プロセス全体で共有されるリゾルバを取得する
pub fn shared() -> &'static FsSourceResolver {
    &SHARED
}

impl FsSourceResolver {
    /// 空のキャッシュを持つリゾルバを作成する
    pub fn new() -> Self {
        Self {
            cache: SourceCache::new(),
        }
    }

    /// キャッシュへの参照を取得
    pub fn cache(&self) -> &SourceCache {
        &self.cache
    }

    /// キャッシュをリセットする（テストの分離用）
    pub fn reset_cache(&self) {
        self.cache.reset();
    }

    /// ファイルを読み込む（キャッシュ済みならそれを返す）
    pub fn file(&self, path: &str) -> Arc<SourceFile> {
        self.cache.get_or_load(path, || load_file(path))
    }

    /// ファイルを非同期で読み込む
    pub async fn file_async(&self, path: &str) -> Result<Arc<SourceFile>, SourceError> {
        if let Some(file) = self.cache.get(path) {
            return Ok(file);
        }
        let file = load_file_async(path).await?;
        Ok(self.cache.insert(file))
    }

    /// `sourcesContent` の元ソースをキャッシュに登録する
    fn remember_content(&self, path: &str, content: Option<Arc<str>>) {
        if let Some(content) = content {
            if self.cache.get(path).is_none() {
                self.cache.insert(SourceFile::from_text(path, content.as_ref()));
            }
        }
    }
}

impl SourceResolver for FsSourceResolver {
    fn resolve(&self, location: &Location) -> ResolvedLocation {
        let mut location = location.clone();

        for _ in 0..MAX_MAP_DEPTH {
            let file = self.file(&location.file);
            match step(&file, &location) {
                Step::Done(resolved) => return resolved,
                Step::Follow { location: next, content } => {
                    debug!("Following source map {}:{:?} -> {}:{:?}", location.file, location.line, next.file, next.line);
                    self.remember_content(&next.file, content);
                    location = next;
                }
            }
        }

        let file = self.file(&location.file);
        lookup(&file, &location)
    }
}

impl AsyncSourceResolver for FsSourceResolver {
    async fn resolve_async(&self, location: &Location) -> Result<ResolvedLocation, SourceError> {
        let mut location = location.clone();

        for _ in 0..MAX_MAP_DEPTH {
            let file = self.file_async(&location.file).await?;
            match step(&file, &location) {
                Step::Done(resolved) => return Ok(resolved),
                Step::Follow { location: next, content } => {
                    debug!("Following source map {}:{:?} -> {}:{:?}", location.file, location.line, next.file, next.line);
                    self.remember_content(&next.file, content);
                    location = next;
                }
            }
        }

        let file = self.file_async(&location.file).await?;
        Ok(lookup(&file, &location))
    }
}

/// 読み込み済みファイルに対して1ステップ解決する
fn step(file: &Arc<SourceFile>, location: &Location) -> Step {
    if file.error.is_none() {
        if let (Some(map), Some(line)) = (&file.source_map, location.line) {
            if let Some(pos) = map.original_position_for(line, location.column.unwrap_or(1)) {
                return Step::Follow {
                    location: Location::new(pos.source, Some(pos.line), Some(pos.column)),
                    content: pos.content,
                };
            }
        }
    }

    Step::Done(lookup(file, location))
}

/// ソースマップを考慮せずに行を取得する
fn lookup(file: &Arc<SourceFile>, location: &Location) -> ResolvedLocation {
    if let Some(error) = &file.error {
        return ResolvedLocation {
            file: location.file.clone(),
            line: location.line,
            column: location.column,
            error: Some(error.clone()),
            ..ResolvedLocation::default()
        };
    }

    let source_line = location
        .line
        .and_then(|line| file.line(line))
        .unwrap_or_default()
        .to_string();

    ResolvedLocation {
        file: file.path.clone(),
        line: location.line,
        column: location.column,
        source_line,
        source_file: Some(Arc::clone(file)),
        error: None,
    }
}

/// `file://` URLをファイルシステムのパスに変換する
fn fs_path(path: &str) -> &str {
    path.strip_prefix("file://").unwrap_or(path)
}

/// ファイルを同期で読み込み、ソースマップがあれば付与する
fn load_file(path: &str) -> SourceFile {
    let text = match std::fs::read_to_string(fs_path(path)) {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read source file '{}': {}", path, e);
            return SourceFile::failed(path, SourceError::io(path, &e));
        }
    };
    debug!("Loaded source file '{}' ({} bytes)", path, text.len());

    let file = SourceFile::from_text(path, text);
    let Some(url) = find_mapping_url(&file.text) else {
        return file;
    };

    let map = map_reference(path, url).and_then(|reference| match reference {
        MapReference::Inline(json) => SourceMap::parse(path, &json),
        MapReference::Path(map_path) => {
            let json = std::fs::read_to_string(fs_path(&map_path))
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", map_path, e))?;
            SourceMap::parse(&map_path, &json)
        }
    });

    attach_map(file, map)
}

/// ファイルを非同期で読み込み、ソースマップがあれば付与する
///
/// ソースマップJSONの解析はブロッキングスレッドで行う。
async fn load_file_async(path: &str) -> Result<SourceFile, SourceError> {
    let text = match tokio::fs::read_to_string(fs_path(path)).await {
        Ok(text) => text,
        Err(e) => {
            debug!("Failed to read source file '{}': {}", path, e);
            return Ok(SourceFile::failed(path, SourceError::io(path, &e)));
        }
    };
    debug!("Loaded source file '{}' ({} bytes)", path, text.len());

    let file = SourceFile::from_text(path, text);
    let Some(url) = find_mapping_url(&file.text) else {
        return Ok(file);
    };

    let (map_path, json) = match map_reference(path, url) {
        Ok(MapReference::Inline(json)) => (path.to_string(), json),
        Ok(MapReference::Path(map_path)) => match tokio::fs::read_to_string(fs_path(&map_path)).await {
            Ok(json) => (map_path, json),
            Err(e) => {
                let err = anyhow::anyhow!("Failed to read {}: {}", map_path, e);
                return Ok(attach_map(file, Err(err)));
            }
        },
        Err(e) => return Ok(attach_map(file, Err(e))),
    };

    let map = tokio::task::spawn_blocking(move || SourceMap::parse(&map_path, &json))
        .await
        .map_err(|e| SourceError::Task(e.to_string()))?;

    Ok(attach_map(file, map))
}

/// ソースマップの読み込み結果を付与する（失敗時はマップなしで扱う）
fn attach_map(file: SourceFile, map: crate::Result<SourceMap>) -> SourceFile {
    match map {
        Ok(map) => {
            debug!("Attached source map to '{}' ({} sources)", file.path, map.sources().len());
            file.with_source_map(Arc::new(map))
        }
        Err(e) => {
            warn!("Ignoring source map for '{}': {}", file.path, e);
            file
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_sets_error() {
        let resolver = FsSourceResolver::new();
        let resolved = resolver.resolve(&Location::new("^___^", Some(1), Some(1)));

        assert_eq!(resolved.source_line, "");
        assert!(matches!(resolved.error, Some(SourceError::Io { .. })));
        assert!(resolved.source_file.is_none());

        // 失敗もキャッシュされる
        assert_eq!(resolver.cache().len(), 1);
        resolver.reset_cache();
        assert!(resolver.cache().is_empty());
    }

    #[test]
    fn test_lookup_without_line() {
        let file = Arc::new(SourceFile::from_text("a.js", "one\ntwo"));
        let resolved = lookup(&file, &Location::new("a.js", None, None));
        assert_eq!(resolved.source_line, "");
        assert!(resolved.source_file.is_some());
        assert!(resolved.error.is_none());
    }

    #[test]
    fn test_fs_path() {
        assert_eq!(fs_path("file:///tmp/a.js"), "/tmp/a.js");
        assert_eq!(fs_path("/tmp/a.js"), "/tmp/a.js");
    }
}
