//! スタックトレースのコレクション
//!
//! `Trace` はエントリの順序付き列と設定を持ちます。
//! すべての変換は元のトレースを変更せず、新しいトレースを返します。

use crate::capture::current_frames;
use crate::config::TraceConfig;
use crate::entry::Entry;
use crate::markers::{
    ANONYMOUS, BUNDLER_RUNTIME_MARKERS, HIDE_MARKER, MERGE_ARROW, UNRESOLVABLE_MARKER,
};
use crate::parse::raw_parse;
use crate::partition::partition;
use crate::thrown::ErrorLike;
use futures::future::join_all;
use std::fmt;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;
use tracey_source::{nix_slashes, AsyncSourceResolver, ResolvedLocation, SourceResolver};
use tracing::debug;

/// スタックトレース
#[derive(Debug, Clone, Default)]
pub struct Trace {
    items: Vec<Entry>,
    config: Arc<TraceConfig>,
}

impl Trace {
    /// 現在のスタックを取得する（呼び出し元のフレームから始まる）
    #[inline(never)]
    pub fn capture() -> Self {
        Self::capture_with(Arc::new(TraceConfig::default()), 0)
    }

    /// 設定を指定して現在のスタックを取得する
    ///
    /// `skip` は呼び出し元のフレームからさらに読み飛ばす数。
    #[inline(never)]
    pub fn capture_with(config: Arc<TraceConfig>, skip: usize) -> Self {
        let items = current_frames()
            .into_iter()
            .skip(skip)
            .map(|entry| config.extract_metadata(entry))
            .collect();
        Self { items, config }
    }

    /// トレース文字列から作成する
    pub fn from_text(text: &str) -> Self {
        Self::from_text_with(Arc::new(TraceConfig::default()), text, 0)
    }

    /// 設定と読み飛ばすフレーム数を指定してトレース文字列から作成する
    pub fn from_text_with(config: Arc<TraceConfig>, text: &str, skip: usize) -> Self {
        let items = raw_parse(text, &config)
            .into_iter()
            .skip(skip)
            .map(|entry| config.extract_metadata(entry))
            .collect();
        Self { items, config }
    }

    /// エラーのスタックトレースから作成する（スタックがなければ空）
    pub fn from_error(error: &(impl ErrorLike + ?Sized)) -> Self {
        Self::from_error_with(Arc::new(TraceConfig::default()), error)
    }

    /// 設定を指定してエラーから作成する
    pub fn from_error_with(config: Arc<TraceConfig>, error: &(impl ErrorLike + ?Sized)) -> Self {
        Self::from_text_with(config, error.stack().unwrap_or_default(), 0)
    }

    /// 作成済みのエントリをそのまま採用する（再解析やメタデータ導出はしない）
    pub fn from_entries(entries: impl IntoIterator<Item = Entry>) -> Self {
        Self::from_entries_with(Arc::new(TraceConfig::default()), entries)
    }

    /// 設定を指定して作成済みのエントリを採用する
    pub fn from_entries_with(config: Arc<TraceConfig>, entries: impl IntoIterator<Item = Entry>) -> Self {
        Self {
            items: entries.into_iter().collect(),
            config,
        }
    }

    /// 同じ設定を引き継いだトレースを作る
    fn derive(&self, items: Vec<Entry>) -> Self {
        Self {
            items,
            config: Arc::clone(&self.config),
        }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn items(&self) -> &[Entry] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Entry> {
        self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.items.get(index)
    }

    /// 指定位置のエントリ（範囲外ならプレースホルダ）
    pub fn at(&self, index: usize) -> Entry {
        self.items
            .get(index)
            .cloned()
            .unwrap_or_else(Entry::placeholder)
    }

    /// エントリのソース行を解決する
    ///
    /// 解決済み、エラー済み、`<anonymous>` のような疑似パスはそのまま返す。
    /// ファイルを読めなければ `error` を設定し、ソース行は空にする。
    pub fn with_source(&self, entry: &Entry, resolver: &impl SourceResolver) -> Entry {
        if should_skip(entry) {
            return entry.clone();
        }

        let resolved = resolver.resolve(&entry.location());
        self.merge_resolved(entry, resolved)
    }

    /// 指定位置のエントリのソース行を解決する
    pub fn with_source_at(&self, index: usize, resolver: &impl SourceResolver) -> Option<Entry> {
        self.items
            .get(index)
            .map(|entry| self.with_source(entry, resolver))
    }

    /// エントリのソース行を非同期で解決する
    pub async fn with_source_async(&self, entry: &Entry, resolver: &impl AsyncSourceResolver) -> Entry {
        if should_skip(entry) {
            return entry.clone();
        }

        match resolver.resolve_async(&entry.location()).await {
            Ok(resolved) => self.merge_resolved(entry, resolved),
            Err(error) => {
                debug!("Failed to resolve '{}': {}", entry.file, error);
                self.merge_resolved(
                    entry,
                    ResolvedLocation {
                        error: Some(error),
                        ..ResolvedLocation::default()
                    },
                )
            }
        }
    }

    /// 指定位置のエントリのソース行を非同期で解決する
    pub async fn with_source_async_at(
        &self,
        index: usize,
        resolver: &impl AsyncSourceResolver,
    ) -> Option<Entry> {
        match self.items.get(index) {
            Some(entry) => Some(self.with_source_async(entry, resolver).await),
            None => None,
        }
    }

    /// すべてのエントリのソース行を解決する
    pub fn with_sources(&self, resolver: &impl SourceResolver) -> Self {
        let items = self
            .items
            .iter()
            .map(|entry| self.with_source(entry, resolver))
            .collect();
        self.derive(items)
    }

    /// すべてのエントリのソース行を並行して解決する
    ///
    /// 1つのエントリの失敗は他のエントリに影響しない。
    pub async fn with_sources_async(&self, resolver: &impl AsyncSourceResolver) -> Self {
        let items = join_all(
            self.items
                .iter()
                .map(|entry| self.with_source_async(entry, resolver)),
        )
        .await;
        self.derive(items)
    }

    /// 解決結果をエントリに反映した新しいエントリを返す
    fn merge_resolved(&self, entry: &Entry, resolved: ResolvedLocation) -> Entry {
        let mut merged = entry.clone();

        let Some(source_file) = resolved.source_file else {
            merged.error = resolved.error;
            merged.source_line = String::new();
            return merged;
        };

        // ソースマップ経由で別のファイルになることがあるため再導出する
        merged.file = nix_slashes(&resolved.file);
        merged.line = resolved.line;
        merged.column = resolved.column;
        let mut merged = self.config.extract_metadata(merged);

        merged.source_file = Some(source_file);
        merged.error = None;
        merged.source_line = resolved.source_line;

        if merged.source_line.contains(HIDE_MARKER) {
            merged.source_line = merged.source_line.replacen(HIDE_MARKER, "", 1);
            merged.hide = true;
        }

        if BUNDLER_RUNTIME_MARKERS
            .iter()
            .any(|marker| merged.source_line.contains(marker))
        {
            merged.third_party = true;
        }

        merged
    }

    /// 同じ (ファイル, 行) の連続するエントリを1つに統合する
    ///
    /// 関数名は `a → b` のように連結される。
    pub fn merge_repeated_lines(&self) -> Self {
        let groups = partition(self.items.iter().cloned(), |entry| {
            (entry.file.clone(), entry.line)
        });

        let items = groups
            .into_iter()
            .filter_map(|group| {
                let mut entries = group.items.into_iter();
                let first = entries.next()?;
                Some(entries.fold(first, |mut memo, entry| {
                    memo.callee = join_callee(&memo.callee, &entry.callee);
                    memo.callee_short = join_callee(&memo.callee_short, &entry.callee_short);
                    memo
                }))
            })
            .collect();

        self.derive(items)
    }

    /// ソース行を解決し、重複行を統合し、不要なフレームを取り除く
    pub fn clean(&self, resolver: &impl SourceResolver) -> Self {
        self.with_sources(resolver)
            .merge_repeated_lines()
            .filter(Self::is_clean)
    }

    /// `clean` の非同期版
    pub async fn clean_async(&self, resolver: &impl AsyncSourceResolver) -> Self {
        self.with_sources_async(resolver)
            .await
            .merge_repeated_lines()
            .filter(Self::is_clean)
    }

    /// クリーンなトレースに残すエントリかどうか（先頭は常に残す）
    pub fn is_clean(entry: &Entry, index: usize) -> bool {
        index == 0 || !(entry.third_party || entry.hide || entry.native)
    }

    pub fn map(&self, mut f: impl FnMut(Entry, usize) -> Entry) -> Self {
        let items = self
            .items
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, entry)| f(entry, i))
            .collect();
        self.derive(items)
    }

    pub fn filter(&self, mut f: impl FnMut(&Entry, usize) -> bool) -> Self {
        let items = self
            .items
            .iter()
            .enumerate()
            .filter(|(i, entry)| f(*entry, *i))
            .map(|(_, entry)| entry.clone())
            .collect();
        self.derive(items)
    }

    /// 範囲のエントリを取り出す（範囲外は切り詰める）
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let len = self.items.len();
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n.saturating_add(1),
            Bound::Excluded(&n) => n,
            Bound::Unbounded => len,
        };

        let end = end.min(len);
        let start = start.min(end);
        self.derive(self.items[start..end].to_vec())
    }

    /// 別のトレースのエントリを後ろに連結する
    pub fn concat(&self, other: &Trace) -> Self {
        let mut items = self.items.clone();
        items.extend(other.items.iter().cloned());
        self.derive(items)
    }

    /// 共有リゾルバのキャッシュをリセットする
    pub fn reset_cache() {
        tracey_source::shared().reset_cache();
    }

    /// 2つのエントリのファイル・行・列が等しいかどうか
    pub fn locations_equal(a: &Entry, b: &Entry) -> bool {
        a.same_location(b)
    }
}

/// 解決を試みないエントリ
fn should_skip(entry: &Entry) -> bool {
    entry.source_file.is_some() || entry.error.is_some() || entry.file.contains(UNRESOLVABLE_MARKER)
}

fn join_callee(memo: &str, next: &str) -> String {
    let or_anonymous = |s: &str| if s.is_empty() { ANONYMOUS.to_string() } else { s.to_string() };
    format!("{}{}{}", or_anonymous(memo), MERGE_ARROW, or_anonymous(next))
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_table())
    }
}

impl IntoIterator for Trace {
    type Item = Entry;
    type IntoIter = std::vec::IntoIter<Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a Entry;
    type IntoIter = std::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Entry> for Trace {
    fn from_iter<I: IntoIterator<Item = Entry>>(iter: I) -> Self {
        Self::from_entries(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathRoot;

    fn entry(file: &str, line: u32, callee: &str) -> Entry {
        Entry::new(file, Some(line), None).with_callee(callee)
    }

    #[test]
    fn test_merge_repeated_lines() {
        let trace = Trace::from_entries([
            entry("a", 10, "x"),
            entry("a", 10, "y"),
            entry("b", 1, "z"),
        ]);

        let merged = trace.merge_repeated_lines();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.at(0).callee, "x → y");
        assert_eq!(merged.at(1).callee, "z");
        // 元のトレースは変更されない
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn test_merge_substitutes_anonymous() {
        let trace = Trace::from_entries([entry("a", 1, ""), entry("a", 1, "f"), entry("a", 1, "")]);
        let merged = trace.merge_repeated_lines();
        assert_eq!(merged.at(0).callee, "<anonymous> → f → <anonymous>");
    }

    #[test]
    fn test_merge_only_adjacent() {
        let trace = Trace::from_entries([entry("a", 1, "x"), entry("b", 1, "y"), entry("a", 1, "z")]);
        assert_eq!(trace.merge_repeated_lines().len(), 3);
    }

    #[test]
    fn test_at_out_of_range() {
        let trace = Trace::from_entries([entry("a.js", 1, "f")]);
        assert_eq!(trace.at(0).file, "a.js");

        let placeholder = trace.at(5);
        assert_eq!(placeholder.callee, "<???>");
        assert_eq!(placeholder.file, "<???>");
        assert_eq!(placeholder.line, Some(0));
        assert_eq!(placeholder.column, Some(0));
    }

    #[test]
    fn test_slice_clamps() {
        let trace = Trace::from_entries([entry("a", 1, "x"), entry("b", 2, "y"), entry("c", 3, "z")]);
        assert_eq!(trace.slice(1..).len(), 2);
        assert_eq!(trace.slice(..=0).at(0).callee, "x");
        assert_eq!(trace.slice(2..10).len(), 1);
        assert!(trace.slice(5..).is_empty());
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = trace.slice(2..1);
        assert!(reversed.is_empty());
    }

    #[test]
    fn test_is_clean() {
        let mut third_party = entry("x", 1, "f");
        third_party.third_party = true;
        assert!(Trace::is_clean(&third_party, 0));
        assert!(!Trace::is_clean(&third_party, 1));
        assert!(Trace::is_clean(&entry("x", 1, "f"), 1));
    }

    #[test]
    fn test_should_skip() {
        assert!(should_skip(&Entry::new("<anonymous>", None, None)));
        assert!(!should_skip(&Entry::new("a.js", None, None)));
    }

    #[test]
    fn test_config_is_propagated() {
        let config = Arc::new(TraceConfig::new().with_root(PathRoot::process("/srv")));
        let trace = Trace::from_text_with(config, "at f (/srv/a.js:1:1)\nat g (/srv/b.js:2:2)", 0);
        let derived = trace.slice(1..).map(|e, _| e).filter(|_, _| true);
        assert_eq!(derived.config().root, PathRoot::process("/srv"));
        assert_eq!(derived.at(0).file_relative, "b.js");
    }

    #[test]
    fn test_from_text_skip() {
        let config = Arc::new(TraceConfig::new().with_root(PathRoot::process("/srv")));
        let trace = Trace::from_text_with(config, "Error\nat f (/srv/a.js:1:1)\nat g (/srv/b.js:2:2)", 1);
        assert_eq!(trace.len(), 1);
        assert_eq!(trace.at(0).callee, "g");
    }
}
