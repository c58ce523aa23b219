//! パスをキーとするソースファイルキャッシュ

use crate::SourceFile;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// ソースファイルキャッシュ
///
/// 同じパスへの非同期読み込みが競合した場合は、先に挿入された値を保持する。
#[derive(Debug, Default)]
pub struct SourceCache {
    files: Mutex<HashMap<String, Arc<SourceFile>>>,
}

impl SourceCache {
    /// 空のキャッシュを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュ済みのファイルを取得する
    pub fn get(&self, path: &str) -> Option<Arc<SourceFile>> {
        self.files.lock().get(path).cloned()
    }

    /// ファイルを挿入し、キャッシュに残った値を返す
    pub fn insert(&self, file: SourceFile) -> Arc<SourceFile> {
        let mut files = self.files.lock();
        files
            .entry(file.path.clone())
            .or_insert_with(|| Arc::new(file))
            .clone()
    }

    /// キャッシュ済みでなければ `load` で読み込む
    pub fn get_or_load(&self, path: &str, load: impl FnOnce() -> SourceFile) -> Arc<SourceFile> {
        if let Some(file) = self.get(path) {
            return file;
        }
        self.insert(load())
    }

    /// キャッシュを空にする
    pub fn reset(&self) {
        self.files.lock().clear();
    }

    /// キャッシュ済みのファイル数
    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    /// キャッシュが空かどうか
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
