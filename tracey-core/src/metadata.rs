//! エントリの表示用メタデータの導出
//!
//! 相対パス、短縮パス、ファイル名、短い関数名、サードパーティ判定、
//! 外部ドメインをエントリの位置情報から計算します。

use crate::config::{PathRoot, TraceConfig};
use crate::entry::Entry;
use tracey_source::nix_slashes;
use url::Url;

/// 外部ドメインとみなすURLスキーム
const NETWORK_SCHEMES: [&str; 2] = ["http", "https"];

impl TraceConfig {
    /// エントリのメタデータを導出した新しいエントリを返す
    ///
    /// `callee_short` が既に設定されている場合はそのまま残す。
    pub fn extract_metadata(&self, mut entry: Entry) -> Entry {
        let external = self.external_location(&entry.file);

        let file_relative = match &external {
            Some((_, path)) => path.clone(),
            None => self.relative_path(&entry.file),
        };

        entry.file_short = self.shorten_path(&file_relative);
        entry.file_name = last_segment(&entry.file, '/').to_string();

        if entry.callee_short.is_empty() {
            entry.callee_short = last_segment(&entry.callee, '.').to_string();
        }

        entry.third_party =
            (self.third_party.matches(&file_relative) || external.is_some()) && !entry.index;
        entry.file_relative = file_relative;
        entry.external_domain = external.map(|(host, _)| host);

        entry
    }

    /// 基準パスからの相対パス（URLスキームは取り除く）
    pub fn relative_path(&self, full: &str) -> String {
        let full = nix_slashes(full);
        let relative = match &self.root {
            PathRoot::Process { cwd } => relative_to(cwd, &full),
            PathRoot::Document { url } => full.replacen(url.as_str(), "", 1),
        };
        strip_scheme(&relative).to_string()
    }

    /// 相対パスからノイズとなる接頭辞を順に取り除く
    pub fn shorten_path(&self, relative: &str) -> String {
        let mut short = relative;
        for prefix in &self.noise_prefixes {
            short = short.strip_prefix(prefix.as_str()).unwrap_or(short);
        }
        short.to_string()
    }

    /// ページとは別ホストの完全なURLなら、そのホスト名
    pub fn external_domain(&self, file: &str) -> Option<String> {
        self.external_location(file).map(|(host, _)| host)
    }

    /// 外部URLの (ホスト名, 先頭の `/` を除いたパス)
    ///
    /// `webpack://` のようなバンドラの疑似URLは対象外。
    fn external_location(&self, file: &str) -> Option<(String, String)> {
        let url = Url::parse(file).ok()?;
        if !NETWORK_SCHEMES.contains(&url.scheme()) {
            return None;
        }

        let host = url.host_str().filter(|host| !host.is_empty())?;
        if self.root.host().as_deref() == Some(host) {
            return None;
        }

        Some((host.to_string(), url.path().trim_start_matches('/').to_string()))
    }
}

fn last_segment(s: &str, separator: char) -> &str {
    s.rsplit(separator).next().unwrap_or_default()
}

/// `scheme://` や `scheme:/` までを取り除く（`C:/` のようなドライブ名は残す）
fn strip_scheme(path: &str) -> &str {
    let Some(pos) = path
        .match_indices(":/")
        .map(|(pos, _)| pos)
        .filter(|&pos| !is_drive_colon(path, pos))
        .last()
    else {
        return path;
    };

    let mut rest = &path[pos + 2..];
    for _ in 0..2 {
        rest = rest.strip_prefix('/').unwrap_or(rest);
    }
    rest
}

/// `pos` のコロンがドライブ名（`C:`）の一部かどうか
fn is_drive_colon(path: &str, pos: usize) -> bool {
    let bytes = path.as_bytes();
    pos >= 1 && bytes[pos - 1].is_ascii_alphabetic() && (pos == 1 || bytes[pos - 2] == b'/')
}

/// `/` または `C:/` で始まる絶対パスかどうか
fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/') || (bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/')
}

/// パスを `/` で区切り、`.` と `..` を畳み込む
fn segments(path: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts
}

/// `root` から `full` への相対パス（相対パスは `root` を基準に解釈する）
fn relative_to(root: &str, full: &str) -> String {
    let absolute = if is_absolute(full) {
        full.to_string()
    } else {
        format!("{}/{}", root.trim_end_matches('/'), full)
    };

    let base = segments(root);
    let target = segments(&absolute);

    let common = base
        .iter()
        .zip(&target)
        .take_while(|(a, b)| a == b)
        .count();

    let mut parts = vec![".."; base.len() - common];
    parts.extend_from_slice(&target[common..]);
    parts.join("/")
}
