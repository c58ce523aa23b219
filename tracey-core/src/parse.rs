//! スタックトレース文字列の解析
//!
//! V8形式（`at callee (file:line:col)`）、`eval at` 形式、
//! SpiderMonkey/JavaScriptCore形式（`callee@file:line:col`）、
//! 関数名のない位置だけの行を、この優先順位で試します。

use crate::config::TraceConfig;
use crate::entry::Entry;
use crate::Result;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracey_source::nix_slashes;
use tracing::debug;

/// 位置文字列がネイティブコードを示す値
const NATIVE_LOCATION: &str = "native";

static PARSER: LazyLock<RawParser> = LazyLock::new(RawParser::default);

/// 共有パーサでトレース文字列を解析する
pub fn raw_parse(text: &str, config: &TraceConfig) -> Vec<Entry> {
    PARSER.parse(text, config)
}

/// スタックトレースの行パーサ
pub struct RawParser {
    /// `at callee (eval at outer (file:line:col), ...)`
    eval_at: Regex,
    /// `at callee (location)`
    parenthesized: Regex,
    /// `callee@location`
    at_sign: Regex,
    /// `at file:line:col`（関数名なし）
    bare: Regex,
    /// `file:line:col` を末尾2つのコロンで分割する
    location: Regex,
}

impl RawParser {
    /// パーサを作成する
    pub fn new() -> Result<Self> {
        Ok(Self {
            eval_at: Regex::new(r"at (.+) \(eval at .+ \((.+)\), .+\)")?,
            parenthesized: Regex::new(r"at (.+) \((.+)\)")?,
            at_sign: Regex::new(r"(.*)@(.*)")?,
            bare: Regex::new(r"^(at\s+)*(.+):([0-9]+):([0-9]+)")?,
            location: Regex::new(r"(.*):(.+):(.+)")?,
        })
    }

    /// トレース文字列を解析し、解析できた行のエントリを順に返す
    ///
    /// メタデータ（相対パスなど）は設定しない。
    pub fn parse(&self, text: &str, config: &TraceConfig) -> Vec<Entry> {
        text.split('\n')
            .filter_map(|line| self.parse_line(line, config))
            .collect()
    }

    /// 1行を解析する（どの形式にも一致しなければ `None`）
    pub fn parse_line(&self, line: &str, config: &TraceConfig) -> Option<Entry> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (callee, mut native, file, line_no, column) = if let Some(caps) = self.match_callee_form(line) {
            let callee = caps.get(1).map_or("", |m| m.as_str());
            let location = caps.get(2).map_or("", |m| m.as_str());
            let (file, line_no, column) = self.split_location(location);
            (callee, location == NATIVE_LOCATION, file, line_no, column)
        } else if let Some(caps) = self.bare.captures(line) {
            (
                "",
                false,
                caps.get(2).map_or("", |m| m.as_str()),
                parse_int(caps.get(3).map_or("", |m| m.as_str())),
                parse_int(caps.get(4).map_or("", |m| m.as_str())),
            )
        } else {
            debug!("Dropping unparseable stack line: '{}'", line);
            return None;
        };

        // Array.reduce のような組み込みメソッドはファイルを持たない
        if !callee.is_empty() && file.is_empty() {
            let namespace = callee.split('.').next().unwrap_or_default();
            if config.native_namespaces.iter().any(|n| n == namespace) {
                native = true;
            }
        }

        Some(Entry {
            before_parse: line.to_string(),
            callee: callee.to_string(),
            index: config.root.page_url() == Some(file),
            native,
            file: nix_slashes(file),
            line: line_no,
            column,
            ..Entry::default()
        })
    }

    /// 関数名を持つ形式（eval at → 括弧付き → `@`）を順に試す
    fn match_callee_form<'t>(&self, line: &'t str) -> Option<Captures<'t>> {
        self.eval_at
            .captures(line)
            .or_else(|| self.parenthesized.captures(line))
            .or_else(|| {
                if line.starts_with("at ") {
                    None
                } else {
                    self.at_sign.captures(line)
                }
            })
    }

    /// `file:line:col` を分割する（一致しなければファイルなし）
    fn split_location<'t>(&self, location: &'t str) -> (&'t str, Option<u32>, Option<u32>) {
        match self.location.captures(location) {
            Some(caps) => (
                caps.get(1).map_or("", |m| m.as_str()),
                parse_int(caps.get(2).map_or("", |m| m.as_str())),
                parse_int(caps.get(3).map_or("", |m| m.as_str())),
            ),
            None => ("", None, None),
        }
    }
}

impl Default for RawParser {
    fn default() -> Self {
        Self::new().expect("Failed to compile stack line patterns")
    }
}

/// 先頭の10進数を読み取る（0・負数・数字なしは `None`）
pub(crate) fn parse_int(s: &str) -> Option<u32> {
    let s = s.trim_start();
    let s = s.strip_prefix('+').unwrap_or(s);
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse::<u32>().ok().filter(|n| *n > 0)
}
