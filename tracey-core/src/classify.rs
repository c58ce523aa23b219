//! サードパーティ判定の述語

use std::fmt;
use std::sync::Arc;

type PredicateFn = dyn Fn(&str) -> bool + Send + Sync;

/// 相対パスからサードパーティのコードかどうかを判定する述語
///
/// `or` / `and` / `negate` で既存の判定と組み合わせられる。
#[derive(Clone)]
pub struct ThirdPartyPredicate {
    predicate: Arc<PredicateFn>,
}

impl ThirdPartyPredicate {
    /// 任意の関数から述語を作成する
    pub fn new(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// 既定のヒューリスティック
    ///
    /// `~` で始まる（webpackのモジュール）、`/` で始まる（外部ソース）、
    /// `node_modules` または `webpack/bootstrap` で始まるパスをサードパーティとみなす。
    /// Rustの標準ライブラリと依存クレートのソースも同様に扱う。
    pub fn default_heuristics() -> Self {
        Self::new(|relative| {
            relative.starts_with('~')
                || relative.starts_with('/')
                || relative.starts_with("node_modules")
                || relative.starts_with("webpack/bootstrap")
                || is_rust_toolchain_source(relative)
        })
    }

    /// 常に偽を返す述語
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// どちらかが真なら真
    pub fn or(self, other: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        let this = self.predicate;
        Self::new(move |relative| this(relative) || other(relative))
    }

    /// 両方が真なら真
    pub fn and(self, other: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        let this = self.predicate;
        Self::new(move |relative| this(relative) && other(relative))
    }

    /// 判定を反転する
    pub fn negate(self) -> Self {
        let this = self.predicate;
        Self::new(move |relative| !this(relative))
    }

    /// 相対パスを判定する
    pub fn matches(&self, relative: &str) -> bool {
        (self.predicate)(relative)
    }
}

/// `rustc/<commit>/library/..`、`.cargo/registry/..`、`.rustup/..` 以下のソース
fn is_rust_toolchain_source(relative: &str) -> bool {
    let parts: Vec<&str> = relative.split('/').collect();
    parts.contains(&".rustup")
        || parts.windows(2).any(|pair| match pair {
            [".cargo", "registry" | "git"] => true,
            ["rustc", commit] => commit.len() == 40 && commit.chars().all(|c| c.is_ascii_hexdigit()),
            _ => false,
        })
}

impl Default for ThirdPartyPredicate {
    fn default() -> Self {
        Self::default_heuristics()
    }
}

impl fmt::Debug for ThirdPartyPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ThirdPartyPredicate(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_heuristics() {
        let predicate = ThirdPartyPredicate::default();
        assert!(predicate.matches("~/jquery/dist/jquery.js"));
        assert!(predicate.matches("/usr/lib/external.js"));
        assert!(predicate.matches("node_modules/x/y.js"));
        assert!(predicate.matches("webpack/bootstrap 1234"));
        assert!(!predicate.matches("src/app.js"));
        assert!(!predicate.matches(""));
    }

    #[test]
    fn test_rust_toolchain_sources() {
        let predicate = ThirdPartyPredicate::default();
        assert!(predicate.matches(
            "../../../rustc/90b35a6239c3d8bdabc530a6a0816f7ff89a0aaf/library/core/src/ops/function.rs"
        ));
        assert!(predicate.matches("../.cargo/registry/src/index.crates.io-6f17d22bba15001f/tokio-1.38.0/src/runtime/park.rs"));
        assert!(predicate.matches("../.cargo/git/checkouts/foo-1a2b3c/src/lib.rs"));
        assert!(predicate.matches("../.rustup/toolchains/stable-x86_64-unknown-linux-gnu/lib/rustlib/src/rust/library/std/src/rt.rs"));

        assert!(!predicate.matches("src/main.rs"));
        assert!(!predicate.matches("tools/rustc/notes.rs"));
        assert!(!predicate.matches("crates/cargo/registry.rs"));
    }

    #[test]
    fn test_combinators() {
        // 既定の判定に test.js を追加し、さらに除外し直す
        let widened = ThirdPartyPredicate::default().or(|path| path == "test.js");
        assert!(widened.matches("test.js"));
        assert!(widened.matches("node_modules/a.js"));

        let narrowed = widened.and(|path| path != "test.js");
        assert!(!narrowed.matches("test.js"));
        assert!(narrowed.matches("node_modules/a.js"));

        assert!(ThirdPartyPredicate::never().negate().matches("anything"));
    }
}
