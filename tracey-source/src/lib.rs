//! Tracey ソース解決
//!
//! このクレートは、スタックトレースの位置（ファイル・行・列）から
//! 実際のソース行テキストを取得する機能を提供します。
//! ファイルのキャッシュ、ソースマップの解決、同期/非同期の読み込みを行います。

pub mod cache;
pub mod error;
pub mod file;
pub mod location;
pub mod resolver;
pub mod sourcemap;
pub mod vlq;

pub use cache::SourceCache;
pub use error::SourceError;
pub use file::SourceFile;
pub use location::{nix_slashes, Location};
pub use resolver::{shared, AsyncSourceResolver, FsSourceResolver, ResolvedLocation, SourceResolver};
pub use sourcemap::{OriginalPosition, SourceMap};
pub use vlq::{decode_mappings, decode_segment, Mapping};

/// ソース解決の結果型
pub type Result<T> = anyhow::Result<T>;
