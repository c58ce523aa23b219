//! Tracey スタックトレース解析のコア機能
//!
//! このクレートは、実行時のスタックトレース文字列を構造化された位置情報の列に変換し、
//! ソース行の解決、重複フレームの統合、サードパーティフレームの除去、
//! 表形式での表示を行います。

pub mod capture;
pub mod classify;
pub mod config;
pub mod entry;
pub mod markers;
pub mod metadata;
pub mod parse;
pub mod partition;
pub mod syntax_error;
pub mod table;
pub mod thrown;
pub mod trace;

pub use classify::ThirdPartyPredicate;
pub use config::{ColumnWidths, PathRoot, TraceConfig};
pub use entry::Entry;
pub use parse::RawParser;
pub use partition::{partition, Group};
pub use syntax_error::SyntaxErrorReport;
pub use table::{AlignedTable, TableFormatter};
pub use thrown::{ErrorLike, ThrownError};
pub use trace::Trace;

// 他のクレートから使用するために再エクスポート
pub use tracey_source::{
    AsyncSourceResolver, FsSourceResolver, Location, ResolvedLocation, SourceError, SourceFile,
    SourceResolver,
};

/// コア機能の結果型
pub type Result<T> = anyhow::Result<T>;
