//! スタックトレースを持つエラー

/// スタックトレース文字列を持つエラー
pub trait ErrorLike {
    /// 捕捉されたスタックトレース（なければ `None`）
    fn stack(&self) -> Option<&str>;
}

/// 実行時に投げられたエラー
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrownError {
    pub message: String,
    pub stack: Option<String>,
}

impl ThrownError {
    /// エラーを作成する
    pub fn new(message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            message: message.into(),
            stack,
        }
    }
}

impl ErrorLike for ThrownError {
    fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }
}
