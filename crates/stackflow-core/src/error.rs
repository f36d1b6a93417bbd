use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("ドキュメント読み込みエラー: {path}\n理由: {message}")]
    Io { path: PathBuf, message: String },

    #[error("YAMLパースエラー: {0}")]
    Parse(String),

    #[error("{group}[{index}] に識別子がありません（{fields} のいずれかが必要です）")]
    MissingIdentifier {
        group: String,
        index: usize,
        fields: String,
    },

    #[error("{group}[{index}].{field} は文字列または数値である必要があります")]
    InvalidIdentifier {
        group: String,
        index: usize,
        field: String,
    },
}

pub type Result<T> = std::result::Result<T, DocumentError>;
