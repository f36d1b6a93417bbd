use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ディレクトリが見つかりません")]
    ConfigDirNotFound,

    #[error(
        "リソース定義ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: stack.local.yaml, stack.yaml, stack.yml, .stack.yaml\n\
        - ./.stackflow/ ディレクトリ\n\
        または STACKFLOW_FILE 環境変数、-f オプションで直接指定できます"
    )]
    DocumentNotFound,

    #[error("STACKFLOW_FILE で指定されたファイルが存在しません: {0}")]
    DocumentPathMissing(PathBuf),

    #[error("設定ファイルの解析に失敗しました: {path}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
