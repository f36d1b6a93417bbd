pub mod error;
pub mod settings;

pub use error::*;
pub use settings::{Settings, settings_path};

use std::path::{Path, PathBuf};

/// 台帳ディレクトリ名
pub const STATE_DIR: &str = ".stackflow";

/// リソース定義ファイルの候補（優先順）
const DOCUMENT_CANDIDATES: [&str; 4] = ["stack.local.yaml", "stack.yaml", "stack.yml", ".stack.yaml"];

/// プロジェクトのリソース定義ファイルを探す
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STACKFLOW_FILE (直接パス指定)
/// 2. カレントディレクトリ: stack.local.yaml, stack.yaml, stack.yml, .stack.yaml
/// 3. ./.stackflow/ ディレクトリ内: 同様の順序
pub fn find_document_file() -> Result<PathBuf> {
    // 1. 環境変数で直接指定
    if let Ok(path) = std::env::var("STACKFLOW_FILE") {
        let path = PathBuf::from(path);
        if !path.exists() {
            return Err(ConfigError::DocumentPathMissing(path));
        }
        return Ok(path);
    }

    let current_dir = std::env::current_dir()?;

    // 2. カレントディレクトリで検索
    if let Some(path) = find_in(&current_dir) {
        return Ok(path);
    }

    // 3. ./.stackflow/ ディレクトリで検索
    let state_dir = current_dir.join(STATE_DIR);
    if state_dir.is_dir() {
        if let Some(path) = find_in(&state_dir) {
            return Ok(path);
        }
    }

    Err(ConfigError::DocumentNotFound)
}

fn find_in(dir: &Path) -> Option<PathBuf> {
    DOCUMENT_CANDIDATES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// 台帳ファイルのパス
///
/// 環境変数 STACKFLOW_STATE があればそれを、無ければ ./.stackflow/state.yaml を返す。
/// ファイルの存在は確認しない。
pub fn state_file_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("STACKFLOW_STATE") {
        return Ok(PathBuf::from(path));
    }

    Ok(std::env::current_dir()?.join(STATE_DIR).join("state.yaml"))
}
