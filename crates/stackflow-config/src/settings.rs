//! ユーザー設定 (~/.config/stackflow/config.yaml)

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// ユーザー設定
///
/// 全ての項目は省略可能で、CLI フラグ・環境変数が優先される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// デフォルトの AWS リージョン
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// デフォルトの AWS プロファイル
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// 同時に処理するリソース数（1 で逐次実行）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// プロバイダー呼び出し1回あたりのタイムアウト（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    /// デフォルトの設定ファイルから読み込む
    ///
    /// 設定ディレクトリやファイルが無い場合はデフォルト値を返す。
    pub fn load() -> Result<Self> {
        match settings_path() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::ConfigDirNotFound) => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }

    /// 指定されたパスから読み込む
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("設定ファイルがありません: {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str::<Option<Settings>>(content)
            .map(Option::unwrap_or_default)
            .map_err(|e| ConfigError::Yaml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// 設定ファイルのパス（ディレクトリは作成しない）
pub fn settings_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
    Ok(config_dir.join("stackflow").join("config.yaml"))
}
