pub mod destroy;
pub mod forget;
pub mod list;
pub mod provision;
pub mod status;
pub mod stop_instance;
pub mod suggest_ami;
pub mod validate;

use colored::Colorize;
use stackflow_cloud::ReconcileOptions;
use stackflow_cloud_aws::AwsProvider;
use stackflow_config::Settings;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 全コマンド共通の実行コンテキスト
pub struct Context {
    pub state_path: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub settings: Settings,
}

impl Context {
    /// CLI フラグ（環境変数含む）→ ユーザー設定 の順で解決する
    pub fn new(
        state: Option<PathBuf>,
        region: Option<String>,
        profile: Option<String>,
    ) -> anyhow::Result<Self> {
        let settings = Settings::load()?;
        let state_path = match state {
            Some(path) => path,
            None => stackflow_config::state_file_path()?,
        };

        let region = region.or_else(|| settings.region.clone());
        let profile = profile.or_else(|| settings.profile.clone());
        tracing::debug!(
            "state: {}, region: {:?}, profile: {:?}",
            state_path.display(),
            region,
            profile
        );

        Ok(Self {
            state_path,
            region,
            profile,
            settings,
        })
    }

    pub fn provider(&self) -> AwsProvider {
        AwsProvider::new(self.region.clone(), self.profile.clone())
    }

    /// 並列数・タイムアウトを CLI フラグ → ユーザー設定 の順で解決する
    pub fn reconcile_options(
        &self,
        dry_run: bool,
        parallel: Option<usize>,
        timeout: Option<u64>,
    ) -> ReconcileOptions {
        ReconcileOptions::new()
            .dry_run(dry_run)
            .with_concurrency(parallel.or(self.settings.concurrency).unwrap_or(1))
            .with_timeout(
                timeout
                    .map(Duration::from_secs)
                    .or_else(|| self.settings.timeout()),
            )
    }
}

/// リソース定義ファイルを決定する（-f 指定 → 自動検出）
pub fn resolve_document_path(file: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match file {
        Some(path) => Ok(path),
        None => Ok(stackflow_config::find_document_file()?),
    }
}

pub fn print_document_path(path: &Path) {
    println!("📄 リソース定義: {}", path.display().to_string().cyan());
}

pub fn print_state_path(path: &Path) {
    println!("📒 台帳: {}", path.display().to_string().cyan());
}
