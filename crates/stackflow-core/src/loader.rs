//! ドキュメントローダー
//!
//! YAMLファイルを読み込み、DesiredStateDocument を生成する

use crate::error::{DocumentError, Result};
use crate::model::DesiredStateDocument;
use std::path::Path;
use tracing::{debug, info, instrument};

/// ファイルから宣言ドキュメントをロード
#[instrument(fields(path = %path.display()))]
pub fn load_document(path: &Path) -> Result<DesiredStateDocument> {
    debug!("Reading desired-state document");
    let content = std::fs::read_to_string(path).map_err(|e| DocumentError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let document = parse_document(&content)?;
    info!(
        instances = document.instances.len(),
        buckets = document.buckets.len(),
        resources = document.resources.len(),
        "Document loaded successfully"
    );

    Ok(document)
}

/// YAML文字列をパース
///
/// 空のドキュメント・`null` は空のドキュメントとして扱う。
pub fn parse_document(content: &str) -> Result<DesiredStateDocument> {
    if content.trim().is_empty() {
        return Ok(DesiredStateDocument::new());
    }

    let document: Option<DesiredStateDocument> =
        serde_yaml::from_str(content).map_err(|e| DocumentError::Parse(e.to_string()))?;

    Ok(document.unwrap_or_default())
}
