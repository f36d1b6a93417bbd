use crate::commands::{Context, print_document_path, print_state_path, resolve_document_path};
use crate::output::print_report;
use colored::Colorize;
use stackflow_cloud::{Reconciler, ResourceProvider, StateStore};
use std::path::PathBuf;
use std::sync::Arc;

pub async fn handle(
    ctx: &Context,
    file: Option<PathBuf>,
    dry_run: bool,
    parallel: Option<usize>,
    timeout: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let path = resolve_document_path(file)?;
    let document = stackflow_core::load_document(&path)?;

    // dry-run では台帳ファイルを作成・変更しない
    let store = if dry_run {
        StateStore::load_read_only(&ctx.state_path).await?
    } else {
        StateStore::load(&ctx.state_path).await?
    };

    let provider = ctx.provider();

    if !json {
        print_document_path(&path);
        print_state_path(store.path());

        if !dry_run {
            let auth = provider.check_auth().await?;
            match auth.account_info {
                Some(account) if auth.authenticated => {
                    println!("🔑 {}: {}", provider.display_name(), account.cyan());
                }
                _ => {
                    println!(
                        "{} 認証を確認できませんでした: {}",
                        "⚠".yellow(),
                        auth.error.unwrap_or_default()
                    );
                }
            }
        }
    }

    let options = ctx.reconcile_options(dry_run, parallel, timeout);

    let reconciler = Reconciler::new(Arc::new(provider), Arc::new(store));
    let report = reconciler.reconcile(&document, &options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        if report.has_failures() {
            println!();
            println!(
                "{}",
                "失敗したリソースは台帳に記録されていません。もう一度実行すると再試行されます".dimmed()
            );
        }
    }

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
