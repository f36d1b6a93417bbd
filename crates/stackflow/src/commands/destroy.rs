use crate::commands::{Context, print_document_path, print_state_path, resolve_document_path};
use crate::output::print_report;
use colored::Colorize;
use stackflow_cloud::{Reconciler, StateStore};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn handle(
    ctx: &Context,
    file: Option<PathBuf>,
    dry_run: bool,
    parallel: Option<usize>,
    timeout: Option<u64>,
    yes: bool,
) -> anyhow::Result<()> {
    let path = resolve_document_path(file)?;
    let document = stackflow_core::load_document(&path)?;

    let store = if dry_run {
        StateStore::load_read_only(&ctx.state_path).await?
    } else {
        StateStore::load(&ctx.state_path).await?
    };

    print_document_path(&path);
    print_state_path(store.path());

    if store.is_empty().await {
        println!("{}", "台帳にリソースが記録されていません".dimmed());
        return Ok(());
    }

    if !dry_run && !yes {
        println!();
        println!(
            "{}",
            "⚠ 台帳に記録された宣言済みリソースをプロバイダーから削除します"
                .yellow()
                .bold()
        );
        print!("続行しますか？ [y/N]: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("中止しました");
            return Ok(());
        }
    }

    let options = ctx.reconcile_options(dry_run, parallel, timeout);

    let reconciler = Reconciler::new(Arc::new(ctx.provider()), Arc::new(store));
    let report = reconciler.teardown(&document, &options).await?;

    print_report(&report);

    if report.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
