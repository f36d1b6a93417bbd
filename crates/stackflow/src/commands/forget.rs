use crate::commands::Context;
use colored::Colorize;
use stackflow_cloud::StateStore;
use stackflow_core::ResourceKind;

/// 台帳からエントリだけを削除する
///
/// プロバイダー側で手動削除したリソースを再作成させたい場合に使う。
pub async fn handle(ctx: &Context, resource_type: &str, id: &str) -> anyhow::Result<()> {
    let store = StateStore::load(&ctx.state_path).await?;

    if !store.exists(resource_type, id).await {
        eprintln!(
            "{} 台帳に {}/{} は記録されていません",
            "✗".red().bold(),
            resource_type,
            id
        );
        if ResourceKind::from_ledger_type(resource_type).is_none() {
            let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.ledger_type()).collect();
            eprintln!("  利用可能なタイプ: {}", known.join(", "));
        }
        std::process::exit(1);
    }

    store.remove(resource_type, id).await?;

    println!(
        "{} {}/{} を台帳から削除しました",
        "✓".green().bold(),
        resource_type,
        id.cyan()
    );
    println!(
        "{}",
        "プロバイダー側のリソースは削除されていません".dimmed()
    );

    Ok(())
}
