use crate::commands::{Context, print_state_path};
use colored::Colorize;
use stackflow_cloud::StateStore;
use stackflow_core::ResourceKind;

pub async fn handle(ctx: &Context, json: bool) -> anyhow::Result<()> {
    let store = StateStore::load_read_only(&ctx.state_path).await?;
    let record = store.snapshot().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    print_state_path(store.path());
    println!();

    if record.is_empty() {
        println!("{}", "台帳にリソースが記録されていません".dimmed());
        return Ok(());
    }

    for (resource_type, ids) in &record {
        let label = ResourceKind::from_ledger_type(resource_type)
            .map(|kind| kind.display_name().to_string())
            .unwrap_or_else(|| resource_type.clone());
        println!(
            "{} ({}) {}件",
            resource_type.bold(),
            label,
            ids.len()
        );

        for (id, metadata) in ids {
            let details = match metadata.as_object() {
                Some(map) if !map.is_empty() => map
                    .iter()
                    .map(|(k, v)| match v.as_str() {
                        Some(s) => format!("{}={}", k, s),
                        None => format!("{}={}", k, v),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                Some(_) => String::new(),
                None if metadata.is_null() => String::new(),
                None => metadata.to_string(),
            };

            if details.is_empty() {
                println!("  • {}", id.cyan());
            } else {
                println!("  • {} {}", id.cyan(), details.dimmed());
            }
        }
    }

    println!();
    println!("合計: {}件", store.len().await);

    Ok(())
}
