use crate::commands::{print_document_path, resolve_document_path};
use colored::Colorize;
use stackflow_core::{DeclaredKind, ResourceKind};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn handle(file: Option<PathBuf>) -> anyhow::Result<()> {
    println!("{}", "リソース定義を検証中...".blue());

    let path = resolve_document_path(file)?;
    print_document_path(&path);

    let declared = match stackflow_core::load_document(&path)
        .and_then(|document| document.declared_resources())
    {
        Ok(declared) => declared,
        Err(e) => {
            eprintln!();
            eprintln!("{}", "✗ 定義エラー".red().bold());
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("{}", "✓ リソース定義は正常です！".green().bold());
    println!();
    println!("サマリー:");

    let mut by_kind: BTreeMap<ResourceKind, Vec<&str>> = BTreeMap::new();
    let mut unsupported = Vec::new();
    for resource in &declared {
        match &resource.kind {
            DeclaredKind::Supported(kind) => {
                by_kind.entry(*kind).or_default().push(&resource.id);
            }
            DeclaredKind::Unsupported(tag) => unsupported.push((tag.as_str(), &resource.id)),
        }
    }

    if declared.is_empty() {
        println!("  {}", "宣言されたリソースはありません".dimmed());
    }

    for (kind, ids) in &by_kind {
        println!("  {}: {}個", kind.display_name(), ids.len());
        for id in ids {
            println!("    - {}", id.cyan());
        }
    }

    if !unsupported.is_empty() {
        println!();
        println!(
            "{}",
            format!("⚠ 未対応のタイプ: {}個（実行時は unsupported としてスキップされます）", unsupported.len())
                .yellow()
        );
        for (tag, id) in unsupported {
            let tag = if tag.is_empty() { "(type 未指定)" } else { tag };
            println!("    - {} ({})", id.yellow(), tag);
        }
    }

    Ok(())
}
