use crate::commands::Context;
use colored::Colorize;
use stackflow_cloud::ResourceProvider;
use stackflow_core::ResourceKind;

/// 台帳タイプ (instances) / type タグ (instance) のどちらでも受け付ける
fn parse_kind(kind: &str) -> Option<ResourceKind> {
    ResourceKind::from_ledger_type(kind)
        .or_else(|| ResourceKind::ALL.into_iter().find(|k| k.type_tag() == kind))
}

pub async fn handle(ctx: &Context, kind: &str) -> anyhow::Result<()> {
    let Some(kind) = parse_kind(kind) else {
        let known: Vec<&str> = ResourceKind::ALL.iter().map(|k| k.ledger_type()).collect();
        anyhow::bail!(
            "不明な種別です: {}\n利用可能な種別: {}",
            kind,
            known.join(", ")
        );
    };

    let provider = ctx.provider();
    let resources = provider.list(kind).await?;

    if resources.is_empty() {
        println!("{}", format!("{} はありません", kind.display_name()).dimmed());
        return Ok(());
    }

    println!("{} ({}件)", kind.display_name().bold(), resources.len());
    for resource in resources {
        let mut line = format!("  • {}", resource.id.cyan());
        if let Some(name) = resource.name {
            line.push_str(&format!(" {}", name));
        }
        if let Some(status) = resource.status {
            line.push_str(&format!(" [{}]", status.green()));
        }
        if let Some(created_at) = resource.created_at {
            line.push_str(&format!(" {}", created_at.dimmed()));
        }
        println!("{}", line);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!(parse_kind("instances"), Some(ResourceKind::Instance));
        assert_eq!(parse_kind("bucket"), Some(ResourceKind::Bucket));
        assert_eq!(parse_kind("iam_policies"), Some(ResourceKind::IamPolicy));
        assert_eq!(parse_kind("vpc"), Some(ResourceKind::Vpc));
        assert_eq!(parse_kind("lambda"), None);
    }
}
