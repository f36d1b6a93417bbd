use crate::commands::Context;
use colored::Colorize;

pub async fn handle(
    ctx: &Context,
    filter_name: &str,
    filter_values: &[String],
    owners: &[String],
    limit: usize,
) -> anyhow::Result<()> {
    let images = ctx
        .provider()
        .suggest_images(owners, filter_name, filter_values, limit)
        .await?;

    if images.is_empty() {
        println!(
            "{}",
            format!("{}={} に一致する AMI はありません", filter_name, filter_values.join(",")).dimmed()
        );
        return Ok(());
    }

    println!("{}", "AMI の候補（新しい順）:".bold());
    for image in images {
        println!(
            "  • {} {} {}",
            image.image_id.cyan(),
            image.name.as_deref().unwrap_or("(名前なし)"),
            image.creation_date.as_deref().unwrap_or_default().dimmed()
        );
    }

    Ok(())
}
