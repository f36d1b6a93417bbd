use crate::commands::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, instance: &str) -> anyhow::Result<()> {
    println!("{}", format!("インスタンスを停止中: {}", instance).blue());

    let instance_id = ctx.provider().stop_instance(instance).await?;

    println!(
        "{} インスタンス {} の停止を要求しました",
        "✓".green().bold(),
        instance_id.cyan()
    );

    Ok(())
}
