use colored::Colorize;
use stackflow_cloud::{Outcome, OutcomeStatus, ReconcileAction, ReconcileReport};

/// レポートを人間向けに表示
pub fn print_report(report: &ReconcileReport) {
    let title = match (report.action, report.dry_run) {
        (ReconcileAction::Provision, false) => "プロビジョニング結果",
        (ReconcileAction::Provision, true) => "プロビジョニング計画 (dry-run)",
        (ReconcileAction::Teardown, false) => "削除結果",
        (ReconcileAction::Teardown, true) => "削除計画 (dry-run)",
    };

    println!();
    println!("{}", title.bold());

    if report.outcomes.is_empty() {
        println!("  {}", "宣言されたリソースはありません".dimmed());
    }

    for outcome in &report.outcomes {
        print_outcome(outcome);
    }

    println!();
    let summary = format!("{} ({}ms)", report.summary(), report.duration_ms);
    if report.has_failures() {
        println!("{} {}", "✗".red().bold(), summary.red());
    } else {
        println!("{} {}", "✓".green().bold(), summary.green());
    }
}

fn print_outcome(outcome: &Outcome) {
    let target = format!("{}/{}", outcome.resource_type, outcome.resource_id);
    let status = outcome.status.to_string();

    let line = match outcome.status {
        OutcomeStatus::Created | OutcomeStatus::Deleted => {
            format!("  {} {:<13} {}", "✓".green(), status.green(), target.cyan())
        }
        OutcomeStatus::Skipped => {
            format!("  {} {:<13} {}", "=".dimmed(), status.dimmed(), target.dimmed())
        }
        OutcomeStatus::WouldCreate | OutcomeStatus::WouldDelete => {
            format!("  {} {:<13} {}", "+".cyan(), status.cyan(), target.cyan())
        }
        OutcomeStatus::Unsupported | OutcomeStatus::Conflict => {
            format!("  {} {:<13} {}", "⚠".yellow(), status.yellow(), target.yellow())
        }
        OutcomeStatus::Failed => {
            let kind = outcome
                .failure
                .map(|k| format!(" [{}]", k))
                .unwrap_or_default();
            format!(
                "  {} {:<13} {}{}",
                "✗".red(),
                status.red().bold(),
                target.red(),
                kind.red()
            )
        }
    };
    println!("{}", line);

    if let Some(detail) = &outcome.detail {
        println!("      {}", detail.dimmed());
    }
}
