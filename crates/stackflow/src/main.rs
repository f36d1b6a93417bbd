mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::Context;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stack")]
#[command(about = "宣言したとおりに、一度だけ。AWS リソースのプロビジョニング", long_about = None)]
struct Cli {
    /// 台帳ファイルのパス（デフォルト: ./.stackflow/state.yaml）
    #[arg(long, global = true, env = "STACKFLOW_STATE")]
    state: Option<PathBuf>,

    /// AWS リージョン
    #[arg(long, global = true, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS プロファイル
    #[arg(long, global = true, env = "AWS_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 宣言されたリソースのうち未作成のものを作成
    #[command(alias = "reconcile")]
    Provision {
        /// リソース定義ファイル（省略時は stack.yaml などを自動検出）
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// 実際には作成せず、作成予定のリソースを表示
        #[arg(long)]
        dry_run: bool,
        /// 同時に処理するリソース数（デフォルト: 1 = 逐次実行）
        #[arg(long, value_name = "N")]
        parallel: Option<usize>,
        /// プロバイダー呼び出し1回あたりのタイムアウト（秒）
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// 結果を JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 台帳に記録されたリソースを削除
    Destroy {
        /// リソース定義ファイル（省略時は stack.yaml などを自動検出）
        #[arg(short, long)]
        file: Option<PathBuf>,
        /// 実際には削除せず、削除予定のリソースを表示
        #[arg(long)]
        dry_run: bool,
        /// 同時に処理するリソース数（デフォルト: 1 = 逐次実行）
        #[arg(long, value_name = "N")]
        parallel: Option<usize>,
        /// プロバイダー呼び出し1回あたりのタイムアウト（秒）
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
        /// 確認をスキップ
        #[arg(short, long)]
        yes: bool,
    },
    /// 台帳の内容を表示
    Status {
        /// JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 台帳からエントリを削除（プロバイダー側のリソースは残る）
    Forget {
        /// 台帳上のタイプ (instances, buckets, iam_users, ...)
        resource_type: String,
        /// リソース識別子
        id: String,
    },
    /// リソース定義ファイルを検証
    Validate {
        /// リソース定義ファイル（省略時は stack.yaml などを自動検出）
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// プロバイダー上のリソースを一覧表示
    List {
        /// 種別 (instances, buckets, iam_users, iam_roles, iam_policies, vpcs, subnets)
        kind: String,
    },
    /// EC2 インスタンスを停止
    StopInstance {
        /// インスタンスID または Name タグ
        instance: String,
    },
    /// AMI の候補を表示
    SuggestAmi {
        /// describe-images のフィルタ名
        #[arg(long, default_value = "name")]
        filter_name: String,
        /// フィルタ値（ワイルドカード可）
        #[arg(long, num_args = 1.., default_value = "al2023-ami-*-x86_64")]
        filter_values: Vec<String>,
        /// AMI の所有者
        #[arg(long, num_args = 1.., default_value = "amazon")]
        owners: Vec<String>,
        /// 表示件数
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // ログは stderr に出力（stdout はレポート・JSON 用）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Versionコマンドは設定ファイル不要
    if matches!(cli.command, Commands::Version) {
        println!("stackflow {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let ctx = Context::new(cli.state, cli.region, cli.profile)?;

    match cli.command {
        Commands::Provision {
            file,
            dry_run,
            parallel,
            timeout,
            json,
        } => {
            commands::provision::handle(&ctx, file, dry_run, parallel, timeout, json).await?;
        }
        Commands::Destroy {
            file,
            dry_run,
            parallel,
            timeout,
            yes,
        } => {
            commands::destroy::handle(&ctx, file, dry_run, parallel, timeout, yes).await?;
        }
        Commands::Status { json } => {
            commands::status::handle(&ctx, json).await?;
        }
        Commands::Forget { resource_type, id } => {
            commands::forget::handle(&ctx, &resource_type, &id).await?;
        }
        Commands::Validate { file } => {
            commands::validate::handle(file)?;
        }
        Commands::List { kind } => {
            commands::list::handle(&ctx, &kind).await?;
        }
        Commands::StopInstance { instance } => {
            commands::stop_instance::handle(&ctx, &instance).await?;
        }
        Commands::SuggestAmi {
            filter_name,
            filter_values,
            owners,
            limit,
        } => {
            commands::suggest_ami::handle(&ctx, &filter_name, &filter_values, &owners, limit)
                .await?;
        }
        // 設定読み込み前に処理済み
        Commands::Version => {}
    }

    Ok(())
}
