use backupctl_sdk::{restore_latest, BackupCtlClient, BackupKind, RestoreOutcome};
use clap::Parser;
use color_eyre::eyre;
use mysql_ops_common::{init_tracing, PodEnv};
use tracing::info;

const USAGE: &str = "Must add the mode 'increment' or 'full'";

#[derive(Parser, Debug)]
#[command(name = "backup-restore")]
#[command(about = "Restore the latest MySQL backup through backupctl", version)]
struct Cli {
    /// Backup series to restore: `full` or `increment`
    #[arg(allow_hyphen_values = true)]
    mode: Option<String>,

    /// Ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,
}

/// `None` means the mode was missing or unknown, and nothing was requested.
async fn run(mode: Option<&str>, env: &PodEnv) -> eyre::Result<Option<RestoreOutcome>> {
    let Some(kind) = BackupKind::from_mode(mode) else {
        return Ok(None);
    };

    let client = BackupCtlClient::from_env(env)?;
    let to_instance = env.require_instance_no()?;
    info!(%kind, base_url = client.base_url(), to_instance, "Looking up latest backup");

    Ok(Some(restore_latest(&client, kind, to_instance).await?))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let env = PodEnv::from_env();

    match run(cli.mode.as_deref(), &env).await? {
        None => println!("{USAGE}"),
        Some(RestoreOutcome::NotFound(kind)) => println!("No {kind} backup files found"),
        Some(RestoreOutcome::Migrated { response, .. }) => println!("{response}"),
    }
    Ok(())
}
