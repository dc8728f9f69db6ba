use clap::Parser;
use color_eyre::eyre;
use mycnf_gen::{parse_budget, MemoryBudget, MyCnfGenerator};
use mysql_ops_common::{init_tracing, PodEnv};
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "gen-mycnf")]
#[command(about = "Generate my.cnf from the pod memory budget", version)]
struct Cli {
    /// Total memory of the pod, e.g. 2G (default 512M)
    #[arg(allow_hyphen_values = true)]
    memory: Option<String>,

    /// InnoDB buffer pool size, e.g. 512M (default 128M)
    #[arg(allow_hyphen_values = true)]
    pool_size: Option<String>,

    /// Ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    extra: Vec<String>,
}

impl Cli {
    fn budget(&self) -> MemoryBudget {
        let budget = parse_budget(self.memory.as_deref(), self.pool_size.as_deref());
        if let Some(err) = &budget.fallback {
            warn!(
                memory = budget.memory,
                pool_size = budget.pool_size,
                "{err}, falling back to defaults"
            );
        }
        budget
    }
}

fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();
    let env = PodEnv::from_env();

    let MemoryBudget {
        memory, pool_size, ..
    } = cli.budget();
    println!("Memory size {memory}, innodb_buffer_pool_size {pool_size}");

    let generator = MyCnfGenerator::from_env(&env)?;
    generator.generate(memory, pool_size)?;
    Ok(())
}
