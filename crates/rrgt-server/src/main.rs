use clap::Parser;

#[derive(Parser)]
#[command(
    name = "rrgt-server",
    about = "Team planning API: RRGT matrix provisioning and the Dial",
    version
)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Bind address
    #[arg(long, default_value = "0.0.0.0", env = "RRGT_HOST")]
    host: String,

    /// Bind port
    #[arg(long, default_value_t = 8090, env = "RRGT_PORT")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_target(false)
        .init();

    let pool = rrgt_core::db::connect(&cli.database_url).await?;
    rrgt_core::db::run_migrations(&pool).await?;

    rrgt_server::serve(pool, &cli.host, cli.port).await
}
