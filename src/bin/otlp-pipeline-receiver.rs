use clap::Parser;
use otlp_pipeline_receiver::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => commands::execute_serve(args).await?,
        Commands::Transform(args) => commands::execute_transform(args)?,
    }

    Ok(())
}
