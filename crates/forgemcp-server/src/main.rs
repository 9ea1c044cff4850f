use clap::Parser;
use forgemcp::Result;
use forgemcp_server::{
    config::{Cli, Command},
    logging, run_stdio, run_tools,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level.as_deref())?;

    match cli.command {
        Command::Stdio(args) => run_stdio(args.resolve()?).await,
        Command::Tools(args) => {
            print!("{}", run_tools(&args)?);
            Ok(())
        }
    }
}
