use super::super::args::*;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Explain(args) => super::explain::run(args).await,
        Command::Prompt(args) => super::prompt::run(args).await,
        Command::Show(args) => super::show::run(args).await,
    }
}
