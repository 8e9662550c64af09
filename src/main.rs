use clap::Parser;
use facetag::Opts;
use facetag::cli::SubCommandExtend;
use facetag::config::SubCommand;

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    let result = match &opts.subcmd {
        SubCommand::Recognize(config) => config.run(&opts).await,
        SubCommand::List(config) => config.run(&opts).await,
        SubCommand::Rename(config) => config.run(&opts).await,
        SubCommand::Visibility(config) => config.run(&opts).await,
    };

    if opts.metrics {
        eprint!("{}", facetag::metrics::render()?);
    }
    result
}
