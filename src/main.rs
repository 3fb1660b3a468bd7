use clap::Parser;
use fashion::cli::Cli;

fn main() {
    let cli = Cli::parse();
    std::process::exit(fashion::run(cli));
}
