mod boot2;

use clap::{Parser, Subcommand};

/// xtask command-line interface
#[derive(Parser)]
#[command(name = "xtask", version, about = "xipblink auxiliary tasks")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build every feature combination and check the boot block of each
    Boot2(boot2::Boot2Args),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Boot2(args) => {
            if let Err(e) = boot2::run(args) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
    }
}
