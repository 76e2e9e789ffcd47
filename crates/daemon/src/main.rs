// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::op::Op;
use cli::{
    args::Args, Alias, Build, Daemon, Health, Image, Init, Log, Mount, Pipe, Policy, Pull, Push,
    Rmi, Run, Stop, Version,
};

command_enum! {
    (Init, Init),
    (Daemon, Daemon),
    (Version, Version),
    (Health, Health),
    (Mount, Mount),
    (Pipe, Pipe),
    (Alias, Alias),
    (Policy, Policy),
    (Build, Build),
    (Pull, Pull),
    (Push, Push),
    (Image, Image),
    (Rmi, Rmi),
    (Log, Log),
    (Run, Run),
    (Stop, Stop),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config api_port > default port
    let remote = match cli::op::resolve_remote(args.remote, args.config_path.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: invalid daemon address: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            let output = output.to_string();
            if !output.is_empty() {
                println!("{}", output);
            }
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
