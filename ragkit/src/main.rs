use clap::Parser;
use ragkit::cli::{run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tokio::select! {
        result = run(cli) => {
            if let Err(e) = result {
                e.print();
                eprintln!("error: {e}");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\ninterrupted");
            std::process::exit(1);
        }
    }
}
