use clap::Parser;
use panel_node::core::bootstrap::{DEFAULT_INSTALL_COMMAND, DEFAULT_LAUNCH_COMMAND};
use panel_node::utils::logger;
use panel_node::{Bootstrap, ShellRunner, TomlConfig};

#[derive(Parser)]
#[command(name = "bootstrap")]
#[command(about = "Install dependencies, then start the application")]
struct Args {
    /// TOML file with a [bootstrap] table
    #[arg(short, long)]
    config: Option<String>,

    /// Dependency install command
    #[arg(long)]
    install: Option<String>,

    /// Application launch command
    #[arg(long)]
    launch: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    let section = match &args.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => config.bootstrap,
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => Default::default(),
    };

    let install = args
        .install
        .or(section.install_command)
        .unwrap_or_else(|| DEFAULT_INSTALL_COMMAND.to_string());
    let launch = args
        .launch
        .or(section.launch_command)
        .unwrap_or_else(|| DEFAULT_LAUNCH_COMMAND.to_string());

    let code = Bootstrap::with_commands(ShellRunner, install, launch).run().await;
    std::process::exit(code);
}
