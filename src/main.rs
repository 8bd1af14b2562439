use clap::Parser;

use harness_mux::cli::{Cli, EnvOverrides};
use harness_mux::error::HarnessError;
use harness_mux::runtime::Runtime;
use harness_mux::logging;
use harness_mux::shutdown::{install_panic_restore_hook, restore_terminal_state};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let env = EnvOverrides::load();
    let _log_path = logging::init(false);
    install_panic_restore_hook();

    let exit_code = run(cli, env).await;
    std::process::exit(exit_code);
}

async fn run(cli: Cli, env: EnvOverrides) -> i32 {
    let runtime = match Runtime::bootstrap(&cli, &env).await {
        Ok(runtime) => runtime,
        Err(HarnessError::Terminal(message)) => {
            eprintln!("{message}");
            return 2;
        }
        Err(err) => {
            restore_terminal_state();
            eprintln!("startup failed: {err}");
            return 1;
        }
    };

    runtime.run().await
}
