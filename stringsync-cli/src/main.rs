use clap::Parser;
use stringsync_cli::{Args, Settings, run::run};
use tracing_subscriber::EnvFilter;

/// HTTP client internals stay at warn unless RUST_LOG says otherwise.
fn init_tracing(trace: bool) {
    let default = if trace {
        "debug,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let args = Args::parse();
    let env = |name: &str| std::env::var(name).ok();

    let settings = match Settings::resolve(args, &env) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(settings.log_trace);

    if let Err(e) = run(&settings) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
