use clap::Parser;
use log::error;

use exam_importer::cli::{self, Cli, Commands};
use exam_importer::server;

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Commands::Serve) | None => actix_web::rt::System::new()
            .block_on(server::run())
            .map_err(anyhow::Error::from),
        Some(Commands::Parse { file, format, output }) => {
            cli::handle_parse(&file, format, output.as_deref())
        }
        Some(Commands::Scan { dir }) => cli::handle_scan(&dir),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
