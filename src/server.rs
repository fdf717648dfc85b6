use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use log::info;
use std::time::Instant;

use crate::config::Config;
use crate::handlers;

pub async fn run() -> std::io::Result<()> {
    let config = Config::new();
    let host = config.host.clone();
    let port = config.port;
    let max_upload_bytes = config.max_upload_bytes;

    print_banner(&host, port);
    info!(
        "Server running at http://{}:{}/ (options {:?}, join policy {:?})",
        host, port, config.recognizer.option_labels, config.recognizer.join_policy
    );

    let startup_time = Instant::now();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(web::Data::new(config.clone()))
            .app_data(web::PayloadConfig::new(max_upload_bytes))
            .app_data(web::JsonConfig::default().limit(max_upload_bytes))
            .configure(handlers::configure_api)
    })
    .bind((host, port))?
    .run()
    .await?;

    info!("Server stopped. Uptime: {:?}", startup_time.elapsed());
    Ok(())
}

fn print_banner(host: &str, port: u16) {
    let banner = r#"
  _____
 | ____|_  ____ _ _ __ ___
 |  _| \ \/ / _` | '_ ` _ \
 | |___ >  < (_| | | | | | |
 |_____/_/\_\__,_|_| |_| |_|
"#;
    println!("{}", banner);
    println!("         Exam importer started at: http://{}:{}\n", host, port);
}
