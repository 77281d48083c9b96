#![deny(clippy::all)]
#![deny(clippy::dbg_macro)]

use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use anyhow::{Context, Error};
use env_logger::{Builder, Env};
use log::{error, info};
use std::sync::Arc;
use structopt::StructOpt;
use vault_aggregator::{Config, TokenCatalog};

mod api;
mod types;

use api::service::AppState;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "Vault aggregator API params",
    about = "Advanced parameters for the balance aggregator API."
)]
struct Opt {
    /// Set logging level
    #[structopt(short, long, default_value = "warn")]
    log: String,

    /// Set IP address
    #[structopt(long, short, default_value = "127.0.0.1")]
    ip: String,

    /// Set port number
    #[structopt(long, short, default_value = "8080")]
    port: u16,
}

#[tokio::main]
async fn main() -> ! {
    dotenv::dotenv().ok();

    let opt = Opt::from_args();

    Builder::from_env(Env::default().default_filter_or(opt.log.as_str())).init();

    let state = match load_state() {
        Ok(state) => Data::new(state),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    };

    loop {
        if let Err(e) = try_main(&opt.ip, opt.port, state.clone()).await {
            error!("{e}");
        } else {
            info!("Exiting gracefully");
            std::process::exit(0);
        }
    }
}

fn load_state() -> Result<AppState, Error> {
    let config = Config::from_env()?;
    let catalog = TokenCatalog::load(config.tokens_file())
        .with_context(|| format!("loading {}", config.tokens_file().display()))?;

    info!("Loaded {} tokens", catalog.len());

    Ok(AppState {
        config: Arc::new(config),
        catalog,
    })
}

async fn try_main(ip: &str, port: u16, state: Data<AppState>) -> Result<(), Error> {
    info!("Listening on http://{}:{}", ip, port);

    use api::router::*;

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .service(balances)
            .service(details)
    })
    .bind((ip, port))
    .map_err(Error::msg)?
    .run()
    .await
    .map_err(Error::msg)
}
