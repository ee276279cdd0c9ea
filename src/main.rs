use actix_web::{App, HttpServer};
use breadcharts_server::{config::Config, db, log, server};
use color_eyre::eyre::{Report, WrapErr};
use tracing::info;

#[actix_rt::main]
async fn main() -> Result<(), Report> {
    log::init()?;
    let config = Config::from_env()?;

    let pool = db::new_pool(&config.database_url)
        .await
        .wrap_err_with(|| format!("Failed to open database {}", config.database_url))?;
    db::migrate(&pool).await.wrap_err("Failed to migrate database")?;

    let actors = server::start_system_actors(pool, config.voting);

    info!(address = config.bind_address.as_str(), "Starting WS server");

    HttpServer::new(move || {
        let actors = actors.clone();
        App::new().configure(move |cfg| server::configure(cfg, actors))
    })
    .bind(&config.bind_address)?
    .run()
    .await?;
    Ok(())
}
