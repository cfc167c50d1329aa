use async_std::task;
use log::info;

use httpframe::config::{ServerConfig, config, set_config};
use httpframe::handler::SiteHandler;
use httpframe::net::server::Server;

fn main() -> std::io::Result<()> {
    env_logger::init();

    let cfg = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file(&path),
        None => ServerConfig::default(),
    };
    set_config(cfg);

    task::block_on(async {
        let server = Server::serve((config().address, config().port), SiteHandler).await?;
        info!(
            "{} listening on {}",
            config().server_name,
            server.local_addr()
        );
        async_std::future::pending::<()>().await;
        Ok(())
    })
}
