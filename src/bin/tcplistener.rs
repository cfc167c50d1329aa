//! Prints each line received over a raw TCP connection. Useful for watching
//! how a peer's writes arrive as arbitrarily chunked stream data.

use async_std::io::BufReader;
use async_std::net::TcpListener;
use async_std::prelude::*;
use async_std::task;
use log::{error, info};

const HOST: &str = "127.0.0.1:42069";

fn main() -> std::io::Result<()> {
    env_logger::init();

    task::block_on(async {
        let listener = TcpListener::bind(HOST).await?;
        info!("listening on {HOST}");

        loop {
            let (stream, peer) = listener.accept().await?;
            info!("connection accepted from {peer}");

            let mut lines = BufReader::new(&stream).lines();
            while let Some(line) = lines.next().await {
                match line {
                    Ok(line) => println!("read: {line}"),
                    Err(err) => {
                        error!("read error from {peer}: {err}");
                        break;
                    }
                }
            }

            info!("connection closed from {peer}");
        }
    })
}
