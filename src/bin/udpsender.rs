//! Reads lines from stdin and sends each one as a UDP datagram, for feeding
//! the `tcplistener`'s UDP-facing counterparts or any packet sink.

use std::io::Write as _;

use async_std::io;
use async_std::net::UdpSocket;
use async_std::task;

const HOST: &str = "127.0.0.1:42069";

fn main() -> std::io::Result<()> {
    env_logger::init();

    task::block_on(async {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        socket.connect(HOST).await?;
        println!("Sending lines to {HOST}.");

        let stdin = io::stdin();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line).await? == 0 {
                return Ok(());
            }
            socket.send(line.as_bytes()).await?;
        }
    })
}
