use clap::Parser;
use client::config::{Args, ClientConfig};
use client::network::Client;
use log::{error, info};
use macroquad::window::Conf;
use macroquad::Window;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let config = ClientConfig::try_from(args)?;

    info!("Starting client...");
    info!("Connecting to: {}", config.server_addr);
    if !config.fake_ping.is_zero() {
        info!("Simulating {}ms latency", config.fake_ping.as_millis());
    }
    info!("Controls: arrow keys or WASD to steer, swipe on touch screens");

    let conf = Conf {
        window_title: format!("Snake - {}", config.nickname),
        window_width: config.window_width as i32,
        window_height: config.window_height as i32,
        window_resizable: true,
        ..Default::default()
    };

    Window::from_config(conf, async move {
        let client = match Client::new(config) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to start client: {}", e);
                return;
            }
        };

        if let Err(e) = client.run().await {
            error!("Client stopped: {}", e);
        }
    });

    Ok(())
}
