use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use log::{error, info, warn};
use sensnet_core::time::{SystemTime, TimeSource};
use sensnet_server::{
    CollectionLoop, Command, Flow, Network, ServerConfig, ServerError, UdpRadio,
};

fn load_config() -> Result<ServerConfig, ServerError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("loading configuration from {}", path);
            ServerConfig::load(path)
        }
        None => Ok(ServerConfig::default()),
    }
}

/// Forward console lines to the collection loop
fn spawn_console() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn main() -> Result<(), ServerError> {
    env_logger::init();
    info!("starting base station v{}", sensnet_core::VERSION);

    let config = load_config()?;
    let clock = SystemTime;
    let mut network = Network::new(&config);

    if let Some(path) = &config.registry_path {
        if path.exists() {
            let loaded = network.load_registry(path, clock.now())?;
            info!("loaded {} sensors from {}", loaded, path.display());
        }
    }

    let radio = UdpRadio::bind(config.bind_socket_addr()?, config.peer_socket_addr()?)?;
    info!("listening on {}", radio.local_addr()?);

    let mut collection = CollectionLoop::new(radio, clock, network, config.receive_timeout_ms);
    if let Some(path) = &config.registry_path {
        collection = collection.with_registry_path(path);
    }

    let console = spawn_console();
    let default_window = Duration::from_secs(config.pairing_window_secs);
    collection.run(|network, now| {
        while let Ok(line) = console.try_recv() {
            if line.trim().is_empty() {
                continue;
            }
            let command = match line.parse::<Command>() {
                Ok(command) => command,
                Err(err) => {
                    warn!("{}", err);
                    continue;
                }
            };
            match command.execute(network, now, default_window) {
                Ok(Flow::Exit) => return true,
                Ok(Flow::Continue) => {}
                Err(err) => error!("'{}' failed: {}", line.trim(), err),
            }
        }
        false
    });

    Ok(())
}
