//! Example: Subscribe to zone status events and print changes.

use envisalink_tpi::{Panel, PanelEvent, TpiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = TpiConfig::builder()
        .host("192.168.0.100")
        .password("user")
        .build();

    let panel = Panel::new(config);
    let mut events = panel.subscribe();
    panel.connect().await?;

    let status = panel.status();
    for (zone_id, zone) in status.known_zones() {
        println!("Zone {}: {}", zone_id, zone);
    }

    println!("Listening for zone events (Ctrl+C to stop)...\n");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(PanelEvent::ZoneChanged { zone_id, status }) => {
                        println!("Zone {} -> {}", zone_id, status);
                    }
                    Ok(PanelEvent::Disconnected) => {
                        println!("Panel disconnected!");
                        break;
                    }
                    Ok(event) => {
                        println!("Event: {:?}", event);
                    }
                    Err(e) => {
                        println!("Event channel error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nDisconnecting...");
                break;
            }
        }
    }

    panel.disconnect().await;
    Ok(())
}
