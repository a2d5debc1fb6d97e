//! Example: Arm and disarm a partition.

use envisalink_tpi::{ArmMode, Panel, TpiConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = TpiConfig::builder()
        .host("192.168.0.100")
        .password("user")
        .user_code("1234")
        .build();

    let panel = Panel::new(config);
    panel.on_partition_event(|id, status| println!("Partition {} -> {}", id, status));
    panel.connect().await?;

    // Show current partition states
    let status = panel.status();
    for (i, part) in status.partitions.iter().enumerate() {
        println!("Partition {}: {} (armed={})", i + 1, part, part.is_armed());
    }

    println!("\nArming partition 1 in stay mode...");
    match panel.arm(1, ArmMode::Stay).await {
        Ok(()) => println!("Arm command acknowledged"),
        Err(e) => println!("Error arming partition 1: {}", e),
    }

    // Wait a bit then disarm
    tokio::time::sleep(tokio::time::Duration::from_secs(5)).await;

    println!("\nDisarming partition 1...");
    match panel.disarm(1).await {
        Ok(()) => println!("Disarm command acknowledged"),
        Err(e) => println!("Error disarming partition 1: {}", e),
    }

    panel.disconnect().await;
    Ok(())
}
