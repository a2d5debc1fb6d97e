// MIT License - Copyright (c) 2026 Peter Wright
// Envisalink TPI client
//
//! # envisalink-tpi
//!
//! Client for the Envisalink Third-Party Interface (TPI), the line-based TCP
//! protocol Envisalink modules expose for DSC alarm panels.
//!
//! The client logs in, mirrors the state of up to 64 zones, 8 partitions and
//! the keypad LEDs, and sends arm, disarm, status and clock commands.
//!
//! ## Quick Start
//!
//! ```no_run
//! use envisalink_tpi::{ArmMode, Panel, TpiConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TpiConfig::builder()
//!         .host("192.168.0.100")
//!         .password("user")
//!         .user_code("1234")
//!         .build();
//!
//!     let panel = Panel::new(config);
//!
//!     let mut events = panel.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     panel.connect().await?;
//!     panel.arm(1, ArmMode::Away).await?;
//!
//!     tokio::signal::ctrl_c().await?;
//!     panel.disconnect().await;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod constants;
pub mod devices;
pub mod error;
pub mod event;
pub mod panel;
pub mod protocol;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use codec::DecodeError;
pub use config::{ArmMode, TpiConfig, TpiConfigBuilder};
pub use devices::{KeypadStatus, PartitionStatus, ZoneStatus};
pub use error::{LoginFailure, RejectReason, Result, TpiError};
pub use event::{EventReceiver, PanelEvent};
pub use panel::Panel;
pub use protocol::Command;
pub use state::PanelStatus;
pub use transport::ConnectionState;
