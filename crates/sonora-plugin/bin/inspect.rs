//! Print the port table of an installed LV2 plugin, or list every plugin.
//!
//! ```text
//! sonora-inspect                      # list plugins
//! sonora-inspect <uri> [sample-rate]  # ports, then a test instantiation
//! ```

use sonora_plugin::{LilvBackend, PluginCatalog, PluginSlot, PortKind, Result};
use std::env;
use std::sync::Arc;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let catalog = PluginCatalog::new(Arc::new(LilvBackend::new()));
    let mut args = env::args().skip(1);

    let Some(uri) = args.next() else {
        for plugin in catalog.plugins()? {
            println!(
                "{:<40} {} in / {} out  {}",
                plugin.name, plugin.audio_inputs, plugin.audio_outputs, plugin.uri
            );
        }
        return Ok(());
    };

    let sample_rate = args
        .next()
        .and_then(|rate| rate.parse::<u32>().ok())
        .unwrap_or(48000);

    let descriptor = catalog.resolve(&uri)?;
    println!("{} <{}>", descriptor.name(), descriptor.uri());
    for feature in descriptor.required_features() {
        println!("  requires {feature}");
    }

    let ports = descriptor.ports();
    println!(
        "{} ports, {} audio in, {} audio out ({:?})",
        ports.len(),
        ports.audio_inputs(),
        ports.audio_outputs(),
        ports.channel_layout()
    );
    for port in ports.iter() {
        let kind = match port.kind {
            PortKind::Control(range) => {
                format!("control [{} .. {}] = {}", range.min, range.max, range.default)
            }
            PortKind::Audio => "audio".to_string(),
            PortKind::Unsupported => "unsupported".to_string(),
        };
        println!(
            "  {:>3} {:<20} {:<10?} {}",
            port.index, port.symbol, port.direction, kind
        );
    }
    for fault in ports.faults() {
        println!("  ! {fault}");
    }

    let slot = PluginSlot::new(descriptor, 1024);
    slot.create(sample_rate)?;
    tracing::info!("Instantiated at {} Hz", sample_rate);
    slot.destroy();

    Ok(())
}
