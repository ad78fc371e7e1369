// EsoxSolutions.SpecPool - Rust Port
// Thread-safe recycling pool matching values against specifications

// This is just a binary wrapper - the actual library is in lib.rs
// Run examples with: cargo run --example basic

use esox_specpool::{DelegateAssistant, SpecPool};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("EsoxSolutions.SpecPool v{}", env!("CARGO_PKG_VERSION"));
    info!("See demos/ directory for usage examples");

    // Quick demo: byte buffers matched on capacity
    let assistant = DelegateAssistant::builder()
        .with_create(|len: &usize| Vec::<u8>::with_capacity(*len))
        .with_acceptance(|buffer: &Vec<u8>, len: &usize, _| buffer.capacity() >= *len)
        .build()?;
    let pool = SpecPool::new(assistant);

    {
        let mut buffer = pool.acquire(&4096)?;
        buffer.extend_from_slice(b"frame");
        info!(capacity = buffer.capacity(), "Got buffer");
    }

    let reused = pool.acquire(&1024)?;
    info!(capacity = reused.capacity(), len = reused.len(), "Reused buffer");
    drop(reused);

    info!(available = pool.count(), "Available after return");
    Ok(())
}
