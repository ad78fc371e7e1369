//! # EsoxSolutions.SpecPool (Rust Port)
//!
//! Thread-safe recycling pool for expensive resources, matched against a
//! caller supplied specification instead of handed out blindly.
//!
//! ## Features
//!
//! - Lock-free value bag and shell bag backed by crossbeam queues
//! - Bounded probing: at most `tolerance` candidates are inspected per acquisition
//! - Pluggable [`Assistant`] policy for creation, matching and flushing
//! - Automatic return of values via RAII (Drop trait)
//! - Ownership transfer with [`Pooled::into_inner`] and [`SpecPool::acquire_value`]
//! - Watermark driven flushing with optional per-value disposal
//! - Metrics and Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use esox_specpool::{DelegateAssistant, SpecPool};
//!
//! let assistant = DelegateAssistant::builder()
//!     .with_create(|size: &(u32, u32)| vec![0u32; (size.0 * size.1) as usize])
//!     .with_acceptance(|pixels: &Vec<u32>, size: &(u32, u32), _| {
//!         pixels.capacity() >= (size.0 * size.1) as usize
//!     })
//!     .build()
//!     .unwrap();
//! let pool = SpecPool::new(assistant);
//!
//! {
//!     let target = pool.acquire(&(64, 64)).unwrap();
//!     println!("Got target with {} pixels", target.len());
//!     // Value automatically returned when `target` goes out of scope
//! }
//! assert_eq!(pool.count(), 1);
//! ```

mod assistant;
mod config;
mod errors;
mod metrics;
mod pool;
mod pooled;
mod recycle;

pub use assistant::{
    Assistant, DelegateAssistant, DelegateAssistantBuilder, DEFAULT_CLEAR_WATERMARK,
};
pub use config::{PoolConfiguration, DEFAULT_MAX_SHELLS, DEFAULT_TOLERANCE};
pub use errors::{PoolError, PoolResult};
pub use metrics::{MetricsExporter, PoolMetrics};
pub use pool::SpecPool;
pub use pooled::Pooled;
pub use recycle::Recycle;
