//! Basic usage examples for SpecPool

use esox_specpool::{DelegateAssistant, PoolConfiguration, Recycle, SpecPool};

fn main() {
    println!("=== EsoxSolutions.SpecPool - Basic Examples ===\n");

    // Example 1: Simple pool with buffers
    simple_pool();

    // Example 2: Matching on a specification
    matching_pool();

    // Example 3: Taking ownership
    ownership();

    // Example 4: Disposal and metrics
    disposal_and_metrics();
}

fn simple_pool() {
    println!("1. Simple Pool:");
    let assistant = DelegateAssistant::builder()
        .with_create(|_: &()| String::with_capacity(256))
        .build()
        .unwrap();
    let pool = SpecPool::new(assistant);

    {
        let mut text = pool.acquire(&()).unwrap();
        text.push_str("hello");
        println!("   Got value: {}", *text);
        // Value automatically returned (and reset) when dropped
    }

    println!("   Available after return: {}\n", pool.count());
}

fn matching_pool() {
    println!("2. Matching Pool:");
    let assistant = DelegateAssistant::builder()
        .with_create(|len: &usize| Vec::<f32>::with_capacity(*len))
        .with_acceptance(|buffer: &Vec<f32>, len: &usize, remaining| {
            // exact size while budget lasts, anything big enough at the end
            buffer.capacity() == *len || (remaining == 1 && buffer.capacity() >= *len)
        })
        .build()
        .unwrap();
    let pool =
        SpecPool::with_configuration(assistant, PoolConfiguration::new().with_default_tolerance(4));

    pool.release(Vec::with_capacity(1024));
    pool.release(Vec::with_capacity(64));

    let small = pool.acquire(&64).unwrap();
    println!("   Asked for 64, got capacity {}", small.capacity());

    let none = pool.try_acquire_with_tolerance(&4096, 8);
    let found = if none.is_some() { "Found" } else { "None" };
    println!("   Asked for 4096 without building: {}\n", found);
}

fn ownership() {
    println!("3. Taking Ownership:");
    let assistant = DelegateAssistant::builder()
        .with_create(|id: &u32| *id)
        .build()
        .unwrap();
    let pool = SpecPool::new(assistant);

    pool.release(7);
    let owned = pool.acquire_value(&0).unwrap();
    println!("   Owned value: {}", owned);
    println!("   Available: {}, spare shells: {}\n", pool.count(), pool.shell_count());
}

struct Surface {
    name: &'static str,
}

impl Recycle for Surface {
    fn dispose(self) {
        println!("   Disposing surface {}", self.name);
    }
}

fn disposal_and_metrics() {
    println!("4. Disposal and Metrics:");
    let assistant = DelegateAssistant::builder()
        .with_create(|name: &&'static str| Surface { name: *name })
        .with_acceptance(|surface: &Surface, name: &&'static str, _| surface.name == *name)
        .with_watermark(3)
        .build()
        .unwrap();
    let pool = SpecPool::new(assistant);

    for name in ["albedo", "normal", "depth"] {
        pool.release(Surface { name });
    }
    println!("   Available after watermark flush: {}", pool.count());

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
