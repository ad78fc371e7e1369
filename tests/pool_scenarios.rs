//! End-to-end behaviour of the specification pool

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use esox_specpool::{
    Assistant, DelegateAssistant, PoolConfiguration, PoolError, Recycle, SpecPool,
};

/// Stand-in for a native resource that must be released explicitly.
#[derive(Debug)]
struct Texture {
    id: usize,
    width: u32,
    height: u32,
    disposals: Arc<AtomicUsize>,
    revivals: usize,
}

impl Recycle for Texture {
    fn revive(&mut self) {
        self.revivals += 1;
    }

    fn dispose(self) {
        self.disposals.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextureSpec {
    width: u32,
    height: u32,
}

struct TextureAssistant {
    next_id: AtomicUsize,
    created: AtomicUsize,
    gets: AtomicUsize,
    returns: AtomicUsize,
    disposals: Arc<AtomicUsize>,
    clear_at: usize,
}

impl TextureAssistant {
    fn new(clear_at: usize) -> Self {
        Self {
            next_id: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            returns: AtomicUsize::new(0),
            disposals: Arc::new(AtomicUsize::new(0)),
            clear_at,
        }
    }
}

impl Assistant<TextureSpec, Texture> for TextureAssistant {
    type Error = std::convert::Infallible;

    fn create(&self, spec: &TextureSpec) -> Result<Texture, Self::Error> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Texture {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            width: spec.width,
            height: spec.height,
            disposals: Arc::clone(&self.disposals),
            revivals: 0,
        })
    }

    fn meets_expectation(
        &self,
        value: &Texture,
        spec: &TextureSpec,
        remaining_tolerance: usize,
    ) -> bool {
        let exact = value.width == spec.width && value.height == spec.height;
        // on the last probe settle for anything at least as large
        let covers = value.width >= spec.width && value.height >= spec.height;
        exact || (remaining_tolerance == 1 && covers)
    }

    fn register_get(&self, _value: &Texture) {
        self.gets.fetch_add(1, Ordering::SeqCst);
    }

    fn register_return(&self, _value: &Texture) {
        self.returns.fetch_add(1, Ordering::SeqCst);
    }

    fn is_clear(&self) -> bool {
        self.returns.load(Ordering::SeqCst) >= self.clear_at
    }

    fn register_clear(&self, drained: usize) {
        let _ = self
            .returns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |returns| {
                Some(returns.saturating_sub(drained))
            });
    }
}

const SMALL: TextureSpec = TextureSpec { width: 64, height: 64 };
const LARGE: TextureSpec = TextureSpec { width: 512, height: 512 };

#[test]
fn released_tokens_come_back_in_fifo_order() {
    let created = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&created);
    let assistant = DelegateAssistant::builder()
        .with_create(move |_: &()| 1_000 + counter.fetch_add(1, Ordering::SeqCst))
        .build()
        .unwrap();
    let pool = SpecPool::new(assistant);

    for token in [10usize, 20, 30] {
        pool.release(token);
    }

    let a = pool.acquire_with_tolerance(&(), 8).unwrap();
    let b = pool.acquire_with_tolerance(&(), 8).unwrap();
    let c = pool.acquire_with_tolerance(&(), 8).unwrap();
    assert_eq!([*a, *b, *c], [10, 20, 30]);
    assert_eq!(created.load(Ordering::SeqCst), 0);

    let d = pool.acquire_with_tolerance(&(), 8).unwrap();
    assert_eq!(*d, 1_000);
    assert_eq!(created.load(Ordering::SeqCst), 1);
}

#[test]
fn zero_tolerance_builds_or_reports_absence() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));

    let built = pool.acquire_with_tolerance(&SMALL, 0).unwrap();
    assert_eq!(pool.assistant().created.load(Ordering::SeqCst), 1);
    drop(built);

    assert!(pool.try_acquire_with_tolerance(&SMALL, 0).is_none());
    assert_eq!(pool.assistant().created.load(Ordering::SeqCst), 1);
    assert_eq!(pool.count(), 1);
}

#[test]
fn matching_value_survives_round_trip() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let texture = pool.acquire_value(&LARGE).unwrap();
    let id = texture.id;
    pool.release(texture);

    let again = pool.try_acquire(&LARGE).unwrap();
    assert_eq!(again.id, id);
    assert!(pool.assistant().meets_expectation(&again, &LARGE, 8));
    assert_eq!(again.revivals, 1);
}

#[test]
fn acceptance_relaxes_on_last_probe() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let first = pool.acquire_value(&LARGE).unwrap();
    let second = pool.acquire_value(&LARGE).unwrap();
    let second_id = second.id;
    pool.release(first);
    pool.release(second);

    // the first probe is strict and requeues, the last one settles
    let handle = pool.try_acquire_with_tolerance(&SMALL, 2).unwrap();
    assert_eq!(handle.id, second_id);
    assert_eq!((handle.width, handle.height), (512, 512));
    assert_eq!(pool.get_metrics().rejected_probes, 1);
    assert_eq!(pool.count(), 1);
}

#[test]
fn disposing_twice_readmits_once() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let mut handle = pool.acquire(&SMALL).unwrap();
    handle.dispose();
    handle.dispose();
    drop(handle);

    assert_eq!(pool.count(), 1);
    assert_eq!(pool.assistant().returns.load(Ordering::SeqCst), 1);
    assert_eq!(pool.live_handles(), 0);
}

#[test]
fn unwrapped_value_is_not_requeued() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    pool.release(pool.acquire_value(&SMALL).unwrap());

    let handle = pool.acquire(&SMALL).unwrap();
    assert!(handle.is_temporary());
    let texture = handle.into_inner().unwrap();

    assert_eq!(pool.count(), 0);
    assert_eq!(pool.assistant().returns.load(Ordering::SeqCst), 1);
    assert_eq!(texture.width, 64);
}

#[test]
fn clear_disposes_every_value_once() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let textures: Vec<_> = (0..4).map(|_| pool.acquire_value(&SMALL).unwrap()).collect();
    for texture in textures {
        pool.release(texture);
    }
    assert_eq!(pool.count(), 4);

    assert_eq!(pool.clear(), 4);
    assert_eq!(pool.count(), 0);
    assert_eq!(pool.assistant().disposals.load(Ordering::SeqCst), 4);

    assert_eq!(pool.clear(), 0);
    assert_eq!(pool.assistant().disposals.load(Ordering::SeqCst), 4);
}

#[test]
fn watermark_flushes_after_release() {
    let pool = SpecPool::new(TextureAssistant::new(3));
    let handles: Vec<_> = (0..3).map(|_| pool.acquire(&SMALL).unwrap()).collect();
    let disposals = Arc::clone(&pool.assistant().disposals);

    drop(handles);

    assert_eq!(pool.count(), 0);
    assert_eq!(disposals.load(Ordering::SeqCst), 3);
    assert_eq!(pool.get_metrics().clears, 1);
}

#[test]
fn dropping_the_pool_disposes_bagged_values() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let disposals = Arc::clone(&pool.assistant().disposals);
    drop(pool.acquire(&SMALL).unwrap());
    drop(pool.acquire(&LARGE).unwrap());
    assert_eq!(pool.count(), 2);

    drop(pool);
    assert_eq!(disposals.load(Ordering::SeqCst), 2);
}

#[test]
fn handles_keep_the_pool_alive() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let disposals = Arc::clone(&pool.assistant().disposals);
    let handle = pool.acquire(&SMALL).unwrap();
    let observer = pool.clone();
    drop(pool);
    assert_eq!(observer.live_handles(), 1);
    drop(observer);

    assert_eq!(disposals.load(Ordering::SeqCst), 0);
    drop(handle);
    assert_eq!(disposals.load(Ordering::SeqCst), 1);
}

#[test]
fn forgotten_handles_show_in_live_count() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    let kept = pool.acquire(&SMALL).unwrap();
    std::mem::forget(pool.acquire(&SMALL).unwrap());
    assert_eq!(pool.live_handles(), 2);

    drop(kept);
    assert_eq!(pool.live_handles(), 1);
}

#[derive(Debug)]
struct SharedAtlas {
    layers: u32,
}

#[test]
fn shared_handles_can_be_pooled() {
    let assistant = DelegateAssistant::builder()
        .with_create(|layers: &u32| Arc::new(SharedAtlas { layers: *layers }))
        .with_acceptance(|atlas: &Arc<SharedAtlas>, layers: &u32, _| atlas.layers >= *layers)
        .build()
        .unwrap();
    let pool = SpecPool::new(assistant);

    let atlas = pool.acquire_value(&4).unwrap();
    let watcher = Arc::clone(&atlas);
    pool.release(atlas);

    let reused = pool.acquire(&2).unwrap();
    assert!(Arc::ptr_eq(&*reused, &watcher));
    drop(reused);

    assert_eq!(pool.clear(), 1);
    assert_eq!(Arc::strong_count(&watcher), 1);
    assert_eq!(watcher.layers, 4);
}

#[test]
fn float_values_can_be_pooled() {
    let pool = SpecPool::new(
        DelegateAssistant::builder()
            .with_create(|_: &()| 1.5f64)
            .build()
            .unwrap(),
    );
    pool.release(2.5);
    assert_eq!(pool.acquire_value(&()).unwrap(), 2.5);
}

#[test]
fn missing_create_strategy_is_rejected() {
    let result = DelegateAssistant::<TextureSpec, Texture>::builder()
        .with_acceptance(|_, _, _| true)
        .build();
    assert!(matches!(result, Err(PoolError::MissingCreateStrategy)));
}

#[test]
fn configured_default_tolerance_is_used() {
    let assistant = DelegateAssistant::builder()
        .with_create(|spec: &u32| *spec)
        .with_acceptance(|value: &u32, spec: &u32, _| value == spec)
        .build()
        .unwrap();
    let pool =
        SpecPool::with_configuration(assistant, PoolConfiguration::new().with_default_tolerance(2));
    for value in [1, 2, 3] {
        pool.release(value);
    }

    assert!(pool.try_acquire(&3).is_none());
    assert_eq!(pool.get_metrics().probes, 2);
    assert_eq!(pool.try_acquire_value(&3), Some(3));
}

#[test]
fn metrics_track_hits_and_misses() {
    let pool = SpecPool::new(TextureAssistant::new(usize::MAX));
    drop(pool.acquire(&SMALL).unwrap());
    drop(pool.acquire(&SMALL).unwrap());

    let metrics = pool.get_metrics();
    assert_eq!(metrics.hits, 1);
    assert_eq!(metrics.misses, 1);
    assert_eq!(metrics.creations, 1);
    assert_eq!(metrics.returns, 2);
    assert_eq!(pool.assistant().gets.load(Ordering::SeqCst), 2);
    assert!((metrics.hit_rate() - 0.5).abs() < f64::EPSILON);
    assert_eq!(pool.export_metrics()["available_values"], "1");
}
