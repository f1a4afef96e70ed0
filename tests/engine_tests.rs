//! Engine Scenario Tests
//!
//! End-to-end behavior of the adaptive cache through its public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use adaptive_cache::cache::{AdaptiveCache, Context, EvictionStrategy, MIN_TTL};
use adaptive_cache::clock::MockClock;
use adaptive_cache::config::CacheConfig;
use adaptive_cache::error::CacheError;
use serde_json::json;

// == Helper Functions ==

fn mock_engine(config: CacheConfig) -> (AdaptiveCache<String, MockClock>, MockClock) {
    let clock = MockClock::new();
    let cache = AdaptiveCache::with_clock(config, clock.clone())
        .unwrap()
        .seeded(11);
    (cache, clock)
}

fn small(strategy: EvictionStrategy) -> CacheConfig {
    CacheConfig {
        max_cache_size: 10,
        eviction_strategy: strategy,
        ..CacheConfig::default()
    }
}

fn ctx() -> Context {
    Context::new()
}

// == Eviction ==

#[test]
fn test_lru_keeps_most_recent_keys() {
    let (cache, clock) = mock_engine(small(EvictionStrategy::Lru));

    for i in 0..15 {
        let key = format!("k{}", i);
        assert_eq!(cache.get(&key, &ctx()), None);
        cache.set(key, format!("v{}", i), None, ctx()).unwrap();
        clock.advance_secs(1);
        assert!(cache.len() <= 10);
    }

    for i in 0..5 {
        assert!(!cache.has(&format!("k{}", i)), "k{} should be evicted", i);
    }
    for i in 5..15 {
        assert_eq!(
            cache.peek(&format!("k{}", i)),
            Some(format!("v{}", i)),
            "k{} should survive",
            i
        );
    }
    assert_eq!(cache.get_statistics().evictions, 5);
}

#[test]
fn test_utility_based_evicts_lowest_utility_first() {
    let (cache, clock) = mock_engine(small(EvictionStrategy::UtilityBased));

    // a read miss before the write teaches k3's model to expect misses
    cache.get("k3", &ctx());
    for i in 0..10 {
        cache.set(format!("k{}", i), "v".to_string(), None, ctx()).unwrap();
        clock.advance_secs(1);
    }
    let k3_utility = cache.inspect("k3").unwrap().predicted_utility;
    assert!(k3_utility < 0.5, "utility {}", k3_utility);

    cache.set("k10", "v".to_string(), None, ctx()).unwrap();

    assert!(!cache.has("k3"));
    assert!(cache.has("k0"), "the oldest but neutral row survives");
    assert!(cache.has("k10"));
    assert_eq!(cache.len(), 10);
}

#[test]
fn test_lru_adaptive_prefers_idle_rows() {
    let (cache, clock) = mock_engine(small(EvictionStrategy::LruAdaptive));

    for i in 0..10 {
        cache.set(format!("k{}", i), "v".to_string(), None, ctx()).unwrap();
        clock.advance_secs(1);
    }
    assert!(cache.get("k0", &ctx()).is_some());

    cache.set("k10", "v".to_string(), None, ctx()).unwrap();

    assert!(cache.has("k0"), "recently read row is kept");
    assert!(!cache.has("k1"), "longest idle row goes first");
    assert_eq!(cache.len(), 10);
}

// == Adaptive TTL ==

#[test]
fn test_regular_access_yields_twice_the_interval() {
    let (cache, clock) = mock_engine(CacheConfig::default());

    for _ in 0..50 {
        cache.get("report", &ctx());
        clock.advance_secs(60);
    }
    assert!(cache.regularity("report") > 0.99);

    cache.set("report", "data".to_string(), None, ctx()).unwrap();

    let ttl = cache.inspect("report").unwrap().ttl_seconds;
    assert_eq!(ttl, 120);
    assert_eq!(cache.adaptive_ttl("report"), 120);
}

#[test]
fn test_unknown_key_uses_default_ttl() {
    let config = CacheConfig {
        default_ttl: 900,
        ..CacheConfig::default()
    };
    let (cache, _) = mock_engine(config);

    cache.set("fresh", "v".to_string(), None, ctx()).unwrap();

    assert_eq!(cache.inspect("fresh").unwrap().ttl_seconds, 900);
}

#[test]
fn test_burst_access_clamps_to_min_ttl() {
    let (cache, clock) = mock_engine(CacheConfig::default());

    for _ in 0..10 {
        cache.get("hot", &ctx());
        clock.advance(chrono::Duration::milliseconds(100));
    }

    assert_eq!(cache.adaptive_ttl("hot"), MIN_TTL);
}

// == Expiry And Loading ==

#[test]
fn test_short_ttl_expires_and_reloads() {
    let (cache, clock) = mock_engine(CacheConfig::default());
    let calls = AtomicUsize::new(0);

    cache.set("k", "first".to_string(), Some(1), ctx()).unwrap();
    assert_eq!(cache.get("k", &ctx()), Some("first".to_string()));

    clock.advance_secs(2);
    let value = cache
        .get_or_load("k", &ctx(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, CacheError>("second".to_string())
        })
        .unwrap();

    assert_eq!(value, "second");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.peek("k"), Some("second".to_string()));
    assert_eq!(cache.get_statistics().expirations, 1);
}

#[test]
fn test_loader_error_is_returned_unchanged() {
    let (cache, _) = mock_engine(CacheConfig::default());

    let result = cache.get_or_load("k", &ctx(), || {
        Err(CacheError::NotFound("upstream".to_string()))
    });

    assert!(matches!(result, Err(CacheError::NotFound(msg)) if msg == "upstream"));
    assert!(!cache.has("k"));
}

#[test]
fn test_concurrent_misses_share_one_load() {
    let cache: Arc<AdaptiveCache<String>> =
        Arc::new(AdaptiveCache::new(CacheConfig::default()).unwrap());
    let calls = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                cache
                    .get_or_load("shared", &Context::new(), || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(100));
                        Ok::<_, CacheError>("computed".to_string())
                    })
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), "computed");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_refresh_in_progress_serves_old_value_to_peers() {
    let config = CacheConfig {
        refresh_beta: 1e12,
        ..CacheConfig::default()
    };
    let cache: AdaptiveCache<String> = AdaptiveCache::new(config).unwrap().seeded(5);

    // a measurable recompute cost makes every later read draw an early refresh
    let first = cache
        .get_or_load("k", &ctx(), || {
            thread::sleep(Duration::from_millis(5));
            Ok::<_, CacheError>("v1".to_string())
        })
        .unwrap();
    assert_eq!(first, "v1");

    let loading = Barrier::new(2);
    let release = Barrier::new(2);

    thread::scope(|scope| {
        let refresher = scope.spawn(|| {
            cache
                .get_or_load("k", &ctx(), || {
                    loading.wait();
                    release.wait();
                    Ok::<_, CacheError>("v2".to_string())
                })
                .unwrap()
        });

        loading.wait();
        let peer_calls = AtomicUsize::new(0);
        let served = cache
            .get_or_load("k", &ctx(), || {
                peer_calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CacheError>("peer".to_string())
            })
            .unwrap();
        assert_eq!(served, "v1", "peer gets the still-valid value without waiting");
        assert_eq!(peer_calls.load(Ordering::SeqCst), 0);

        release.wait();
        assert_eq!(refresher.join().unwrap(), "v2");
    });

    assert_eq!(cache.peek("k"), Some("v2".to_string()));
    assert_eq!(cache.get_statistics().early_refreshes, 2);
}

#[test]
fn test_waiter_loads_itself_when_leader_fails() {
    let cache: AdaptiveCache<String> = AdaptiveCache::new(CacheConfig::default()).unwrap();
    let loading = Barrier::new(2);
    let fail = Barrier::new(2);
    let waiter_calls = AtomicUsize::new(0);

    thread::scope(|scope| {
        let leader = scope.spawn(|| {
            cache.get_or_load("k", &ctx(), || {
                loading.wait();
                fail.wait();
                Err(CacheError::NotFound("upstream down".to_string()))
            })
        });

        loading.wait();
        let waiter = scope.spawn(|| {
            cache
                .get_or_load("k", &ctx(), || {
                    waiter_calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CacheError>("recovered".to_string())
                })
                .unwrap()
        });
        // give the waiter time to queue behind the running load
        thread::sleep(Duration::from_millis(50));
        fail.wait();

        assert!(matches!(
            leader.join().unwrap(),
            Err(CacheError::NotFound(_))
        ));
        assert_eq!(waiter.join().unwrap(), "recovered");
    });

    assert_eq!(waiter_calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.peek("k"), Some("recovered".to_string()));
}

#[test]
fn test_concurrent_mixed_operations_stay_consistent() {
    let cache: Arc<AdaptiveCache<u64>> = Arc::new(
        AdaptiveCache::new(CacheConfig {
            max_cache_size: 50,
            ..CacheConfig::default()
        })
        .unwrap(),
    );

    let handles: Vec<_> = (0..4u64)
        .map(|t| {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..200u64 {
                    let key = format!("k{}", (i * 7 + t) % 80);
                    match i % 4 {
                        0 => {
                            cache.set(key, i, None, Context::new()).unwrap();
                        }
                        1 => {
                            cache.get(&key, &Context::new());
                        }
                        2 => {
                            cache.has(&key);
                        }
                        _ => {
                            cache.delete(&key);
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let stats = cache.get_statistics();
    assert!(stats.cache_size <= 50);
    assert_eq!(stats.total_requests, 200);
    assert_eq!(stats.cache_hits + stats.cache_misses, stats.total_requests);
}

// == Clear And Statistics ==

#[test]
fn test_clear_resets_learning_state() {
    let (cache, clock) = mock_engine(CacheConfig::default());
    for _ in 0..20 {
        cache.get("k", &ctx());
        clock.advance_secs(60);
    }
    cache.set("k", "v".to_string(), None, ctx()).unwrap();
    assert_eq!(cache.adaptive_ttl("k"), 120);

    cache.clear();

    assert!(cache.is_empty());
    assert_eq!(cache.adaptive_ttl("k"), CacheConfig::default().default_ttl);
    assert_eq!(cache.access_frequency("k"), 0.0);
    let stats = cache.get_statistics();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.models_count, 0);
    assert_eq!(stats.tracked_patterns, 0);
}

#[test]
fn test_context_feeds_the_model() {
    let (cache, clock) = mock_engine(CacheConfig::default());
    let mut context = Context::new();
    context.insert("user".to_string(), json!("u1"));

    cache.set("k", "v".to_string(), None, context.clone()).unwrap();
    for _ in 0..30 {
        assert!(cache.get("k", &context).is_some());
        clock.advance_secs(1);
    }

    let utility = cache.predicted_utility("k", &context);
    assert!(utility > 0.5, "repeated hits raise utility, got {}", utility);
    let stats = cache.get_statistics();
    assert_eq!(stats.cache_hits, 30);
    assert_eq!(stats.learning_cycles, 30);
}

// == Configuration ==

#[test]
fn test_config_from_json_rejects_bad_options() {
    let cases = [
        json!({"max_cache_size": 0}),
        json!({"default_ttl": 10}),
        json!({"adaptation_threshold": 1.5}),
        json!({"learning_window": 0}),
        json!({"eviction_strategy": "random"}),
        json!({"max_cache_sise": 10}),
        json!({"max_cache_size": "ten"}),
    ];

    for options in cases {
        let result = CacheConfig::from_json(options.clone());
        assert!(
            matches!(result, Err(CacheError::Configuration(_))),
            "{} should be rejected",
            options
        );
    }
}

#[test]
fn test_config_from_json_accepts_partial_options() {
    let config = CacheConfig::from_json(json!({
        "max_cache_size": 10,
        "eviction_strategy": "lru_adaptive"
    }))
    .unwrap();

    assert_eq!(config.max_cache_size, 10);
    assert_eq!(config.eviction_strategy, EvictionStrategy::LruAdaptive);
    assert_eq!(config.default_ttl, CacheConfig::default().default_ttl);
}
