use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use ext_hash::HashMap as ExtHashMap;
use hashbrown::HashMap as HashbrownHashMap;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::collections::HashMap as StdHashMap;

trait TestKey: Clone + Eq + Hash {
    /// Key that will be inserted.
    fn hit(i: u64) -> Self;
    /// Key close to `hit(i)` that is never inserted.
    fn miss(i: u64) -> Self;
}

impl TestKey for u64 {
    fn hit(i: u64) -> Self {
        black_box(i)
    }

    fn miss(i: u64) -> Self {
        black_box(i | 1 << 62)
    }
}

impl TestKey for String {
    fn hit(i: u64) -> Self {
        black_box(format!("{i:7} "))
    }

    fn miss(i: u64) -> Self {
        black_box(format!("{i:7}-"))
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn bench_insert_random<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("insert_random_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter().copied() {
        let keys = (0..size as u64).map(K::hit).collect::<Vec<K>>();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("ext_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = ExtHashMap::new();
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = StdHashMap::new();
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = HashbrownHashMap::new();
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_insert_random_preallocated<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_preallocated_{}",
        core::any::type_name::<K>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter().copied() {
        let keys = (0..size as u64).map(K::hit).collect::<Vec<K>>();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("ext_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = ExtHashMap::with_capacity(size);
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = StdHashMap::with_capacity(size);
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = HashbrownHashMap::with_capacity(size);
                    for (i, key) in keys.into_iter().enumerate() {
                        black_box(map.insert(key, i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_get_hit<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("get_hit_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter().copied() {
        let mut lookups = (0..size as u64).map(K::hit).collect::<Vec<K>>();
        lookups.shuffle(&mut SmallRng::from_os_rng());

        let mut ext = ExtHashMap::new();
        let mut std_map = StdHashMap::new();
        let mut brown = HashbrownHashMap::new();
        for i in 0..size as u64 {
            ext.insert(K::hit(i), i);
            std_map.insert(K::hit(i), i);
            brown.insert(K::hit(i), i);
        }

        group.throughput(Throughput::Elements(lookups.len() as u64));
        group.bench_function(format!("ext_hash/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    black_box(ext.get(key).expect("hit key must be found"));
                }
            })
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    black_box(std_map.get(key).expect("hit key must be found"));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    black_box(brown.get(key).expect("hit key must be found"));
                }
            })
        });
    }

    group.finish();
}

fn bench_get_miss<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("get_miss_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter().copied() {
        let mut lookups = (0..size as u64).map(K::miss).collect::<Vec<K>>();
        lookups.shuffle(&mut SmallRng::from_os_rng());

        let mut ext = ExtHashMap::new();
        let mut std_map = StdHashMap::new();
        let mut brown = HashbrownHashMap::new();
        for i in 0..size as u64 {
            ext.insert(K::hit(i), i);
            std_map.insert(K::hit(i), i);
            brown.insert(K::hit(i), i);
        }

        group.throughput(Throughput::Elements(lookups.len() as u64));
        group.bench_function(format!("ext_hash/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    assert!(black_box(ext.get(key)).is_none());
                }
            })
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    assert!(black_box(std_map.get(key)).is_none());
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for key in &lookups {
                    assert!(black_box(brown.get(key)).is_none());
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("remove_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter().copied() {
        let keys = (0..size as u64).map(K::hit).collect::<Vec<K>>();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("ext_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut map = ExtHashMap::new();
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.clone(), i as u64);
                    }
                    let mut order = keys.clone();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (map, order)
                },
                |(mut map, order)| {
                    for key in &order {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("std/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut map = StdHashMap::new();
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.clone(), i as u64);
                    }
                    let mut order = keys.clone();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (map, order)
                },
                |(mut map, order)| {
                    for key in &order {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut map = HashbrownHashMap::new();
                    for (i, key) in keys.iter().enumerate() {
                        map.insert(key.clone(), i as u64);
                    }
                    let mut order = keys.clone();
                    order.shuffle(&mut SmallRng::from_os_rng());
                    (map, order)
                },
                |(mut map, order)| {
                    for key in &order {
                        black_box(map.remove(key));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<u64, 4>,
    bench_insert_random::<String, 3>,
    bench_insert_random_preallocated::<u64, 4>,
    bench_insert_random_preallocated::<String, 3>,
    bench_get_hit::<u64, 4>,
    bench_get_hit::<String, 3>,
    bench_get_miss::<u64, 4>,
    bench_get_miss::<String, 3>,
    bench_remove::<u64, 4>,
    bench_remove::<String, 3>,
);

criterion_main!(benches);
