use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::BenchmarkGroup;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::measurement::WallTime;
use hashbrown::hash_table::Entry as HashbrownEntry;
use hashbrown::hash_table::HashTable as HashbrownHashTable;
use linprobe::BackwardShift;
use linprobe::ErasePolicy;
use linprobe::HashTable;
use linprobe::Tombstone;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::distr::Distribution;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

trait TestKey: Clone + Eq {
    type Value: Clone;

    fn new(seed: u64) -> Self;
    fn value(seed: u64) -> Self::Value;

    fn hash_key(&self) -> u64;
}

#[derive(Clone, PartialEq, Eq)]
struct StringKey(String);

impl TestKey for StringKey {
    type Value = u64;

    fn new(seed: u64) -> Self {
        black_box(Self(format!("key_{seed:016X}")))
    }

    fn value(seed: u64) -> u64 {
        seed
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
struct SmallKey(u64);

impl TestKey for SmallKey {
    type Value = u64;

    fn new(seed: u64) -> Self {
        black_box(Self(seed))
    }

    fn value(seed: u64) -> u64 {
        !seed
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
struct LargeValueKey(String);

impl TestKey for LargeValueKey {
    type Value = [u8; 256];

    fn new(seed: u64) -> Self {
        black_box(Self(format!("key_{seed:064b}")))
    }

    fn value(seed: u64) -> [u8; 256] {
        let mut value = [0u8; 256];
        for (i, byte) in value.iter_mut().enumerate() {
            *byte = ((seed >> ((i % 8) * 8)) & 0xFF) as u8;
        }
        value
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.0.hash(&mut hasher);
        hasher.finish()
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

type Item<K> = (u64, K, <K as TestKey>::Value);

fn random_items<K: TestKey>(count: usize) -> Vec<Item<K>> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let seed = rng.try_next_u64().unwrap();
            let key = K::new(seed);
            (key.hash_key(), key, K::value(seed))
        })
        .collect()
}

fn shuffled<T: Clone>(items: &[T]) -> Vec<T> {
    let mut items = items.to_vec();
    items.shuffle(&mut SmallRng::from_os_rng());
    items
}

fn fill<K: TestKey, P: ErasePolicy>(items: &[Item<K>]) -> HashTable<K, K::Value, P> {
    let mut table = HashTable::new();
    for (hash, key, value) in items.iter().cloned() {
        table.insert_unique(hash, key, value, K::hash_key);
    }
    table
}

fn fill_hashbrown<K: TestKey>(items: &[Item<K>]) -> HashbrownHashTable<(K, K::Value)> {
    let mut table = HashbrownHashTable::new();
    for (hash, key, value) in items.iter().cloned() {
        table.insert_unique(hash, (key, value), |(k, _)| k.hash_key());
    }
    table
}

fn group<'a>(c: &'a mut Criterion, name: &str) -> BenchmarkGroup<'a, WallTime> {
    let mut group = c.benchmark_group(name);
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));
    group
}

fn bench_insert_random<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(
        c,
        &format!("insert_random_{}", core::any::type_name::<K>()),
    );

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        fn run<K: TestKey, P: ErasePolicy>(items: Vec<Item<K>>) -> HashTable<K, K::Value, P> {
            let mut table = HashTable::new();
            for (hash, key, value) in items {
                if table.find(hash, |k| *k == key).is_none() {
                    table.insert_unique(hash, key, value, K::hash_key);
                }
            }
            table
        }

        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter_batched(
                || shuffled(&items),
                |items| black_box(run::<K, BackwardShift>(items)),
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter_batched(
                || shuffled(&items),
                |items| black_box(run::<K, Tombstone>(items)),
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || shuffled(&items),
                |items| {
                    let mut table = HashbrownHashTable::new();
                    for (hash, key, value) in items {
                        match table.entry(hash, |(k, _)| *k == key, |(k, _)| k.hash_key()) {
                            HashbrownEntry::Vacant(entry) => {
                                black_box(entry.insert((key, value)));
                            }
                            HashbrownEntry::Occupied(_) => {}
                        }
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("find_hit_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        let probes = shuffled(&items);
        group.throughput(Throughput::Elements(size as u64));

        let backward_shift = fill::<K, BackwardShift>(&items);
        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(backward_shift.find(*hash, |k| k == key));
                }
            })
        });

        let tombstone = fill::<K, Tombstone>(&items);
        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(tombstone.find(*hash, |k| k == key));
                }
            })
        });

        let hashbrown = fill_hashbrown::<K>(&items);
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(hashbrown.find(*hash, |(k, _)| k == key));
                }
            })
        });
    }

    group.finish();
}

fn bench_find_miss<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("find_miss_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        let probes = random_items::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        let backward_shift = fill::<K, BackwardShift>(&items);
        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(backward_shift.find(*hash, |k| k == key));
                }
            })
        });

        let tombstone = fill::<K, Tombstone>(&items);
        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(tombstone.find(*hash, |k| k == key));
                }
            })
        });

        let hashbrown = fill_hashbrown::<K>(&items);
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for (hash, key, _) in &probes {
                    black_box(hashbrown.find(*hash, |(k, _)| k == key));
                }
            })
        });
    }

    group.finish();
}

fn bench_remove<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("remove_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        let order = shuffled(&items);
        group.throughput(Throughput::Elements(size as u64));

        fn run<K: TestKey, P: ErasePolicy>(
            mut table: HashTable<K, K::Value, P>,
            order: &[Item<K>],
        ) -> HashTable<K, K::Value, P> {
            for (hash, key, _) in order {
                black_box(table.remove(*hash, |k| k == key, K::hash_key));
            }
            table
        }

        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter_batched(
                || fill::<K, BackwardShift>(&items),
                |table| black_box(run(table, &order)),
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter_batched(
                || fill::<K, Tombstone>(&items),
                |table| black_box(run(table, &order)),
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || fill_hashbrown::<K>(&items),
                |mut table| {
                    for (hash, key, _) in &order {
                        if let Ok(entry) = table.find_entry(*hash, |(k, _)| k == key) {
                            black_box(entry.remove());
                        }
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_iteration<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("iteration_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        let backward_shift = fill::<K, BackwardShift>(&items);
        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter(|| {
                for entry in backward_shift.iter() {
                    black_box(entry);
                }
            })
        });

        let tombstone = fill::<K, Tombstone>(&items);
        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter(|| {
                for entry in tombstone.iter() {
                    black_box(entry);
                }
            })
        });

        let hashbrown = fill_hashbrown::<K>(&items);
        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for entry in hashbrown.iter() {
                    black_box(entry);
                }
            })
        });
    }

    group.finish();
}

fn bench_drain<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("drain_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let items = random_items::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter_batched(
                || fill::<K, BackwardShift>(&items),
                |mut table| {
                    for entry in table.drain() {
                        black_box(entry);
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter_batched(
                || fill::<K, Tombstone>(&items),
                |mut table| {
                    for entry in table.drain() {
                        black_box(entry);
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || fill_hashbrown::<K>(&items),
                |mut table| {
                    for entry in table.drain() {
                        black_box(entry);
                    }
                    table
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

#[derive(Clone, Copy)]
enum Op {
    Insert(usize),
    Find(usize),
    Remove(usize),
}

/// Builds a skewed operation stream: keys drawn from a Zipf distribution over
/// a key space twice the target size, with inserts, finds and removes mixed
/// 2:2:1.
fn zipf_ops(size: usize, exponent: f32) -> Vec<Op> {
    let mut rng = SmallRng::seed_from_u64(size as u64);
    let keys = Zipf::new((size * 2) as f32, exponent).unwrap();
    (0..size * 4)
        .map(|_| {
            let key = keys.sample(&mut rng) as usize - 1;
            match rng.random_range(0..5) {
                0 | 1 => Op::Insert(key),
                2 | 3 => Op::Find(key),
                _ => Op::Remove(key),
            }
        })
        .collect()
}

fn bench_mixed_zipf<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    for exponent in [0.8f32, 1.2] {
        let mut group = group(
            c,
            &format!(
                "mixed_zipf_{exponent:.01}_{}",
                core::any::type_name::<K>()
            ),
        );

        for &size in &SIZES[..=MAX_SIZE] {
            let pool = random_items::<K>(size * 2);
            let ops = zipf_ops(size, exponent);
            group.throughput(Throughput::Elements(ops.len() as u64));

            fn run<K: TestKey, P: ErasePolicy>(pool: &[Item<K>], ops: &[Op]) -> usize {
                let mut table: HashTable<K, K::Value, P> = HashTable::new();
                let mut hits = 0;
                for op in ops {
                    match *op {
                        Op::Insert(i) => {
                            let (hash, key, value) = &pool[i];
                            if table.find(*hash, |k| k == key).is_none() {
                                table.insert_unique(*hash, key.clone(), value.clone(), K::hash_key);
                            }
                        }
                        Op::Find(i) => {
                            let (hash, key, _) = &pool[i];
                            hits += usize::from(table.find(*hash, |k| k == key).is_some());
                        }
                        Op::Remove(i) => {
                            let (hash, key, _) = &pool[i];
                            black_box(table.remove(*hash, |k| k == key, K::hash_key));
                        }
                    }
                }
                hits
            }

            group.bench_function(format!("backward_shift/{size}"), |b| {
                b.iter(|| black_box(run::<K, BackwardShift>(&pool, &ops)))
            });

            group.bench_function(format!("tombstone/{size}"), |b| {
                b.iter(|| black_box(run::<K, Tombstone>(&pool, &ops)))
            });

            group.bench_function(format!("hashbrown/{size}"), |b| {
                b.iter(|| {
                    let mut table = HashbrownHashTable::<(K, K::Value)>::new();
                    let mut hits = 0usize;
                    for op in &ops {
                        match *op {
                            Op::Insert(i) => {
                                let (hash, key, value) = &pool[i];
                                if let HashbrownEntry::Vacant(entry) = table.entry(
                                    *hash,
                                    |(k, _)| k == key,
                                    |(k, _)| k.hash_key(),
                                ) {
                                    entry.insert((key.clone(), value.clone()));
                                }
                            }
                            Op::Find(i) => {
                                let (hash, key, _) = &pool[i];
                                hits += usize::from(table.find(*hash, |(k, _)| k == key).is_some());
                            }
                            Op::Remove(i) => {
                                let (hash, key, _) = &pool[i];
                                if let Ok(entry) = table.find_entry(*hash, |(k, _)| k == key) {
                                    black_box(entry.remove());
                                }
                            }
                        }
                    }
                    black_box(hits)
                })
            });
        }

        group.finish();
    }
}

/// Inserts and removes alternately so tombstones pile up under `Tombstone`.
fn bench_churn<K: TestKey, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = group(c, &format!("churn_{}", core::any::type_name::<K>()));

    for &size in &SIZES[..=MAX_SIZE] {
        let resident = random_items::<K>(size / 4);
        let transient = random_items::<K>(size);
        group.throughput(Throughput::Elements(size as u64 * 2));

        fn run<K: TestKey, P: ErasePolicy>(
            mut table: HashTable<K, K::Value, P>,
            transient: &[Item<K>],
        ) -> HashTable<K, K::Value, P> {
            for (hash, key, value) in transient {
                table.insert_unique(*hash, key.clone(), value.clone(), K::hash_key);
                black_box(table.remove(*hash, |k| k == key, K::hash_key));
            }
            table
        }

        group.bench_function(format!("backward_shift/{size}"), |b| {
            b.iter_batched(
                || fill::<K, BackwardShift>(&resident),
                |table| black_box(run(table, &transient)),
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("tombstone/{size}"), |b| {
            b.iter_batched(
                || fill::<K, Tombstone>(&resident),
                |table| black_box(run(table, &transient)),
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || fill_hashbrown::<K>(&resident),
                |mut table| {
                    for (hash, key, value) in &transient {
                        table.insert_unique(*hash, (key.clone(), value.clone()), |(k, _)| {
                            k.hash_key()
                        });
                        if let Ok(entry) = table.find_entry(*hash, |(k, _)| k == key) {
                            black_box(entry.remove());
                        }
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallKey, 4>,
    bench_insert_random::<StringKey, 4>,
    bench_insert_random::<LargeValueKey, 2>,
    bench_find_hit::<SmallKey, 4>,
    bench_find_hit::<StringKey, 4>,
    bench_find_hit::<LargeValueKey, 2>,
    bench_find_miss::<SmallKey, 4>,
    bench_find_miss::<StringKey, 4>,
    bench_find_miss::<LargeValueKey, 2>,
    bench_remove::<SmallKey, 4>,
    bench_remove::<StringKey, 4>,
    bench_remove::<LargeValueKey, 2>,
    bench_iteration::<SmallKey, 4>,
    bench_iteration::<StringKey, 4>,
    bench_iteration::<LargeValueKey, 2>,
    bench_drain::<SmallKey, 4>,
    bench_drain::<StringKey, 4>,
    bench_drain::<LargeValueKey, 2>,
    bench_mixed_zipf::<SmallKey, 3>,
    bench_mixed_zipf::<StringKey, 3>,
    bench_churn::<SmallKey, 4>,
    bench_churn::<StringKey, 4>,
    bench_churn::<LargeValueKey, 2>,
);

criterion_main!(benches);
