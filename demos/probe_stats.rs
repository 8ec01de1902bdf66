use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use linprobe::BackwardShift;
use linprobe::ErasePolicy;
use linprobe::HashTable;
use linprobe::Tombstone;
use siphasher::sip::SipHasher;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Erase by marking slots deleted instead of shifting entries back.
    #[arg(short = 't', long = "tombstone")]
    tombstone: bool,

    /// Number of remove/insert pairs to run after the initial fill.
    #[arg(short = 'r', long = "churn", default_value_t = 0)]
    churn: u64,
}

fn hash_u64(value: &u64) -> u64 {
    let mut hasher = SipHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn run<P: ErasePolicy>(args: &Args) {
    let mut table: HashTable<u64, u64, P> = HashTable::with_capacity(args.target_capacity);

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table to half its capacity with u64 keys...");

    let fill = (table.capacity() / 2) as u64;
    for key in 0..fill {
        table.insert_unique(hash_u64(&key), key, !key, hash_u64);
    }

    for step in 0..args.churn {
        let old = step % fill.max(1);
        table.remove(hash_u64(&old), |&k| k == old, hash_u64);
        let new = fill + step;
        table.insert_unique(hash_u64(&new), new, !new, hash_u64);
    }

    println!("Inserted {} values into table", table.len());
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.print_probe_histogram(hash_u64);
    table.debug_stats().print();
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating {} table with target capacity: {}",
        if args.tombstone { "Tombstone" } else { "BackwardShift" },
        args.target_capacity
    );

    if args.tombstone {
        run::<Tombstone>(&args);
    } else {
        run::<BackwardShift>(&args);
    }
}
