use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use clap::ValueEnum;
use vitl_table::DeletionPolicy;
use vitl_table::HashTable;
use vitl_table::hash_table::Entry;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Policy {
    Backshift,
    Tombstone,
}

impl From<Policy> for DeletionPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::Backshift => DeletionPolicy::Backshift,
            Policy::Tombstone => DeletionPolicy::Tombstone,
        }
    }
}

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Percentage of the inserted values to remove afterwards.
    #[arg(short = 'r', long = "remove_percent", default_value_t = 0)]
    remove_percent: u8,

    #[arg(short = 'p', long = "policy", value_enum, default_value_t = Policy::Backshift)]
    policy: Policy,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {} ({:?} deletion)",
        args.target_capacity, args.policy
    );

    let mut table: HashTable<u64> =
        HashTable::with_capacity_and_policy(args.target_capacity, args.policy.into());

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table up to its load limit of {}...", table.max_load());

    let num_values = table.max_load();
    for i in 0..num_values {
        let value = i as u64;
        let hash = hash_u64(value);

        match table.try_entry(hash, |&v| v == value) {
            Ok(Entry::Vacant(entry)) => {
                entry.insert(value);
            }
            Ok(Entry::Occupied(_)) => {
                panic!("Value already exists in table: {}", value);
            }
            Err(err) => {
                eprintln!("Stopping after {} values: {}", table.len(), err);
                break;
            }
        }
    }

    let to_remove = num_values * args.remove_percent.min(100) as usize / 100;
    for i in 0..to_remove {
        let value = i as u64;
        table.remove(hash_u64(value), |&v| v == value);
    }

    println!(
        "Table holds {} values after removing {}",
        table.len(),
        to_remove
    );
    println!(
        "Final load factor: {:.2}%",
        (table.len() as f64 / table.capacity() as f64) * 100.0
    );

    table.probe_histogram().print();
    table.debug_stats().print();
}
