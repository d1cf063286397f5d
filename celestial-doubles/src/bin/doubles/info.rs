//! Summary of a partitioned regions directory

use crate::cli::{Cli, InfoArgs};
use anyhow::Context;
use celestial_doubles::region::BucketStore;

pub fn run(args: &InfoArgs, cli: &Cli) -> anyhow::Result<()> {
    let store = BucketStore::open(&args.regions)
        .with_context(|| format!("Failed to open regions directory: {:?}", args.regions))?;
    let buckets = store.buckets()?;

    let mut total = 0u64;
    let mut largest = None;
    for key in &buckets {
        let len = store.bucket_len(*key)?;
        total += len;
        if largest.map_or(true, |(_, n)| len > n) {
            largest = Some((*key, len));
        }
        if cli.verbose {
            println!("{}: {}", key, len);
        }
    }

    let candidates = store
        .open_candidates()
        .with_context(|| format!("Failed to read candidate list in {:?}", args.regions))?;

    println!("Buckets: {}", buckets.len());
    println!("Stored records (including margin copies): {}", total);
    if !buckets.is_empty() {
        println!(
            "Average records per bucket: {:.1}",
            total as f64 / buckets.len() as f64
        );
    }
    if let Some((key, len)) = largest {
        println!("Largest bucket: {} ({} records)", key, len);
    }
    println!("Candidates: {}", candidates.total());
    Ok(())
}
