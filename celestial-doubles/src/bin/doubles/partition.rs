//! Raw catalog partitioning

use crate::cli::{Cli, PartitionArgs};
use anyhow::Context;
use celestial_doubles::config::PartitionConfig;
use celestial_doubles::region::{BucketStore, PartitionStats, Partitioner};
use celestial_doubles::ucac4::{ZoneReader, FIRST_ZONE, LAST_ZONE};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;

pub fn run(args: &PartitionArgs, cli: &Cli) -> anyhow::Result<()> {
    validate_args(args)?;
    let config = build_config(args)?;
    print_plan(args, &config);

    let store = if args.clean {
        BucketStore::create_clean(&args.output)
    } else {
        BucketStore::create(&args.output)
    }
    .with_context(|| format!("Failed to prepare output directory: {:?}", args.output))?;

    let start = Instant::now();
    let mut partitioner = Partitioner::new(store, &config)?;
    let pb = create_progress_bar((args.last_zone - args.first_zone + 1) as u64);

    for zone in args.first_zone..=args.last_zone {
        let reader = ZoneReader::open(&args.catalog, zone)
            .with_context(|| format!("Failed to open zone {} in {:?}", zone, args.catalog))?;
        let before = partitioner.stats().seen;
        for star in reader {
            let star = star.with_context(|| format!("Failed to read zone {}", zone))?;
            partitioner.add_star(&star)?;
        }
        if cli.verbose {
            pb.println(format!(
                "z{:03}: {} records",
                zone,
                partitioner.stats().seen - before
            ));
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    let stats = partitioner.finish()?;
    print_stats(&stats, start.elapsed().as_secs_f64());
    Ok(())
}

fn validate_args(args: &PartitionArgs) -> anyhow::Result<()> {
    if !args.catalog.is_dir() {
        anyhow::bail!("Catalog directory does not exist: {:?}", args.catalog);
    }
    if args.first_zone < FIRST_ZONE || args.last_zone > LAST_ZONE {
        anyhow::bail!(
            "Zones must lie in {}..={}, got {}..={}",
            FIRST_ZONE,
            LAST_ZONE,
            args.first_zone,
            args.last_zone
        );
    }
    if args.first_zone > args.last_zone {
        anyhow::bail!(
            "First zone {} is after last zone {}",
            args.first_zone,
            args.last_zone
        );
    }
    Ok(())
}

fn build_config(args: &PartitionArgs) -> anyhow::Result<PartitionConfig> {
    let mut config = crate::load_config(args.config.as_deref())?.partition;
    if let Some(mag) = args.candidate_mag {
        config.candidate_mag = mag;
    }
    if let Some(mag) = args.save_mag {
        config.save_mag = mag;
    }
    if let Some(margin) = args.margin_arcsec {
        config.margin_arcsec = margin;
    }
    config.validate()?;
    Ok(config)
}

fn print_plan(args: &PartitionArgs, config: &PartitionConfig) {
    println!("Catalog: {:?}", args.catalog);
    println!("Output: {:?}", args.output);
    println!("Zones: z{:03}..z{:03}", args.first_zone, args.last_zone);
    println!(
        "Candidates brighter than {:.3} mag, saving to {:.3} mag, margin {}\"",
        config.candidate_mag as f64 / 1000.0,
        config.save_mag as f64 / 1000.0,
        config.margin_arcsec
    );
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} zones ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

fn print_stats(stats: &PartitionStats, elapsed_secs: f64) {
    println!();
    println!("=== Partition Statistics ===");
    println!("{}", stats);
    println!("Elapsed: {:.1}s", elapsed_secs);
}
