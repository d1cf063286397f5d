//! Unlisted pair search over a partitioned catalog

use crate::cli::{Cli, SearchArgs};
use crate::report::write_report;
use anyhow::Context;
use celestial_doubles::config::MatchConfig;
use celestial_doubles::matcher::{find_unlisted_pairs, MatchStats};
use celestial_doubles::reference::ReferenceIndex;
use celestial_doubles::region::BucketStore;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

pub fn run(args: &SearchArgs, cli: &Cli) -> anyhow::Result<()> {
    let config = build_config(args)?;
    let store = BucketStore::open(&args.regions)
        .with_context(|| format!("Failed to open regions directory: {:?}", args.regions))?;
    let reference = ReferenceIndex::load(&args.reference)
        .with_context(|| format!("Failed to load reference catalog: {:?}", args.reference))?;
    print_plan(args, &config, &reference);

    let start = Instant::now();
    let outcome = find_unlisted_pairs(&store, &reference, &config)
        .with_context(|| format!("Search failed in {:?}", args.regions))?;

    let file = File::create(&args.output)
        .with_context(|| format!("Failed to create report: {:?}", args.output))?;
    let mut writer = BufWriter::new(file);
    write_report(&mut writer, args.format, &outcome.pairs)
        .and_then(|_| writer.flush())
        .with_context(|| format!("Failed to write report: {:?}", args.output))?;

    print_stats(&outcome.stats, cli.verbose, start.elapsed().as_secs_f64());
    println!("Written {} results to {:?}", outcome.pairs.len(), args.output);
    Ok(())
}

fn build_config(args: &SearchArgs) -> anyhow::Result<MatchConfig> {
    let mut config = crate::load_config(args.config.as_deref())?.matching;
    if let Some(v) = args.primary_mag {
        config.primary_mag = v;
    }
    if let Some(v) = args.secondary_mag {
        config.secondary_mag = v;
    }
    if let Some(v) = args.max_mag_diff {
        config.max_mag_diff = v;
    }
    if let Some(v) = args.min_sep {
        config.min_sep_arcsec = v;
    }
    if let Some(v) = args.max_sep {
        config.max_sep_arcsec = v;
    }
    if let Some(v) = args.min_pm {
        config.min_pm = v;
    }
    if let Some(v) = args.min_pm_ratio {
        config.min_pm_ratio = v;
    }
    if let Some(v) = args.max_results {
        config.max_results = v;
    }
    config.validate()?;
    Ok(config)
}

fn print_plan(args: &SearchArgs, config: &MatchConfig, reference: &ReferenceIndex) {
    println!("Regions: {:?}", args.regions);
    println!(
        "Reference: {:?} ({} pairs, {} lines skipped)",
        args.reference,
        reference.len(),
        reference.stats().skipped
    );
    println!(
        "Separation {}\"..{}\", max magnitude gap {:.3}, min PM {} mas/yr, min PM ratio {}",
        config.min_sep_arcsec,
        config.max_sep_arcsec,
        config.max_mag_diff as f64 / 1000.0,
        config.min_pm,
        config.min_pm_ratio
    );
}

fn print_stats(stats: &MatchStats, verbose: bool, elapsed_secs: f64) {
    println!();
    println!("=== Search Statistics ===");
    if verbose {
        println!("{}", stats);
    } else {
        println!("Candidates read: {}", stats.candidates);
        println!("Already listed: {}", stats.listed);
        println!("Emitted: {}", stats.emitted);
    }
    if stats.capped {
        println!("Result cap reached; the search stopped early");
    }
    println!("Elapsed: {:.1}s", elapsed_secs);
}
