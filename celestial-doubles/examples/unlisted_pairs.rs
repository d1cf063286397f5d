use celestial_doubles::config::MatchConfig;
use celestial_doubles::coords::{format_dec_dms, format_ra_hms};
use celestial_doubles::matcher::find_unlisted_pairs;
use celestial_doubles::reference::ReferenceIndex;
use celestial_doubles::region::BucketStore;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let regions = args
        .next()
        .expect("Usage: unlisted_pairs <regions-dir> <wds-file>");
    let wds = args
        .next()
        .expect("Usage: unlisted_pairs <regions-dir> <wds-file>");

    let store = BucketStore::open(&regions)?;
    let reference = ReferenceIndex::load(&wds)?;
    println!("{} reference pairs loaded", reference.len());

    let config = MatchConfig {
        max_results: 20,
        ..MatchConfig::default()
    };
    let outcome = find_unlisted_pairs(&store, &reference, &config)?;

    println!("\n{} unlisted pairs:\n", outcome.pairs.len());
    for p in &outcome.pairs {
        println!(
            "  {} {}  {} + {}  mag {:.2}/{:.2}  rho {:.2}\"",
            format_ra_hms(p.ra),
            format_dec_dms(p.dec),
            p.primary.id,
            p.secondary.id,
            p.primary.mag as f64 / 1000.0,
            p.secondary.mag as f64 / 1000.0,
            p.separation_arcsec,
        );
    }
    println!("\n{}", outcome.stats);

    Ok(())
}
