//! Rendering of unlisted pairs as HTML, CSV or JSON

use celestial_doubles::coords::{format_dec_dms, format_ra_hms};
use celestial_doubles::matcher::UnlistedPair;
use serde::Serialize;
use std::io::{self, Write};

use crate::cli::ReportFormat;

pub fn write_report<W: Write>(
    writer: &mut W,
    format: ReportFormat,
    pairs: &[UnlistedPair],
) -> io::Result<()> {
    match format {
        ReportFormat::Html => write_html(writer, pairs),
        ReportFormat::Csv => write_csv(writer, pairs),
        ReportFormat::Json => write_json(writer, pairs),
    }
}

fn write_html<W: Write>(w: &mut W, pairs: &[UnlistedPair]) -> io::Result<()> {
    writeln!(w, "<!DOCTYPE html>")?;
    writeln!(w, "<html><head><title>Non WDS pairs</title></head>")?;
    writeln!(w, "<body><h2>Non WDS pairs</h2>")?;
    writeln!(
        w,
        "<table border=\"1\"><tr><th>RA Dec</th><th>mv</th><th>mv src</th>\
         <th>mvb</th><th>mvb src</th><th>&rho;\"</th><th>Double<br>Flag</th>\
         <th>Primary<br>PM in RA</th><th>Primary<br>PM in Dec</th>\
         <th>Secondary<br>PM in RA</th><th>Secondary<br>PM in Dec</th>\
         <th>A UCAC4 id</th><th>B UCAC4 id</th><th>Comments</th></tr>"
    )?;
    for p in pairs {
        writeln!(
            w,
            "<tr><td>{} {}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:5.2}</td>\
             <td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>\
             <td>-</td></tr>",
            format_ra_hms(p.ra),
            format_dec_dms(p.dec),
            p.primary.mag,
            p.primary.mag_source.label(),
            p.secondary.mag,
            p.secondary.mag_source.label(),
            p.separation_arcsec,
            p.double_flag,
            p.primary.pm_ra,
            p.primary.pm_dec,
            p.secondary.pm_ra,
            p.secondary.pm_dec,
            p.primary.id,
            p.secondary.id,
        )?;
    }
    writeln!(w, "</table></body></html>")
}

fn write_csv<W: Write>(w: &mut W, pairs: &[UnlistedPair]) -> io::Result<()> {
    writeln!(
        w,
        "ra,dec,primary_mag,primary_mag_source,secondary_mag,secondary_mag_source,\
         separation_arcsec,double_flag,primary_pm_ra,primary_pm_dec,\
         secondary_pm_ra,secondary_pm_dec,primary_id,secondary_id"
    )?;
    for p in pairs {
        writeln!(
            w,
            "{},{},{},{},{},{},{:.2},{},{},{},{},{},{},{}",
            format_ra_hms(p.ra),
            format_dec_dms(p.dec),
            p.primary.mag,
            p.primary.mag_source.label(),
            p.secondary.mag,
            p.secondary.mag_source.label(),
            p.separation_arcsec,
            p.double_flag,
            p.primary.pm_ra,
            p.primary.pm_dec,
            p.secondary.pm_ra,
            p.secondary.pm_dec,
            p.primary.id,
            p.secondary.id,
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonPair<'a> {
    ra_hms: String,
    dec_dms: String,
    #[serde(flatten)]
    pair: &'a UnlistedPair,
}

fn write_json<W: Write>(w: &mut W, pairs: &[UnlistedPair]) -> io::Result<()> {
    let rows: Vec<JsonPair> = pairs
        .iter()
        .map(|pair| JsonPair {
            ra_hms: format_ra_hms(pair.ra),
            dec_dms: format_dec_dms(pair.dec),
            pair,
        })
        .collect();
    serde_json::to_writer_pretty(&mut *w, &rows)?;
    writeln!(w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use celestial_doubles::matcher::PairMember;
    use celestial_doubles::star::{CatalogId, MagSource};

    fn sample() -> UnlistedPair {
        UnlistedPair {
            ra: std::f64::consts::PI,
            dec: -std::f64::consts::FRAC_PI_4,
            primary: PairMember {
                id: CatalogId { zone: 180, seq: 42 },
                mag: 10_000,
                mag_source: MagSource::Survey,
                pm_ra: 20,
                pm_dec: 20,
            },
            secondary: PairMember {
                id: CatalogId { zone: 180, seq: 43 },
                mag: 10_500,
                mag_source: MagSource::Model,
                pm_ra: 22,
                pm_dec: 19,
            },
            separation_arcsec: 10.0,
            double_flag: 0,
        }
    }

    fn render(format: ReportFormat) -> String {
        let mut out = Vec::new();
        write_report(&mut out, format, &[sample()]).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_csv_row() {
        let text = render(ReportFormat::Csv);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            "12:00:00.00,-45:00:00.0,10000,APASS,10500,UCAC4_M,10.00,0,20,20,22,19,180-000042,180-000043"
        );
    }

    #[test]
    fn test_html_row() {
        let text = render(ReportFormat::Html);
        assert!(text.contains("<td>12:00:00.00 -45:00:00.0</td>"));
        assert!(text.contains("<td>180-000042</td><td>180-000043</td>"));
        assert!(text.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_json_fields() {
        let text = render(ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let row = &value[0];
        assert_eq!(row["ra_hms"], "12:00:00.00");
        assert_eq!(row["primary"]["mag"], 10_000);
        assert_eq!(row["secondary"]["mag_source"], "Model");
        assert_eq!(row["primary"]["id"]["seq"], 42);
    }
}
