//! `sources` command: shows which storefronts a search would consult.

use pricecomp_core::Region;
use pricecomp_search::SourceTable;

pub(crate) fn source_lines(table: &SourceTable, region: Option<&Region>) -> Vec<String> {
    match region {
        Some(region) => table
            .for_region(region)
            .iter()
            .map(|r| r.name().to_string())
            .collect(),
        None => table
            .describe()
            .into_iter()
            .map(|(name, regions)| {
                let coverage = regions.map_or_else(
                    || "all regions".to_string(),
                    |rs| {
                        rs.iter()
                            .map(Region::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    },
                );
                format!("{name:<12}{coverage}")
            })
            .collect(),
    }
}

pub(crate) fn run_sources(table: &SourceTable, region: Option<&str>, default_region: &Region) {
    let region = region.and_then(Region::parse);
    match &region {
        Some(region) => println!("sources consulted for {region}:"),
        None => println!("configured sources (default region {default_region}):"),
    }
    for line in source_lines(table, region.as_ref()) {
        println!("  {line}");
    }
}
