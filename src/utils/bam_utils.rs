use crate::utils::Result;
use rust_htslib::bam::{self, Read};
use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};

pub fn get_bam_header(bam_path: &Path) -> Result<bam::Header> {
    let bam = bam::IndexedReader::from_path(bam_path)
        .map_err(|e| format!("Failed to create bam reader: {}", e))?;
    Ok(bam::Header::from_template(bam.header()))
}

pub fn is_bam_mapped(bam_header: &bam::Header) -> bool {
    // input is already sorted because it has an index.
    // If it is mapped, the index needs the SQ tags to fetch data.
    for line in String::from_utf8(bam_header.to_bytes()).unwrap().lines() {
        if line.starts_with("@SQ") {
            return true;
        }
    }
    false
}

/// Read-group id to sample name mapping from the RG/SM header records.
pub fn get_read_group_samples(bam_header: &bam::Header) -> HashMap<String, String> {
    let header_hashmap = bam_header.to_hashmap();
    let mut samples = HashMap::new();

    if let Some(rg_fields) = header_hashmap.get("RG") {
        for rg_field in rg_fields {
            if let (Some(id), Some(sample_name)) = (rg_field.get("ID"), rg_field.get("SM")) {
                samples.insert(id.to_owned(), sample_name.to_owned());
            }
        }
    }

    samples
}

/// Sample name used for reads that carry no read group.
pub fn get_default_sample_name(reads_path: &Path) -> Result<String> {
    let sample = reads_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or("Invalid reads file name")?
        .to_string();

    Ok(sample)
}

/// Ordered emission roster: every read-group sample, or the fallback
/// sample when the header defines none.
pub fn get_sample_roster(
    read_group_samples: &HashMap<String, String>,
    default_sample: &str,
) -> Vec<String> {
    let names: BTreeSet<&str> = read_group_samples.values().map(|s| s.as_str()).collect();
    if names.is_empty() {
        log::warn!("No sample names found, using {}", default_sample);
        return vec![default_sample.to_string()];
    }
    names.into_iter().map(|s| s.to_string()).collect()
}

/// Contig names and lengths from the SQ header records, in header order.
pub fn get_contigs(bam_header: &bam::Header) -> Result<Vec<(String, u32)>> {
    let mut contigs = Vec::new();
    if let Some(records) = bam_header.to_hashmap().get("SQ") {
        for record in records {
            let name = record
                .get("SN")
                .ok_or("Malformed @SQ header record: missing SN")?;
            let len: u32 = record
                .get("LN")
                .and_then(|value| value.parse().ok())
                .ok_or_else(|| format!("Malformed @SQ header record for {}: bad LN", name))?;
            contigs.push((name.clone(), len));
        }
    }
    Ok(contigs)
}
