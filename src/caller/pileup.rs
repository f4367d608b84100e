use super::allele::{AlleleKind, Observation};
use crate::utils::{open_bam_reader, open_genome_reader, GenomicRegion, Result};
use crossbeam_channel::Sender;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_htslib::bam::{self, pileup::Indel, record::Aux, Read};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// All per-read observations at one reference position.
#[derive(Debug)]
pub struct LocusPileup {
    pub contig: String,
    /// 0-based reference position.
    pub position: u64,
    pub ref_base: String,
    pub observations: Vec<Observation>,
}

/// Regions larger than this are walked in windows so reference sequence
/// is never held for a whole chromosome.
const REGION_WINDOW: u32 = 1_000_000;

/// Expands the caller's region request into the fetch plan: one explicit
/// region, a BED file of targets, or every contig of the alignment
/// header, all split into bounded windows.
pub fn plan_regions(
    contigs: &[(String, u32)],
    region: Option<&str>,
    targets_path: Option<&Path>,
) -> Result<Vec<GenomicRegion>> {
    let requested = if let Some(encoding) = region {
        vec![GenomicRegion::from_string(encoding)?]
    } else if let Some(path) = targets_path {
        read_targets(path)?
    } else {
        contigs
            .iter()
            .filter(|(_, len)| *len > 0)
            .map(|(name, len)| GenomicRegion::new(name.clone(), 0, *len))
            .collect::<Result<Vec<_>>>()?
    };

    let mut windows = Vec::new();
    for region in requested {
        let mut start = region.start;
        while start < region.end {
            let end = region.end.min(start + REGION_WINDOW);
            windows.push(GenomicRegion::new(region.contig.clone(), start, end)?);
            start = end;
        }
    }
    Ok(windows)
}

fn read_targets(path: &Path) -> Result<Vec<GenomicRegion>> {
    let reader = crate::utils::open_targets_reader(path)?;
    let mut regions = Vec::new();
    for (line_number, result_line) in reader.lines().enumerate() {
        let line = result_line.map_err(|e| format!("Error at BED line {}: {}", line_number + 1, e))?;
        if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            return Err(format!(
                "Expected at least 3 fields in the format 'chrom start end' at BED line {}: {}",
                line_number + 1,
                line
            ));
        }
        let start: u32 = fields[1]
            .parse()
            .map_err(|_| format!("Invalid start at BED line {}: {}", line_number + 1, line))?;
        let end: u32 = fields[2]
            .parse()
            .map_err(|_| format!("Invalid end at BED line {}: {}", line_number + 1, line))?;
        regions.push(
            GenomicRegion::new(fields[0], start, end)
                .map_err(|e| format!("Error at BED line {}: {}", line_number + 1, e))?,
        );
    }
    Ok(regions)
}

/// Walks the pileup over the planned regions and sends one `LocusPileup`
/// per covered column into the channel. Runs on its own thread; a send
/// failure means the consumer is gone and the walk stops quietly.
#[allow(clippy::too_many_arguments)]
pub fn stream_pileups_into_channel(
    reads_path: &Path,
    genome_path: &Path,
    regions: &[GenomicRegion],
    read_group_samples: &HashMap<String, String>,
    default_sample: &str,
    max_depth: usize,
    sender: Sender<Result<LocusPileup>>,
) {
    let mut bam = match open_bam_reader(reads_path) {
        Ok(bam) => bam,
        Err(e) => {
            let _ = sender.send(Err(e));
            return;
        }
    };
    let genome = match open_genome_reader(genome_path) {
        Ok(genome) => genome,
        Err(e) => {
            let _ = sender.send(Err(e));
            return;
        }
    };

    for region in regions {
        let ref_seq = match genome.fetch_seq_string(
            &region.contig,
            region.start as usize,
            region.end as usize - 1,
        ) {
            Ok(seq) => seq.to_uppercase(),
            Err(e) => {
                let _ = sender.send(Err(format!(
                    "Error fetching sequence for region {}:{}-{}: {}",
                    region.contig, region.start, region.end, e
                )));
                return;
            }
        };

        if let Err(e) = bam.fetch((region.contig.as_str(), region.start as i64, region.end as i64))
        {
            let _ = sender.send(Err(format!("Fetch error at {}: {}", region.contig, e)));
            return;
        }

        let mut pileups = bam.pileup();
        pileups.set_max_depth(1_000_000);
        for result in pileups {
            let column = match result {
                Ok(column) => column,
                Err(e) => {
                    let _ = sender.send(Err(format!("Pileup error: {}", e)));
                    return;
                }
            };
            let position = column.pos();
            if !region.contains(position) {
                continue;
            }

            let ref_base = ref_seq
                .as_bytes()
                .get((position - region.start) as usize)
                .copied()
                .unwrap_or(b'N') as char;

            let mut observations =
                column_observations(&column, ref_base, read_group_samples, default_sample);
            if observations.is_empty() {
                continue;
            }
            if observations.len() > max_depth {
                log::debug!(
                    "{}:{}: downsampled {} observations to {}",
                    region.contig,
                    position + 1,
                    observations.len(),
                    max_depth
                );
                downsample(&mut observations, max_depth, u64::from(position));
            }

            let locus = LocusPileup {
                contig: region.contig.clone(),
                position: u64::from(position),
                ref_base: ref_base.to_string(),
                observations,
            };
            if sender.send(Ok(locus)).is_err() {
                return;
            }
        }
    }
}

fn column_observations(
    column: &bam::pileup::Pileup,
    ref_base: char,
    read_group_samples: &HashMap<String, String>,
    default_sample: &str,
) -> Vec<Observation> {
    let mut observations = Vec::new();
    for alignment in column.alignments() {
        let record = alignment.record();
        if record.is_secondary() || record.is_supplementary() || record.is_duplicate() {
            continue;
        }
        if alignment.is_refskip() || alignment.is_del() {
            continue;
        }
        let qpos = match alignment.qpos() {
            Some(qpos) => qpos,
            None => continue,
        };

        let sample = match record.aux(b"RG") {
            Ok(Aux::String(id)) => read_group_samples
                .get(id)
                .map(|s| s.as_str())
                .unwrap_or(default_sample),
            _ => default_sample,
        };

        let seq = record.seq().as_bytes();
        let quals = record.qual();
        let map_quality = record.mapq();
        let base = (seq[qpos] as char).to_ascii_uppercase();

        let kind = if base == 'N' {
            AlleleKind::Null
        } else if base == ref_base {
            AlleleKind::Reference
        } else {
            AlleleKind::Snp
        };
        observations.push(Observation::new(
            kind,
            base.to_string(),
            1,
            map_quality,
            vec![quals[qpos]],
            sample,
        ));

        // indels anchor on the preceding matched base
        match alignment.indel() {
            Indel::Ins(len) => {
                let len = len as usize;
                let end = (qpos + 1 + len).min(seq.len());
                let bases: String = seq[qpos + 1..end].iter().map(|b| *b as char).collect();
                observations.push(Observation::new(
                    AlleleKind::Insertion,
                    bases,
                    len as u32,
                    map_quality,
                    quals[qpos + 1..end].to_vec(),
                    sample,
                ));
            }
            Indel::Del(len) => {
                observations.push(Observation::new(
                    AlleleKind::Deletion,
                    String::new(),
                    len,
                    map_quality,
                    vec![quals[qpos]],
                    sample,
                ));
            }
            Indel::None => {}
        }
    }
    observations
}

/// Reservoir-samples the observation list down to `max_depth` entries,
/// preserving stream order. Seeded per position so a run over a
/// restricted region reproduces the whole-genome sampling.
fn downsample(observations: &mut Vec<Observation>, max_depth: usize, seed: u64) {
    if observations.len() <= max_depth {
        return;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep: Vec<usize> = (0..max_depth).collect();
    for index in max_depth..observations.len() {
        let slot = rng.gen_range(0..=index);
        if slot < max_depth {
            keep[slot] = index;
        }
    }

    let mut selected = vec![false; observations.len()];
    for index in keep {
        selected[index] = true;
    }
    let mut index = 0;
    observations.retain(|_| {
        let keep = selected[index];
        index += 1;
        keep
    });
}
