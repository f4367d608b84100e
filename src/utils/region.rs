use crate::utils::Result;

/// Half-open genomic interval [start, end) on a contig, 0-based.
#[derive(Debug, Clone, PartialEq)]
pub struct GenomicRegion {
    pub contig: String,
    pub start: u32,
    pub end: u32,
}

impl GenomicRegion {
    pub fn new(contig: impl Into<String>, start: u32, end: u32) -> Result<Self> {
        if start >= end {
            return Err(format!("Invalid region: start {} >= end {}", start, end));
        }

        Ok(Self {
            contig: contig.into(),
            start,
            end,
        })
    }

    /// Parses a samtools-style "chrom:start-end" encoding (1-based,
    /// inclusive) into the internal 0-based half-open form.
    pub fn from_string(encoding: &str) -> Result<Self> {
        let error_msg = || format!("Invalid region encoding: {}", encoding);
        let elements: Vec<&str> = encoding.split(&[':', '-']).collect();

        if elements.len() != 3 {
            return Err(error_msg());
        }

        let start: u32 = elements[1].parse().map_err(|_| error_msg())?;
        let end: u32 = elements[2].parse().map_err(|_| error_msg())?;
        if start == 0 {
            return Err(error_msg());
        }

        Self::new(elements[0].to_string(), start - 1, end)
    }

    pub fn contains(&self, position: u32) -> bool {
        position >= self.start && position < self.end
    }
}
