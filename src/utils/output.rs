use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Vcf,
    Json,
}

impl FromStr for OutputFormat {
    type Err = &'static str;
    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format {
            "vcf" => Ok(OutputFormat::Vcf),
            "json" => Ok(OutputFormat::Json),
            _ => Err("Invalid output format. Options are: vcf, json"),
        }
    }
}
