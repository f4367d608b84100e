mod write_json;
mod write_vcf;

pub use write_json::JsonWriter;
pub use write_vcf::VcfWriter;
