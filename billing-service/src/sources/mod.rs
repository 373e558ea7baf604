pub mod readings_delimited_file;
pub mod readings_ndjson_file;

pub use readings_delimited_file::ReadingsDelimitedFileSource;
pub use readings_ndjson_file::ReadingsNdjsonFileSource;
