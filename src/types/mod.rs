pub mod entry_format;
pub mod index_spec;

pub use entry_format::EntryFormatter;
pub use index_spec::IndexSpec;
