pub mod tsv_loader;

pub use tsv_loader::{load_input_records, parse_input_records};
