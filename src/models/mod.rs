pub mod loaders;
pub mod record;

pub use loaders::{load_input_records, parse_input_records};
pub use record::{derived_group, InputRecord, OutputRecord, QaPair};
