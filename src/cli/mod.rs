mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{OutputMode, run_with_format};
pub use util::{load_documents, parse_output_mode, parse_sort};
