//! Output formatting module
//!
//! Provides two output formats:
//! - Styled terminal output
//! - JSON

pub mod json;
pub mod terminal;

pub use json::{print_json, to_json_output};
pub use terminal::{
    print_connect_outcome, print_decision, print_error, print_header, print_record,
    print_record_set, print_server_records, print_success, print_warning,
};
