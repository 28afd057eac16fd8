pub mod error;
pub mod format;
pub mod interactive;
pub mod output;
pub mod process;

pub use interactive::{prompt_input, prompt_line, prompt_yes_no};
pub use output::{print_error, print_info, print_stage, print_success, print_warning};
