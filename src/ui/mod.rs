//! CLI output helpers
//!
//! Interactive terminals get `cliclack` log lines and prompts; pipes and CI
//! get plain tagged lines.

mod context;
mod output;
mod prompts;

pub use context::UiContext;
pub use output::{
    header, key_value, step_fail_detail, step_info, step_ok, step_ok_detail, step_warn,
    step_warn_hint,
};
pub use prompts::confirm;
