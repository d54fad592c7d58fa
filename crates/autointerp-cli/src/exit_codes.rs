//! Process exit codes. Part of the CLI contract.

pub const SUCCESS: i32 = 0;
pub const RECORD_FAILED: i32 = 1; // At least one record produced no explanation
pub const CONFIG_ERROR: i32 = 2; // Config, input or backend setup failed
