pub mod files_use_case;
pub mod ports;
