//! File-based persistence: watcher state, cached token, dump output.

pub mod dump_repo;
pub mod state_json;
pub mod token_file;

pub use dump_repo::DumpRepo;
pub use state_json::StateJson;
pub use token_file::TokenFile;
