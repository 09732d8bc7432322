pub mod review_tools;
pub mod search_tools;
pub mod server;

pub use review_tools::ReviewProvider;
pub use search_tools::SymbolSearchProvider;
pub use server::{serve, ToolProvider};
