pub mod db;
pub mod memory;
pub mod tts;

pub use db::DbAdapter;
pub use memory::InMemoryAdapter;
pub use tts::OpenAiTtsAdapter;
