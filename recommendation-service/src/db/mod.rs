pub mod behavior_repo;
pub mod conversation_repo;
pub mod vector_store;

pub use behavior_repo::PgBehaviorRepo;
pub use conversation_repo::PgConversationRepo;
pub use vector_store::{PgConversationVectorStore, PgProfileVectorStore};
