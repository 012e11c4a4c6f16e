pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, Result};

// Re-export the core recommendation components
pub use services::{
    encoder, BehaviorSource, ConversationCatalog, ConversationVectors, EmbeddingBackend,
    RankingBackend, RecommendationEngine, ResponseCache, UserVectors, VectorMaintenance,
};
