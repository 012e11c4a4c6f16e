use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hub_cache::HubCache;
use recommendation_service::cache::RedisResponseCache;
use recommendation_service::config::Config;
use recommendation_service::db::{
    PgBehaviorRepo, PgConversationRepo, PgConversationVectorStore, PgProfileVectorStore,
};
use recommendation_service::handlers::{
    self, get_conversation_recommendations, refresh_conversation_vector, refresh_user_vector,
    AppState,
};
use recommendation_service::jobs::{start_vector_refresh_job, VectorRefreshJob};
use recommendation_service::middleware::JwtAuthMiddleware;
use recommendation_service::services::write_back::start_write_back_worker;
use recommendation_service::services::{
    BehaviorSource, ConversationCatalog, ConversationVectors, EmbeddingBackend, EmbeddingClient,
    RankingBackend, RankingClient, RecommendationEngine, ResponseCache, UserVectors,
    VectorMaintenance,
};

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting recommendation-service v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Environment: {}", config.app.env);

    let db_pool = match PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {:#}", e);
            eprintln!("ERROR: Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    let redis_manager = match redis::Client::open(config.redis.url.clone()) {
        Ok(client) => match client.get_connection_manager().await {
            Ok(manager) => manager,
            Err(e) => {
                tracing::error!("Redis connection failed: {:#}", e);
                eprintln!("ERROR: Failed to connect to Redis: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            tracing::error!("Invalid Redis URL: {:#}", e);
            eprintln!("ERROR: Invalid Redis URL: {}", e);
            std::process::exit(1);
        }
    };
    let hub_cache = HubCache::new(Arc::new(Mutex::new(redis_manager)));

    let ai_timeout = Duration::from_secs(config.ai.request_timeout_secs);
    let ranking: Arc<dyn RankingBackend> =
        match RankingClient::new(config.ai.base_url.clone(), ai_timeout) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("ERROR: Failed to build ranking client: {}", e);
                std::process::exit(1);
            }
        };
    let embedding: Arc<dyn EmbeddingBackend> =
        match EmbeddingClient::new(config.ai.base_url.clone(), ai_timeout) {
            Ok(client) => Arc::new(client),
            Err(e) => {
                eprintln!("ERROR: Failed to build embedding client: {}", e);
                std::process::exit(1);
            }
        };

    let behavior: Arc<dyn BehaviorSource> = Arc::new(PgBehaviorRepo::new(db_pool.clone()));
    let catalog: Arc<dyn ConversationCatalog> = Arc::new(PgConversationRepo::new(db_pool.clone()));
    let user_vectors: Arc<dyn UserVectors> = Arc::new(PgProfileVectorStore::new(db_pool.clone()));
    let conversation_vectors: Arc<dyn ConversationVectors> =
        Arc::new(PgConversationVectorStore::new(db_pool.clone()));
    let response_cache: Arc<dyn ResponseCache> = Arc::new(RedisResponseCache::new(hub_cache));

    let (write_queue, _write_back_worker) = start_write_back_worker(
        config.jobs.write_back_capacity,
        user_vectors.clone(),
        conversation_vectors.clone(),
    );
    info!("Vector write-back worker started");

    let engine = Arc::new(RecommendationEngine::new(
        behavior.clone(),
        catalog,
        user_vectors.clone(),
        conversation_vectors.clone(),
        ranking,
        response_cache.clone(),
        write_queue,
    ));

    let maintenance = Arc::new(VectorMaintenance::new(
        behavior.clone(),
        user_vectors.clone(),
        conversation_vectors.clone(),
        embedding,
        response_cache,
    ));

    if config.jobs.vector_refresh_enabled {
        let job = VectorRefreshJob::new(behavior, user_vectors, conversation_vectors);
        start_vector_refresh_job(config.jobs.clone(), job);
        info!("Vector refresh background job started");
    } else {
        info!("Vector refresh disabled by configuration");
    }

    let app_state = web::Data::new(AppState {
        engine,
        maintenance,
    });
    let jwt_secret = config.auth.jwt_secret.clone();

    info!("HTTP server listening on 0.0.0.0:{}", config.app.port);

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .service(handlers::health)
            .service(handlers::metrics)
            .service(refresh_user_vector)
            .service(refresh_conversation_vector)
            .service(
                web::scope("/api/v1/conversations")
                    .wrap(JwtAuthMiddleware::new(jwt_secret.clone()))
                    .service(get_conversation_recommendations),
            )
    })
    .bind(format!("0.0.0.0:{}", config.app.port))?
    .run()
    .await
}
