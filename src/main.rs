use actix_web::{middleware, web, App, HttpServer};
use messaging_service::{
    config::Config,
    db, metrics,
    redis_client::RedisClient,
    routes,
    state::AppState,
    websocket::{pubsub, ConnectionRegistry},
};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting messaging service");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return Err(io::Error::new(io::ErrorKind::Other, "Configuration failed"));
        }
    };

    let db_pool = match db::init_pool(&config.database_url).await {
        Ok(pool) => {
            tracing::info!("Connected to database, migrations applied");
            pool
        }
        Err(e) => {
            tracing::error!("Failed to initialize database: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Database initialization failed",
            ));
        }
    };

    let redis = match RedisClient::from_url(&config.redis_url).await {
        Ok(redis) => {
            tracing::info!("Connected to Redis");
            redis
        }
        Err(e) => {
            tracing::error!("Failed to connect to Redis: {}", e);
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "Redis connection failed",
            ));
        }
    };

    let registry = ConnectionRegistry::new();

    // Bridge events published by any instance into this instance's sessions
    {
        let redis = redis.clone();
        let registry = registry.clone();
        tokio::spawn(async move {
            if let Err(e) = pubsub::start_psub_listener(redis, registry).await {
                tracing::error!("Pub/sub listener stopped: {}", e);
            }
        });
    }

    let bind_addr = config.bind_addr();
    let state = AppState::new(db_pool, redis, registry, config);

    tracing::info!("Starting HTTP server on {}", bind_addr);

    HttpServer::new(move || {
        let cors = actix_cors::Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .app_data(web::Data::new(state.clone()))
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
