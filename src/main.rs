use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_desk::infrastructure::AppState;
use library_desk::{config, db, seed, server};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_desk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    // --profile overrides PROFILE
    let args: Vec<String> = std::env::args().collect();
    let config = match args.iter().position(|arg| arg == "--profile") {
        Some(pos) => match args.get(pos + 1) {
            Some(profile) => config::Config::for_profile(profile.clone()),
            None => {
                tracing::warn!("--profile given without a value, using PROFILE");
                config::Config::from_env()
            }
        },
        None => config::Config::from_env(),
    };

    tracing::info!(
        "Profile '{}', database {}, max {} loans of up to {} days",
        config.profile,
        config.database_url,
        config.max_active_loans,
        config.max_loan_days
    );

    // Initialize database
    let db = db::init_db(&config.database_url)
        .await
        .expect("Failed to initialize database");

    let state = AppState::new(db).with_policy(config.loan_policy());

    // Check for seed flag
    if std::env::var("SEED_DEMO").is_ok() {
        tracing::info!("Seeding demo data...");
        if let Err(e) = seed::seed_demo_data(&state).await {
            tracing::error!("Failed to seed data: {}", e);
        } else {
            tracing::info!("Demo data seeded successfully.");
        }
    }

    let app = server::build_router(state, &config);

    server::serve(app, config.port)
        .await
        .expect("Failed to start server");
}
