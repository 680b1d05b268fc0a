mod db;
mod rate_limit;
mod routes;
mod services;
mod state;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    // Mailer is optional: without it, login codes only reach users via
    // AUTH_DEV_MODE.
    let mailer = state::MailerConfig::from_env();
    if mailer.is_none() {
        tracing::warn!("RESEND_API_KEY/RESEND_FROM not set — login-code email disabled");
    }

    let state = state::AppState::new(pool, mailer);

    // Spawn background reminder dispatcher.
    let _reminders = services::reminder::spawn_reminder_worker(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "kinboard listening");
    axum::serve(listener, app).await.expect("server failed");
}
