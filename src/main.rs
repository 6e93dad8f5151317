use tracing_subscriber::EnvFilter;
use ubl_core::rocket;

#[rocket::main]
async fn main() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    if let Err(e) = rocket().launch().await {
        tracing::error!(error = %e, "server shut down with error");
        std::process::exit(1);
    }
}
