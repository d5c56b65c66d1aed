use clap::Parser;

#[tokio::main]
async fn main() {
    env_logger::init();

    let app = sip::api::cli::App::parse();
    if let Err(e) = sip::api::cli::run(app).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
