use adyen_provider::{init_logging, serve, AdyenProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();
    serve(AdyenProvider::new()).await
}
