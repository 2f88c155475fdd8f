#[tokio::main]
async fn main() {
    tolk::web::run().await;
}
