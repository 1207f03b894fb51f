#[tokio::main]
async fn main() {
    otto::boot::boot().await;
}
