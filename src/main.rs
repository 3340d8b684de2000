#[tokio::main]
async fn main() {
    craft_launcher_lib::run().await
}
