#[tokio::main]
async fn main() -> anyhow::Result<()> {
    voxai_lib::run().await
}
