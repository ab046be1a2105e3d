use std::sync::Arc;

use fortune_core::{db, CoreConfig, Fortune, Identity, SeededRandom};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example end-to-end claim against a throwaway database
    let config = CoreConfig {
        admin_ids: vec![1],
        ..CoreConfig::default()
    };
    let pool = db::connect_in_memory().await?;
    db::migrate(&pool).await?;
    db::seed(&pool, &config).await?;

    let rng = SeededRandom::new("example-key", "example");
    println!("key_hash={}", rng.key_hash_hex());
    let fortune = Fortune::with_pool(pool, &config, Arc::new(rng));

    let alice = Identity::new(1001, "Alice");
    let prize = fortune.allocator.claim(&alice).await?;
    println!("{} won {} {}", alice.display_name, prize.icon, prize.label);

    match fortune.allocator.claim(&alice).await {
        Ok(_) => println!("unexpected second prize"),
        Err(err) => println!("second claim: {err}"),
    }
    Ok(())
}
