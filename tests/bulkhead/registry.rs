use bulwark_bulkhead::{BulkheadConfig, BulkheadPreset, BulkheadRegistry};
use std::time::Duration;

#[test]
fn known_names_get_their_preset() {
    let registry = BulkheadRegistry::new();

    let llm = registry.get_or_create("llm");
    assert_eq!(llm.config().max_concurrent(), 20);
    assert_eq!(llm.config().max_queue(), 50);
    assert_eq!(llm.config().wait_timeout(), Duration::from_secs(60));

    let db = registry.get_or_create("database");
    assert_eq!(db.config().max_concurrent(), 100);
    assert_eq!(db.config().max_queue(), 500);

    let other = registry.get_or_create("payments");
    assert_eq!(other.config().max_concurrent(), BulkheadPreset::DEFAULT.max_concurrent);
}

#[tokio::test]
async fn same_name_shares_state() {
    let registry = BulkheadRegistry::new();

    registry
        .get_or_create("messaging")
        .execute(|| async { Ok::<_, String>(()) })
        .await
        .unwrap();

    assert_eq!(registry.get_or_create("messaging").stats().completed, 1);
    assert_eq!(registry.names(), vec!["messaging".to_string()]);
}

#[tokio::test]
async fn stats_reset_and_clear() {
    let registry = BulkheadRegistry::new();
    registry.register(
        BulkheadConfig::builder()
            .name("webhook")
            .max_concurrent(3)
            .build(),
    );

    let webhook = registry.get("webhook").unwrap();
    assert_eq!(webhook.config().max_concurrent(), 3);
    webhook.execute(|| async { Err::<(), _>("bad payload") }).await.unwrap_err();

    assert_eq!(registry.all_stats()["webhook"].failed, 1);
    registry.reset_all_stats();
    assert_eq!(registry.all_stats()["webhook"].failed, 0);

    registry.clear();
    assert!(registry.get("webhook").is_none());
}
