//! # Recovery Flows
//!
//! Interrupted operations, backend outages, payload limits and damaged
//! fragment sets. Every failure leaves the previous state in place.

#[cfg(test)]
mod tests {
    use crate::fixtures::{init_tracing, items, memory_service, player_schema, test_config};
    use record_sharding::{
        record, InMemoryBackend, JsonCodec, Operation, RecordError, RecordLifecycle, Schema,
        ShardMarker, ShardedRecordService, ShardedRecordsApi, Value, ValueCodec,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_merged_declared_field_is_stored_sharded() -> anyhow::Result<()> {
        init_tracing();
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(1).await?;
        service
            .apply_operator(Some(1), Operation::new("inventory", "INSERT", Value::Map(items(3))))
            .await?;

        // Leave the declared field merged, as an operation cut off between
        // unshard and reshard would.
        service.set_sharding(Some(1), "inventory", false).await?;
        let report = service.shutdown().await;
        assert!(report.is_clean());

        let bytes = backend.raw("records", "1").unwrap_or_default();
        let Value::Map(stored) = JsonCodec.decode(&bytes)? else {
            anyhow::bail!("owner record should decode to a mapping");
        };
        assert_eq!(
            stored.get("inventory"),
            Some(&Value::Sharded(ShardMarker::new(3)))
        );
        assert_eq!(backend.keys("shards").len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_attach_outage_then_retry() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;

        backend.set_unavailable(true);
        assert!(matches!(
            service.owner_attached(4).await,
            Err(RecordError::BackendUnavailable { .. })
        ));
        assert!(matches!(
            service.read(Some(4), "coins").await,
            Err(RecordError::OwnerNotLoaded { owner: 4, .. })
        ));

        backend.set_unavailable(false);
        service.owner_attached(4).await?;
        assert_eq!(service.read(Some(4), "coins").await?, Some(Value::from(0)));
        Ok(())
    }

    #[tokio::test]
    async fn test_detach_outage_keeps_owner_until_retry() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(6).await?;
        service
            .apply_operator(Some(6), Operation::new("coins", "+", 15))
            .await?;

        backend.set_unavailable(true);
        assert!(service.owner_detached(6).await.is_err());
        service
            .apply_operator(Some(6), Operation::new("coins", "+", 5))
            .await?;

        backend.set_unavailable(false);
        service.owner_detached(6).await?;
        service.owner_attached(6).await?;
        assert_eq!(service.read(Some(6), "coins").await?, Some(Value::from(20)));
        Ok(())
    }

    #[tokio::test]
    async fn test_sharding_keeps_payloads_under_backend_limit() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::with_payload_limit(200));
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(1).await?;
        service
            .apply_operator(Some(1), Operation::new("inventory", "INSERT", Value::Map(items(20))))
            .await?;
        service.owner_detached(1).await?;
        assert_eq!(backend.keys("shards").len(), 20);

        // The same table without sharding does not fit in one payload.
        let unsharded = Schema::new(record([("inventory", Value::empty_map())]));
        let plain_backend = Arc::new(InMemoryBackend::with_payload_limit(200));
        let plain = ShardedRecordService::with_json(Arc::clone(&plain_backend), test_config())?;
        plain.initialize(unsharded).await?;
        plain.owner_attached(1).await?;
        plain
            .apply_operator(Some(1), Operation::new("inventory", "INSERT", Value::Map(items(20))))
            .await?;
        assert!(matches!(
            plain.owner_detached(1).await,
            Err(RecordError::BackendUnavailable { .. })
        ));
        assert!(plain.is_attached(1));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_fragment_fails_safe() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(8).await?;
        service
            .apply_operator(Some(8), Operation::new("inventory", "INSERT", Value::Map(items(3))))
            .await?;
        service.owner_detached(8).await?;

        let lost = backend.remove_raw("shards", "8:inventory:shard:2");
        assert!(lost.is_some());
        assert!(matches!(
            service.owner_attached(8).await,
            Err(RecordError::ShardFragmentMissing { ref key }) if key == "8:inventory:shard:2"
        ));

        // The stored marker and surviving fragments are untouched.
        assert!(backend.raw("records", "8").is_some());
        assert_eq!(
            backend.keys("shards"),
            vec!["8:inventory:shard:1".to_string(), "8:inventory:shard:3".to_string()]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_shrinking_table_drops_stale_fragments() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(2).await?;
        service
            .apply_operator(Some(2), Operation::new("inventory", "INSERT", Value::Map(items(6))))
            .await?;
        service.owner_detached(2).await?;
        assert_eq!(backend.keys("shards").len(), 6);

        service.owner_attached(2).await?;
        for key in ["item_000", "item_001", "item_002", "item_003"] {
            service
                .apply_operator(Some(2), Operation::new("inventory", "DELETE", key))
                .await?;
        }
        service.owner_detached(2).await?;

        assert_eq!(
            backend.keys("shards"),
            vec!["2:inventory:shard:1".to_string(), "2:inventory:shard:2".to_string()]
        );
        service.owner_attached(2).await?;
        assert_eq!(
            service.read(Some(2), "inventory.item_005").await?,
            Some(Value::from("x".repeat(10)))
        );
        Ok(())
    }
}
