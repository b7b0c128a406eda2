//! # Lifecycle Flows
//!
//! attach → mutate → detach → re-attach, template reconciliation, shutdown
//! and restart over the same backend.

#[cfg(test)]
mod tests {
    use crate::fixtures::{init_tracing, items, memory_service, player_schema};
    use record_sharding::{
        record, InMemoryBackend, Operation, RecordLifecycle, ShardMarker, ShardedRecordsApi, Value,
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_attach_mutate_detach_reattach() -> anyhow::Result<()> {
        init_tracing();
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(42).await?;

        service
            .apply_operator(Some(42), Operation::new("coins", "+", 250))
            .await?;
        service
            .apply_operator(Some(42), Operation::new("stats.xp", "+", 40))
            .await?;
        service
            .apply_operator(Some(42), Operation::new("quests", "PUSH", "tutorial"))
            .await?;
        service
            .apply_operator(
                Some(42),
                Operation::new("inventory", "INSERT", Value::Map(items(5))),
            )
            .await?;

        let raw = service.raw_owner_records(Some(42));
        assert_eq!(
            raw[&42].get("inventory"),
            Some(&Value::Sharded(ShardMarker::new(5)))
        );
        assert!(!raw[&42].contains_key("leaderboard"));

        service.owner_detached(42).await?;
        assert!(service.raw_owner_records(None).is_empty());
        assert_eq!(backend.keys("records"), vec!["42".to_string()]);
        assert_eq!(backend.keys("shards").len(), 5);

        service.owner_attached(42).await?;
        assert_eq!(service.read(Some(42), "coins").await?, Some(Value::from(250)));
        assert_eq!(service.read(Some(42), "stats.xp").await?, Some(Value::from(40)));
        assert_eq!(
            service.read(Some(42), "quests.1").await?,
            Some(Value::from("tutorial"))
        );
        assert_eq!(
            service.read(Some(42), "inventory.item_004").await?,
            Some(Value::from("x".repeat(10)))
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_marker_wire_format_on_backend() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(5).await?;
        service
            .apply_operator(
                Some(5),
                Operation::new("inventory", "INSERT", Value::Map(items(2))),
            )
            .await?;
        service.owner_detached(5).await?;

        let payload = String::from_utf8(backend.raw("records", "5").unwrap_or_default())?;
        assert!(payload.contains(r#""inventory":{"__sharded":true,"count":2}"#));

        let fragment = String::from_utf8(backend.raw("shards", "5:inventory:shard:1").unwrap_or_default())?;
        assert_eq!(fragment, r#"{"item_000":"xxxxxxxxxx"}"#);
        Ok(())
    }

    #[tokio::test]
    async fn test_stored_record_reconciled_with_template() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        backend.insert_raw(
            "records",
            "7",
            br#"{"coins":9,"stats":{"level":3},"retired_field":true}"#.to_vec(),
        );
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(7).await?;

        assert_eq!(service.read(Some(7), "coins").await?, Some(Value::from(9)));
        assert_eq!(service.read(Some(7), "stats.level").await?, Some(Value::from(3)));
        assert_eq!(service.read(Some(7), "stats.xp").await?, Some(Value::from(0)));
        assert_eq!(
            service.read(Some(7), "retired_field").await?,
            Some(Value::Bool(true))
        );
        assert_eq!(
            service.read(Some(7), "inventory").await?,
            Some(Value::empty_map())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_shutdown_then_restart() -> anyhow::Result<()> {
        init_tracing();
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(1).await?;
        service.owner_attached(2).await?;

        service
            .apply_operator(Some(1), Operation::new("coins", "+", 10))
            .await?;
        service
            .apply_operator(Some(2), Operation::new("coins", "+", 20))
            .await?;
        service
            .apply_operator(
                None,
                Operation::new(
                    "leaderboard",
                    "INSERT",
                    Value::Map(record([("p1", 10), ("p2", 20)])),
                ),
            )
            .await?;
        service
            .apply_operator(None, Operation::new("season", "+", 1))
            .await?;

        let report = service.shutdown().await;
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.saved_owners, vec![1, 2]);
        assert_eq!(
            report.saved_global_fields,
            vec!["leaderboard".to_string(), "season".to_string()]
        );

        let restarted = memory_service(&backend);
        restarted.initialize(player_schema()).await?;
        assert_eq!(restarted.read(None, "season").await?, Some(Value::from(2)));
        assert_eq!(
            restarted.read(None, "leaderboard.p2").await?,
            Some(Value::from(20))
        );

        restarted.owner_attached(2).await?;
        assert_eq!(restarted.read(Some(2), "coins").await?, Some(Value::from(20)));
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_owner_starts_from_template() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;
        service.owner_attached(3).await?;
        service
            .apply_operator(Some(3), Operation::new("coins", "+", 99))
            .await?;
        service
            .apply_operator(
                Some(3),
                Operation::new("inventory", "INSERT", Value::Map(items(3))),
            )
            .await?;
        service.owner_detached(3).await?;

        service.delete_owner_record(3).await?;
        assert!(backend.keys("records").is_empty());
        assert!(backend.keys("shards").is_empty());

        service.owner_attached(3).await?;
        assert_eq!(service.read(Some(3), "coins").await?, Some(Value::from(0)));
        assert_eq!(
            service.read(Some(3), "inventory").await?,
            Some(Value::empty_map())
        );
        Ok(())
    }
}
