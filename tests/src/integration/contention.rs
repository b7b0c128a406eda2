//! # Contention Flows
//!
//! A global root field stays locked while its save is parked at the
//! backend; other roots and owners keep working. Owner operations from many
//! tasks never interleave inside one unshard → mutate → reshard block.

#[cfg(test)]
mod tests {
    use crate::fixtures::{init_tracing, items, memory_service, player_schema, test_config, GatedBackend};
    use record_sharding::{
        record, InMemoryBackend, Operation, RecordError, RecordLifecycle, ShardedRecordService,
        ShardedRecordsApi, Value,
    };
    use std::sync::Arc;

    fn insert(entries: &[(&str, i64)]) -> Operation {
        let table = record(entries.iter().map(|(k, v)| (*k, Value::from(*v))));
        Operation::new("leaderboard", "INSERT", Value::Map(table))
    }

    #[tokio::test]
    async fn test_global_root_locked_while_save_in_flight() -> anyhow::Result<()> {
        init_tracing();
        let backend = Arc::new(GatedBackend::new());
        let service = Arc::new(ShardedRecordService::with_json(
            Arc::clone(&backend),
            test_config(),
        )?);
        service.initialize(player_schema()).await?;
        service.apply_operator(None, insert(&[("ann", 10)])).await?;

        backend.close();
        let saver = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.save_global_field("leaderboard").await })
        };
        backend.write_parked().await;

        let before = service.raw_global_record(Some("leaderboard"))?;
        let rejected = service.apply_operator(None, insert(&[("bob", 5)])).await;
        assert!(matches!(
            rejected,
            Err(RecordError::GlobalRootLocked(ref root)) if root == "leaderboard"
        ));
        assert!(matches!(
            service.delete_global_field("leaderboard").await,
            Err(RecordError::GlobalRootLocked(_))
        ));
        assert_eq!(service.raw_global_record(Some("leaderboard"))?, before);

        // A different root is unaffected.
        service
            .apply_operator(None, Operation::new("season", "+", 1))
            .await?;

        backend.open();
        saver.await??;

        service.apply_operator(None, insert(&[("bob", 5)])).await?;
        assert_eq!(
            service.read(None, "leaderboard.bob").await?,
            Some(Value::from(5))
        );
        assert_eq!(service.read(None, "season").await?, Some(Value::from(2)));
        Ok(())
    }

    #[tokio::test]
    async fn test_reattach_waits_for_detach_save() -> anyhow::Result<()> {
        init_tracing();
        let backend = Arc::new(GatedBackend::new());
        let service = Arc::new(ShardedRecordService::with_json(
            Arc::clone(&backend),
            test_config(),
        )?);
        service.initialize(player_schema()).await?;
        service.owner_attached(7).await?;
        service
            .apply_operator(Some(7), Operation::new("coins", "+", 100))
            .await?;

        backend.close();
        let detach = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.owner_detached(7).await })
        };
        backend.write_parked().await;
        assert!(!service.is_attached(7));

        let rejoin = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.owner_attached(7).await })
        };
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
        assert!(!rejoin.is_finished());

        backend.open();
        detach.await??;
        rejoin.await??;
        assert_eq!(service.read(Some(7), "coins").await?, Some(Value::from(100)));

        service
            .apply_operator(Some(7), Operation::new("coins", "+", 1))
            .await?;
        service.owner_detached(7).await?;
        service.owner_attached(7).await?;
        assert_eq!(service.read(Some(7), "coins").await?, Some(Value::from(101)));
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_caller_can_retry() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = memory_service(&backend);
        service.initialize(player_schema()).await?;

        let guard = service.lock_global_root("leaderboard")?;
        let first = service.apply_operator(None, insert(&[("cy", 1)])).await;
        assert!(matches!(first, Err(RecordError::GlobalRootLocked(_))));
        drop(guard);

        let retried = service.apply_operator(None, insert(&[("cy", 1)])).await?;
        assert!(retried.resharded);
        assert_eq!(service.read(None, "leaderboard.cy").await?, Some(Value::from(1)));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_owner_operations_are_atomic() -> anyhow::Result<()> {
        let backend = Arc::new(InMemoryBackend::new());
        let service = Arc::new(memory_service(&backend));
        service.initialize(player_schema()).await?;
        service.owner_attached(9).await?;
        service
            .apply_operator(Some(9), Operation::new("inventory", "INSERT", Value::Map(items(4))))
            .await?;

        let tasks: Vec<_> = (0..48)
            .map(|i| {
                let service = Arc::clone(&service);
                tokio::spawn(async move {
                    service
                        .apply_operator(Some(9), Operation::new("coins", "+", 1))
                        .await?;
                    let entry = record([(format!("loot_{i:02}"), Value::from(i))]);
                    service
                        .apply_operator(
                            Some(9),
                            Operation::new("inventory", "INSERT", Value::Map(entry)),
                        )
                        .await
                })
            })
            .collect();
        for task in tasks {
            task.await??;
        }

        assert_eq!(service.read(Some(9), "coins").await?, Some(Value::from(48)));
        let Some(Value::Map(inventory)) = service.read(Some(9), "inventory").await? else {
            anyhow::bail!("inventory should read as a mapping");
        };
        assert_eq!(inventory.len(), 52);

        let raw = service.raw_owner_records(Some(9));
        assert!(raw[&9].get("inventory").and_then(Value::as_marker).is_some());
        Ok(())
    }
}
