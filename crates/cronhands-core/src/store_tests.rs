
    use super::*;
    use crate::execution::{ExecutionStatus, ExecutionTrigger};
    use crate::job::ScheduleSpec;
    use crate::notification::{NotificationChannel, NotificationEvent};
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn job(name: &str) -> Job {
        Job::new(Uuid::new_v4(), name, "echo hi", ScheduleSpec::cron("0 * * * *"))
    }

    #[tokio::test]
    async fn test_memory_job_store() {
        let store = MemoryStore::new();
        let job = job("nightly");

        store.save_job(&job).await.unwrap();

        let loaded = store.get_job(job.id).await.unwrap();
        assert_eq!(loaded.unwrap().name, "nightly");
        assert_eq!(store.list_jobs().await.unwrap().len(), 1);

        assert!(store.delete_job(job.id).await.unwrap());
        assert!(store.get_job(job.id).await.unwrap().is_none());
        assert!(!store.delete_job(job.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_jobs_orders_by_priority() {
        let store = MemoryStore::new();
        store.save_job(&job("low").with_priority(1)).await.unwrap();
        store.save_job(&job("high").with_priority(10)).await.unwrap();

        let names: Vec<String> = store
            .list_jobs()
            .await
            .unwrap()
            .into_iter()
            .map(|j| j.name)
            .collect();
        assert_eq!(names, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn test_get_jobs_skips_unknown() {
        let store = MemoryStore::new();
        let a = job("a");
        let b = job("b");
        store.save_job(&a).await.unwrap();
        store.save_job(&b).await.unwrap();

        let found = store.get_jobs(&[b.id, Uuid::new_v4(), a.id]).await.unwrap();
        let names: Vec<&str> = found.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_update_job_status() {
        let store = MemoryStore::new();
        let job = job("status");
        store.save_job(&job).await.unwrap();

        let updated = store
            .update_job_status(job.id, JobStatus::Failed)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, JobStatus::Failed);
        assert_eq!(
            store.get_job(job.id).await.unwrap().unwrap().status,
            JobStatus::Failed
        );

        let missing = store
            .update_job_status(Uuid::new_v4(), JobStatus::Running)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_executions_newest_first() {
        let store = MemoryStore::new();
        let job_id = Uuid::new_v4();

        let mut older = Execution::new(job_id, ExecutionTrigger::Scheduled);
        older.created_at = Utc::now() - Duration::minutes(5);
        let newer = Execution::new(job_id, ExecutionTrigger::Manual);
        let unrelated = Execution::new(Uuid::new_v4(), ExecutionTrigger::Manual);

        store.create_execution(&older).await.unwrap();
        store.create_execution(&newer).await.unwrap();
        store.create_execution(&unrelated).await.unwrap();

        let listed = store.list_executions(job_id).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }

    #[tokio::test]
    async fn test_update_execution_requires_existing() {
        let store = MemoryStore::new();
        let mut execution = Execution::new(Uuid::new_v4(), ExecutionTrigger::Scheduled);

        assert!(matches!(
            store.update_execution(&execution).await,
            Err(StoreError::NotFound(_))
        ));

        store.create_execution(&execution).await.unwrap();
        execution.set_status(ExecutionStatus::Completed);
        store.update_execution(&execution).await.unwrap();
        let loaded = store.get_execution(execution.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, ExecutionStatus::Completed);
        assert!(loaded.end_time.is_some());
    }

    #[tokio::test]
    async fn test_list_configs_global_and_scoped() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let job_a = Uuid::new_v4();
        let job_b = Uuid::new_v4();

        let global = NotificationConfig::new(user, NotificationChannel::Email, json!({}));
        let scoped_a =
            NotificationConfig::new(user, NotificationChannel::Sms, json!({})).for_job(job_a);
        let scoped_b =
            NotificationConfig::new(user, NotificationChannel::Webhook, json!({})).for_job(job_b);
        let other_user = NotificationConfig::new(Uuid::new_v4(), NotificationChannel::Email, json!({}));

        for config in [&global, &scoped_a, &scoped_b, &other_user] {
            store.save_config(config).await.unwrap();
        }

        let for_a = store.list_configs(user, Some(job_a)).await.unwrap();
        let ids: Vec<Uuid> = for_a.iter().map(|c| c.id).collect();
        assert_eq!(for_a.len(), 2);
        assert!(ids.contains(&global.id));
        assert!(ids.contains(&scoped_a.id));

        let unscoped = store.list_configs(user, None).await.unwrap();
        assert_eq!(unscoped.len(), 1);
        assert_eq!(unscoped[0].id, global.id);

        assert!(store.delete_config(global.id).await.unwrap());
        assert_eq!(store.list_configs(user, Some(job_a)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logs_append_and_update() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let mut log = NotificationLog::new(
            user,
            None,
            None,
            NotificationChannel::Email,
            NotificationEvent::Success,
            "ops@example.com",
            "subject",
            "body",
        );

        store.create_log(&log).await.unwrap();
        log.mark_failed("connection refused");
        store.update_log(&log).await.unwrap();

        let logs = store.list_logs(user).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].retry_count, 1);
        assert_eq!(logs[0].error_message.as_deref(), Some("connection refused"));

        let stray = NotificationLog::new(
            user,
            None,
            None,
            NotificationChannel::Sms,
            NotificationEvent::Start,
            "+15550100",
            "s",
            "c",
        );
        assert!(matches!(
            store.update_log(&stray).await,
            Err(StoreError::NotFound(_))
        ));
    }
