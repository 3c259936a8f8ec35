
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        // Channels are unconfigured out of the box.
        assert!(result.warnings.iter().any(|w| w.path == "notifications.email.smtp_host"));
        assert!(result.warnings.iter().any(|w| w.path == "notifications.sms"));
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = Config::default();
        config.executor.max_workers = 0;

        let result = ConfigValidator::validate(&config);
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "executor.max_workers"));
    }

    #[test]
    fn test_validate_unknown_backend() {
        let mut config = Config::default();
        config.store.backend = "postgres".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "store.backend"));
    }

    #[test]
    fn test_validate_memory_backend_warns() {
        let mut config = Config::default();
        config.store.backend = "memory".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "store.backend"));
    }

    #[test]
    fn test_validate_timezone() {
        let mut config = Config::default();
        config.scheduler.timezone = "Europe/Berlin".to_string();
        assert!(ConfigValidator::validate(&config).is_valid());

        config.scheduler.timezone = "Mars/Olympus".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "scheduler.timezone"));
    }

    #[test]
    fn test_validate_zero_tick() {
        let mut config = Config::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(!ConfigValidator::validate(&config).is_valid());
    }

    #[test]
    fn test_validate_email_without_sender() {
        let mut config = Config::default();
        config.notifications.email.smtp_host = "smtp.example.com".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "notifications.email.from"));
    }

    #[test]
    fn test_validate_bad_sms_api_base() {
        let mut config = Config::default();
        config.notifications.sms.api_base = "api.twilio.com".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.path == "notifications.sms.api_base"));
    }

    #[test]
    fn test_zero_retries_warns() {
        let mut config = Config::default();
        config.executor.max_retries = 0;

        let result = ConfigValidator::validate(&config);
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "executor.max_retries"));
    }

    #[test]
    fn test_into_result() {
        let mut config = Config::default();
        assert!(ConfigValidator::validate(&config).into_result().is_ok());

        config.executor.max_workers = 0;
        let err = ConfigValidator::validate(&config).into_result().unwrap_err();
        assert!(err.to_string().contains("executor.max_workers"));
    }
