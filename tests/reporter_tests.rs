mod common;

#[cfg(test)]
mod reporter_tests {
    use crate::common::{reporter, FakeBattery, FakePermissions, FakeRegistry, TestEnv};
    use beacon_agent_lib::config::LOCATION_TASK_NAME;
    use beacon_agent_lib::permissions::{PermissionKind, PermissionStatus};
    use beacon_agent_lib::platform::BackgroundTaskRegistry;
    use beacon_agent_lib::sampling::TrackingState;
    use beacon_agent_lib::Error;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_start_tracking_registers_and_persists() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);

        assert_eq!(reporter.state().await, TrackingState::Idle);
        reporter.start_tracking().await.unwrap();

        assert_eq!(reporter.state().await, TrackingState::Tracking);
        assert!(reporter.is_tracking().await);
        assert_eq!(registry.registrations(), 1);
        assert!(registry.is_registered(LOCATION_TASK_NAME).await.unwrap());
        assert!(env.flag().get().await.unwrap());
    }

    #[tokio::test]
    async fn test_start_tracking_twice_registers_once() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);

        reporter.start_tracking().await.unwrap();
        reporter.start_tracking().await.unwrap();

        assert_eq!(registry.registrations(), 1);
        assert_eq!(reporter.state().await, TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_start_tracking_restores_cleared_flag() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);
        reporter.start_tracking().await.unwrap();

        // Another context rewrote the shared key
        env.flag().set(false).await.unwrap();
        reporter.start_tracking().await.unwrap();

        assert!(env.flag().get().await.unwrap());
        assert_eq!(registry.registrations(), 1);
        assert_eq!(reporter.state().await, TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_reporters_sharing_database_agree() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let tracker = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);
        let observer = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);

        tracker.start_tracking().await.unwrap();

        assert_eq!(observer.reconcile().await.unwrap(), TrackingState::Tracking);
        assert!(env.flag().get().await.unwrap());
        assert_eq!(tracker.reconcile().await.unwrap(), TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_start_tracking_reuses_existing_registration() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::with_registered(LOCATION_TASK_NAME));
        let battery = Arc::new(FakeBattery::new(true));
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), Some(battery.clone()));

        reporter.start_tracking().await.unwrap();

        assert_eq!(registry.registrations(), 0);
        assert_eq!(battery.prompts.load(Ordering::SeqCst), 0);
        assert!(env.flag().get().await.unwrap());
        assert_eq!(reporter.state().await, TrackingState::Tracking);
    }

    #[tokio::test]
    async fn test_foreground_denied() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let permissions = Arc::new(FakePermissions::with(
            PermissionStatus::Denied,
            PermissionStatus::Granted,
            true,
        ));
        let reporter = reporter(&env, permissions.clone(), registry.clone(), None);

        let result = reporter.start_tracking().await;

        assert!(matches!(result, Err(Error::PermissionDenied(PermissionKind::Foreground))));
        assert_eq!(reporter.state().await, TrackingState::Idle);
        assert_eq!(registry.registrations(), 0);
        assert_eq!(permissions.background_requests.load(Ordering::SeqCst), 0);
        assert!(!env.flag().get().await.unwrap());
    }

    #[tokio::test]
    async fn test_background_denied() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let permissions = Arc::new(FakePermissions::with(
            PermissionStatus::Granted,
            PermissionStatus::Denied,
            true,
        ));
        let reporter = reporter(&env, permissions, registry.clone(), None);

        let result = reporter.start_tracking().await;

        assert!(matches!(result, Err(Error::PermissionDenied(PermissionKind::Background))));
        assert_eq!(reporter.state().await, TrackingState::Idle);
        assert_eq!(registry.registrations(), 0);
    }

    #[tokio::test]
    async fn test_background_grant_skipped_when_not_required() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let permissions = Arc::new(FakePermissions::with(
            PermissionStatus::Granted,
            PermissionStatus::Denied,
            false,
        ));
        let reporter = reporter(&env, permissions.clone(), registry, None);

        reporter.start_tracking().await.unwrap();

        assert_eq!(permissions.background_requests.load(Ordering::SeqCst), 0);
        assert!(reporter.is_tracking().await);
    }

    #[tokio::test]
    async fn test_declined_battery_prompt_does_not_block() {
        let env = TestEnv::offline();
        let battery = Arc::new(FakeBattery::new(false));
        let reporter = reporter(
            &env,
            Arc::new(FakePermissions::granted()),
            Arc::new(FakeRegistry::default()),
            Some(battery.clone()),
        );

        reporter.start_tracking().await.unwrap();

        assert_eq!(battery.prompts.load(Ordering::SeqCst), 1);
        assert!(reporter.is_tracking().await);
    }

    #[tokio::test]
    async fn test_stop_tracking() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);

        reporter.start_tracking().await.unwrap();
        reporter.stop_tracking().await.unwrap();

        assert_eq!(reporter.state().await, TrackingState::Idle);
        assert!(!registry.is_registered(LOCATION_TASK_NAME).await.unwrap());
        assert!(!env.flag().get().await.unwrap());
    }

    #[tokio::test]
    async fn test_stop_when_not_tracking_is_noop() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);

        assert_ok!(reporter.stop_tracking().await);
        assert_ok!(reporter.stop_tracking().await);

        assert_eq!(registry.unregister_calls.load(Ordering::SeqCst), 0);
        assert_eq!(reporter.state().await, TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_stop_clears_inconsistent_flag() {
        let env = TestEnv::offline();
        env.flag().set(true).await.unwrap();
        let reporter = reporter(
            &env,
            Arc::new(FakePermissions::granted()),
            Arc::new(FakeRegistry::default()),
            None,
        );

        reporter.stop_tracking().await.unwrap();

        assert!(!env.flag().get().await.unwrap());
        assert_eq!(reporter.state().await, TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_stop_unregister_failure_still_idle() {
        let env = TestEnv::offline();
        let registry = Arc::new(FakeRegistry::default());
        let reporter = reporter(&env, Arc::new(FakePermissions::granted()), registry.clone(), None);
        reporter.start_tracking().await.unwrap();

        registry.fail_unregister.store(true, Ordering::SeqCst);
        let result = reporter.stop_tracking().await;

        assert!(matches!(result, Err(Error::Platform(_))));
        assert_eq!(reporter.state().await, TrackingState::Idle);
        assert!(!env.flag().get().await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_flag_without_registration() {
        let env = TestEnv::offline();
        env.flag().set(true).await.unwrap();
        let reporter = reporter(
            &env,
            Arc::new(FakePermissions::granted()),
            Arc::new(FakeRegistry::default()),
            None,
        );

        let state = reporter.reconcile().await.unwrap();

        assert_eq!(state, TrackingState::Idle);
        assert!(!env.flag().get().await.unwrap());
    }

    #[tokio::test]
    async fn test_reconcile_registration_without_flag() {
        let env = TestEnv::offline();
        let reporter = reporter(
            &env,
            Arc::new(FakePermissions::granted()),
            Arc::new(FakeRegistry::with_registered(LOCATION_TASK_NAME)),
            None,
        );

        assert_eq!(reporter.reconcile().await.unwrap(), TrackingState::Idle);
    }

    #[tokio::test]
    async fn test_reconcile_both_present() {
        let env = TestEnv::offline();
        env.flag().set(true).await.unwrap();
        let reporter = reporter(
            &env,
            Arc::new(FakePermissions::granted()),
            Arc::new(FakeRegistry::with_registered(LOCATION_TASK_NAME)),
            None,
        );

        assert_eq!(reporter.reconcile().await.unwrap(), TrackingState::Tracking);
        assert!(reporter.is_tracking().await);
    }
}
