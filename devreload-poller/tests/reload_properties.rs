//! Property tests for the compare-and-reload decision.

use async_trait::async_trait;
use proptest::prelude::*;
use reload_poller::{
    CheckError, CheckOutcome, ChannelReloader, Poller, PollerConfig, Version, VersionSource,
};
use std::sync::Arc;

struct FixedSource(Version);

#[async_trait]
impl VersionSource for FixedSource {
    async fn fetch_version(&self) -> Result<Version, CheckError> {
        Ok(self.0.clone())
    }
}

struct UnreachableSource;

#[async_trait]
impl VersionSource for UnreachableSource {
    async fn fetch_version(&self) -> Result<Version, CheckError> {
        Err(CheckError::Network("connection refused".to_string()))
    }
}

/// Run `ticks` check cycles and return how many reload events were emitted
fn reloads_after(baseline: Version, source: Arc<dyn VersionSource>, ticks: usize) -> usize {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let (reloader, mut rx) = ChannelReloader::channel();
        let poller = Poller::new(PollerConfig::new(), baseline, source, Arc::new(reloader))
            .unwrap();

        for _ in 0..ticks {
            let outcome = poller.tick().await;
            assert!(!matches!(outcome, CheckOutcome::Failed(CheckError::Reload(_))));
        }

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    })
}

fn version_strategy() -> impl Strategy<Value = Version> {
    prop_oneof![
        "[a-f0-9]{1,12}".prop_map(Version::Text),
        any::<u32>().prop_map(|n| Version::counter(n as u64)),
    ]
}

proptest! {
    #[test]
    fn equal_versions_never_reload(version in version_strategy(), ticks in 1usize..8) {
        let source = Arc::new(FixedSource(version.clone()));
        prop_assert_eq!(reloads_after(version, source, ticks), 0);
    }

    #[test]
    fn different_versions_reload_exactly_once(
        baseline in version_strategy(),
        fetched in version_strategy(),
        ticks in 1usize..8,
    ) {
        prop_assume!(baseline != fetched);
        let source = Arc::new(FixedSource(fetched));
        prop_assert_eq!(reloads_after(baseline, source, ticks), 1);
    }

    #[test]
    fn failures_never_reload(baseline in version_strategy(), ticks in 1usize..8) {
        prop_assert_eq!(reloads_after(baseline, Arc::new(UnreachableSource), ticks), 0);
    }

    #[test]
    fn text_and_number_never_match(n in any::<u32>()) {
        let text = Version::text(n.to_string());
        let number = Version::counter(n as u64);
        prop_assert_ne!(text.clone(), number.clone());
        let source = Arc::new(FixedSource(number));
        prop_assert_eq!(reloads_after(text, source, 2), 1);
    }
}
