//! Visual transition around a language switch.
//!
//! The switching class goes on, the page fades, the new language is committed
//! once the fade has *entered*, and the class comes off once it has *exited*.

use std::future::Future;
use std::time::Duration;

use crate::config::TransitionConfig;

/// Signals the two phases of a switch animation.
pub trait Transition {
    /// Resolves when the page may be re-rendered.
    fn entered(&self) -> impl Future<Output = ()> + Send;

    /// Resolves when the switching state may be cleared.
    fn exited(&self) -> impl Future<Output = ()> + Send;
}

/// Waits fixed delays, like the CSS transition it accompanies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayTransition {
    pub enter: Duration,
    pub exit: Duration,
}

impl DelayTransition {
    #[must_use]
    pub const fn new(enter: Duration, exit: Duration) -> Self {
        Self { enter, exit }
    }
}

impl Default for DelayTransition {
    fn default() -> Self {
        Self::from(TransitionConfig::default())
    }
}

impl From<TransitionConfig> for DelayTransition {
    fn from(config: TransitionConfig) -> Self {
        Self::new(
            Duration::from_millis(config.enter_delay_ms),
            Duration::from_millis(config.exit_delay_ms),
        )
    }
}

impl Transition for DelayTransition {
    async fn entered(&self) {
        tokio::time::sleep(self.enter).await;
    }

    async fn exited(&self) {
        tokio::time::sleep(self.exit).await;
    }
}

/// No animation: both phases complete at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImmediateTransition;

impl Transition for ImmediateTransition {
    async fn entered(&self) {}

    async fn exited(&self) {}
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn default_delays_match_stylesheet() {
        let transition = DelayTransition::default();

        assert_eq!(transition.enter, Duration::from_millis(50));
        assert_eq!(transition.exit, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn delay_transition_waits_each_phase() {
        let transition = DelayTransition::new(Duration::from_millis(5), Duration::from_millis(20));
        let start = tokio::time::Instant::now();

        transition.entered().await;
        assert!(start.elapsed() >= Duration::from_millis(5));

        transition.exited().await;
        assert!(start.elapsed() >= Duration::from_millis(25));
    }

    #[rstest]
    fn immediate_transition_is_ready_on_first_poll() {
        let transition = ImmediateTransition;

        let mut entered = tokio_test::task::spawn(transition.entered());
        let mut exited = tokio_test::task::spawn(transition.exited());

        tokio_test::assert_ready!(entered.poll());
        tokio_test::assert_ready!(exited.poll());
    }
}
