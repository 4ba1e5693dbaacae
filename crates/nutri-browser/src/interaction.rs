//! Ordered interaction strategies
//!
//! Some page elements ignore one kind of click and answer another. A chain
//! tries each strategy in order and stops at the first that acts on the page.

use async_trait::async_trait;
use nutri_core::config::Locator;
use nutri_core::wait::{poll_until, PollPolicy};
use nutri_core::Result;
use tracing::{debug, warn};

use crate::session::{ClickMode, Session};

#[async_trait]
pub trait Interaction: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(false)` when there was nothing to act on
    async fn attempt(&self, session: &dyn Session, target: &Locator) -> Result<bool>;
}

/// `element.click()` on the target
pub struct ScriptedClick;

/// A synthetic bubbling mouse event on the target
pub struct DispatchedClick;

/// Scroll a fixed section into view, ignoring the target
pub struct ScrollToSection {
    pub section: Locator,
}

#[async_trait]
impl Interaction for ScriptedClick {
    fn name(&self) -> &'static str {
        "scripted click"
    }

    async fn attempt(&self, session: &dyn Session, target: &Locator) -> Result<bool> {
        session.click(target, ClickMode::Element).await
    }
}

#[async_trait]
impl Interaction for DispatchedClick {
    fn name(&self) -> &'static str {
        "dispatched mouse event"
    }

    async fn attempt(&self, session: &dyn Session, target: &Locator) -> Result<bool> {
        session.click(target, ClickMode::MouseEvent).await
    }
}

#[async_trait]
impl Interaction for ScrollToSection {
    fn name(&self) -> &'static str {
        "scroll to section"
    }

    async fn attempt(&self, session: &dyn Session, _target: &Locator) -> Result<bool> {
        session.scroll_into_view(&self.section).await
    }
}

pub struct InteractionChain {
    steps: Vec<Box<dyn Interaction>>,
}

impl InteractionChain {
    pub fn new(steps: Vec<Box<dyn Interaction>>) -> Self {
        Self { steps }
    }

    /// Scripted click, then dispatched mouse event, then scrolling `section`
    /// into view
    pub fn reveal(section: Locator) -> Self {
        Self::new(vec![
            Box::new(ScriptedClick),
            Box::new(DispatchedClick),
            Box::new(ScrollToSection { section }),
        ])
    }

    /// Name of the strategy that acted, or `None` if all of them failed
    pub async fn run(&self, session: &dyn Session, target: &Locator) -> Option<&'static str> {
        for step in &self.steps {
            match step.attempt(session, target).await {
                Ok(true) => {
                    debug!("{} acted on {}", step.name(), target);
                    return Some(step.name());
                }
                Ok(false) => debug!("{} found nothing at {}", step.name(), target),
                Err(e) => warn!("{} failed on {}: {}", step.name(), target, e),
            }
        }
        None
    }
}

/// First locator present on the page
///
/// The first candidate is waited for with `primary`, the rest with the
/// shorter `alternate` bound each.
pub async fn first_present<'a>(
    session: &dyn Session,
    candidates: &'a [Locator],
    primary: PollPolicy,
    alternate: PollPolicy,
) -> Option<&'a Locator> {
    for (i, locator) in candidates.iter().enumerate() {
        let policy = if i == 0 { primary } else { alternate };
        let found = poll_until(&locator.to_string(), policy, || async move {
            Ok(session.exists(locator).await?.then_some(()))
        })
        .await;

        match found {
            Ok(()) => return Some(locator),
            Err(e) => debug!("{}", e),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_core::{BrowserKind, NutriError};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every script and answers clicks per mode
    struct ClickSession {
        element_click_works: bool,
        mouse_event_works: bool,
        present: Vec<Locator>,
        log: Mutex<Vec<String>>,
    }

    impl ClickSession {
        fn new(element_click_works: bool, mouse_event_works: bool) -> Self {
            Self {
                element_click_works,
                mouse_event_works,
                present: Vec::new(),
                log: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Session for ClickSession {
        fn browser(&self) -> BrowserKind {
            BrowserKind::Chrome
        }

        async fn navigate(&self, _url: &str) -> Result<()> {
            Ok(())
        }

        async fn evaluate(&self, _body: &str) -> Result<Value> {
            Err(NutriError::Script("not scripted".to_string()))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }

        async fn exists(&self, locator: &Locator) -> Result<bool> {
            Ok(self.present.contains(locator))
        }

        async fn click(&self, _locator: &Locator, mode: ClickMode) -> Result<bool> {
            self.log.lock().unwrap().push(format!("{:?}", mode));
            match mode {
                ClickMode::Element if self.element_click_works => Ok(true),
                ClickMode::Element => Err(NutriError::Script("element click intercepted".to_string())),
                ClickMode::MouseEvent => Ok(self.mouse_event_works),
            }
        }

        async fn scroll_into_view(&self, _locator: &Locator) -> Result<bool> {
            self.log.lock().unwrap().push("scroll".to_string());
            Ok(true)
        }
    }

    fn quick() -> PollPolicy {
        PollPolicy::new(Duration::from_millis(10), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_first_strategy_wins() {
        let session = ClickSession::new(true, true);
        let chain = InteractionChain::reveal(Locator::css("#information"));
        let used = chain.run(&session, &Locator::css("a")).await;

        assert_eq!(used, Some("scripted click"));
        assert_eq!(*session.log.lock().unwrap(), vec!["Element"]);
    }

    #[tokio::test]
    async fn test_falls_through_to_mouse_event() {
        let session = ClickSession::new(false, true);
        let chain = InteractionChain::reveal(Locator::css("#information"));

        assert_eq!(
            chain.run(&session, &Locator::css("a")).await,
            Some("dispatched mouse event")
        );
    }

    #[tokio::test]
    async fn test_falls_through_to_scroll() {
        let session = ClickSession::new(false, false);
        let chain = InteractionChain::reveal(Locator::css("#information"));

        assert_eq!(chain.run(&session, &Locator::css("a")).await, Some("scroll to section"));
        assert_eq!(
            *session.log.lock().unwrap(),
            vec!["Element", "MouseEvent", "scroll"]
        );
    }

    #[tokio::test]
    async fn test_first_present_skips_missing() {
        let mut session = ClickSession::new(true, true);
        session.present = vec![Locator::css("a.switch")];
        let candidates = vec![
            Locator::text("#menu-top-int a", "Informação Nutricional"),
            Locator::css("a[href='#information']"),
            Locator::css("a.switch"),
        ];

        let found = first_present(&session, &candidates, quick(), quick()).await;
        assert_eq!(found, Some(&candidates[2]));
    }

    #[tokio::test]
    async fn test_first_present_none() {
        let session = ClickSession::new(true, true);
        let candidates = vec![Locator::css("a")];
        assert_eq!(first_present(&session, &candidates, quick(), quick()).await, None);
    }
}
