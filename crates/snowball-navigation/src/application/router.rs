//! Address-bar router.
//!
//! The address fragment `#<sectionId>` is the subject-visible handle on
//! navigation. Every change to it goes through the machine; whatever the
//! machine ends up showing is written back into the address.

use snowball_core::ids::SectionId;
use tracing::debug;

use crate::application::machine::{NavigationMachine, NavigationOutcome};
use crate::domain::ports::AddressBar;

/// Address bar kept in memory, for hosts without a real one.
#[derive(Debug, Clone, Default)]
pub struct MemoryAddressBar {
    history: Vec<String>,
}

impl MemoryAddressBar {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `fragment` already in the address.
    #[must_use]
    pub fn at(fragment: &str) -> Self {
        Self {
            history: vec![fragment.to_owned()],
        }
    }

    /// Every entry, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

impl AddressBar for MemoryAddressBar {
    fn fragment(&self) -> Option<String> {
        self.history.last().cloned()
    }

    fn push(&mut self, fragment: &str) {
        self.history.push(fragment.to_owned());
    }

    fn replace(&mut self, fragment: &str) {
        match self.history.last_mut() {
            Some(last) => fragment.clone_into(last),
            None => self.history.push(fragment.to_owned()),
        }
    }
}

/// Reads section requests from an [`AddressBar`] and keeps it in step
/// with the machine.
#[derive(Debug)]
pub struct HashRouter<A> {
    bar: A,
}

impl<A: AddressBar> HashRouter<A> {
    #[must_use]
    pub fn new(bar: A) -> Self {
        Self { bar }
    }

    #[must_use]
    pub fn address_bar(&self) -> &A {
        &self.bar
    }

    /// The section named by the address, `None` when it names nothing.
    #[must_use]
    pub fn requested(&self) -> Option<SectionId> {
        self.bar
            .fragment()
            .map(|raw| raw.trim().trim_start_matches('#').to_owned())
            .filter(|raw| !raw.is_empty())
            .map(SectionId::from)
    }

    /// Points the address at `id`. A no-op when it already is; returns
    /// whether the address changed.
    pub fn navigate(&mut self, id: &SectionId, replace: bool) -> bool {
        if self.requested().as_ref() == Some(id) {
            return false;
        }
        if replace {
            self.bar.replace(id.as_str());
        } else {
            self.bar.push(id.as_str());
        }
        true
    }

    /// Resolves the address and asks the machine to show it. Redirects
    /// (and an empty address) overwrite the history entry.
    pub async fn handle_address_change(
        &mut self,
        machine: &mut NavigationMachine,
    ) -> NavigationOutcome {
        let target = self
            .requested()
            .unwrap_or_else(|| machine.canonical_start());
        let outcome = machine.request_navigate(&target).await;
        if let Some(shown) = machine.current().cloned() {
            if self.navigate(&shown, true) {
                debug!(requested = %target, shown = %shown, "address rewritten");
            }
        }
        outcome
    }

    /// Moves the address to `id`, then handles it as an address change.
    pub async fn follow(
        &mut self,
        machine: &mut NavigationMachine,
        id: &SectionId,
        replace: bool,
    ) -> NavigationOutcome {
        self.navigate(id, replace);
        self.handle_address_change(machine).await
    }
}
