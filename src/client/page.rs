use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::api::{SignupApi, SignupReply};
use super::form::{Effect, FormEvent, FormState};

pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
    fn replace(&self, path: &str);
}

/// Locally cached authentication state.
#[async_trait]
pub trait SessionCache: Send + Sync {
    fn is_authenticated(&self) -> bool;
    async fn refresh(&self) -> anyhow::Result<()>;
}

/// Drives a [`FormState`] and runs its effects. Dropping the page cancels a
/// pending post-signup redirect.
pub struct SignupPage {
    state: FormState,
    api: Arc<dyn SignupApi>,
    session: Arc<dyn SessionCache>,
    navigator: Arc<dyn Navigator>,
    redirect: Option<JoinHandle<()>>,
}

impl SignupPage {
    /// Returns `None` for an authenticated visitor, who is sent to
    /// `redirected_from` (or `/`) instead of seeing the form.
    pub fn mount(
        api: Arc<dyn SignupApi>,
        session: Arc<dyn SessionCache>,
        navigator: Arc<dyn Navigator>,
        redirected_from: Option<&str>,
    ) -> Option<Self> {
        if session.is_authenticated() {
            navigator.replace(redirected_from.unwrap_or("/"));
            return None;
        }
        Some(Self {
            state: FormState::default(),
            api,
            session,
            navigator,
            redirect: None,
        })
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn redirect_pending(&self) -> bool {
        self.redirect.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Apply `event` and every event its effects produce.
    pub async fn dispatch(&mut self, event: FormEvent) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let (next, effects) = std::mem::take(&mut self.state).apply(event);
            self.state = next;
            for effect in effects {
                if let Some(reply) = self.run(effect).await {
                    queue.push_back(reply);
                }
            }
        }
    }

    async fn run(&mut self, effect: Effect) -> Option<FormEvent> {
        match effect {
            Effect::SendSignup(req) => Some(match self.api.signup(&req).await {
                Ok(SignupReply::Accepted(res)) => {
                    debug!(user_id = %res.user.id, "signup accepted");
                    FormEvent::ServerAccepted
                }
                Ok(SignupReply::Rejected { message }) => FormEvent::ServerRejected { message },
                Err(e) => {
                    warn!(error = %e, "signup request failed");
                    FormEvent::TransportFailed
                }
            }),
            Effect::RefreshSession => {
                if let Err(e) = self.session.refresh().await {
                    warn!(error = %e, "session refresh failed");
                }
                None
            }
            Effect::ScheduleRedirect { after, to } => {
                if let Some(prev) = self.redirect.take() {
                    prev.abort();
                }
                let navigator = self.navigator.clone();
                self.redirect = Some(tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    navigator.push(to);
                }));
                None
            }
        }
    }
}

impl Drop for SignupPage {
    fn drop(&mut self) {
        if let Some(handle) = self.redirect.take() {
            handle.abort();
        }
    }
}
