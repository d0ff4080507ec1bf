use crate::error::Error;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::info;

/// Message templates this core asks the notification collaborator to
/// render. Delivery itself is someone else's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    AccountActivation,
    PasswordReset,
}

impl Template {
    pub fn as_str(self) -> &'static str {
        match self {
            Template::AccountActivation => "account-activation",
            Template::PasswordReset => "password-reset",
        }
    }
}

/// Notification collaborator contract: fire-and-forget (recipient,
/// template, context) sends.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, template: Template, context: Value)
    -> Result<(), Error>;
}

/// Default collaborator that only logs the send. Stands in wherever no real
/// mail transport is wired up.
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(
        &self,
        recipient: &str,
        template: Template,
        context: Value,
    ) -> Result<(), Error> {
        info!(recipient, template = template.as_str(), %context, "notification sent");
        Ok(())
    }
}

/// Builds the account-message contexts and hands them to the collaborator.
pub struct AccountNotices<N> {
    notifier: Arc<N>,
}

impl<N: Notifier> AccountNotices<N> {
    pub fn new(notifier: Arc<N>) -> Self {
        Self { notifier }
    }

    pub async fn send_activation(
        &self,
        email: &str,
        user_name: &str,
        activation_url: &str,
    ) -> Result<(), Error> {
        let context = json!({
            "user": user_name,
            "activation_url": activation_url,
        });
        self.notifier
            .send(email, Template::AccountActivation, context)
            .await
    }

    pub async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<(), Error> {
        let context = json!({ "reset_url": reset_url });
        self.notifier
            .send(email, Template::PasswordReset, context)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn activation_notice_carries_user_and_link() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|recipient, template, context| {
                recipient == "manager@clinic.example"
                    && *template == Template::AccountActivation
                    && *context
                        == json!({
                            "user": "Amara",
                            "activation_url": "https://pilot.example/activate/abc",
                        })
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let notices = AccountNotices::new(Arc::new(notifier));
        notices
            .send_activation(
                "manager@clinic.example",
                "Amara",
                "https://pilot.example/activate/abc",
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn password_reset_uses_its_own_template() {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .withf(|_, template, _| *template == Template::PasswordReset)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let notices = AccountNotices::new(Arc::new(notifier));
        notices
            .send_password_reset("manager@clinic.example", "https://pilot.example/reset/xyz")
            .await
            .unwrap();
    }
}
