use async_trait::async_trait;
use resend_rs::{Resend, types::CreateEmailBaseOptions};

use crate::config::settings::MailConfig;

/// Outbound mail contract. Fire-and-forget: implementations log delivery
/// failures instead of surfacing them, so no caller can turn mail trouble
/// into an observable response difference.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_reset_email(&self, to: &str, token: &str);
}

fn env_non_empty(name: &'static str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn join_base_and_path(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let p = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };
    format!("{}{}", base, p)
}

pub fn build_reset_link(mail: &MailConfig, token: &str) -> String {
    let url = join_base_and_path(&mail.base_url, &mail.reset_path);
    format!("{}?token={}", url, token)
}

/// Sends reset links through Resend. `Resend::default()` picks up
/// RESEND_API_KEY from the environment.
pub struct ResendMailer {
    from: String,
    mail: MailConfig,
}

impl ResendMailer {
    pub fn from_env(mail: &MailConfig) -> Option<Self> {
        env_non_empty("RESEND_API_KEY")?;
        let from = env_non_empty("RESEND_FROM")?;
        Some(Self {
            from,
            mail: mail.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send_reset_email(&self, to: &str, token: &str) {
        let link = build_reset_link(&self.mail, token);
        let subject = "Password Reset Request";
        let html = format!(
            "<p>Please click the link below to reset your password:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>If you did not request this, you can ignore this email.</p>",
        );

        let resend = Resend::default();
        let email = CreateEmailBaseOptions::new(self.from.clone(), [to.to_string()], subject)
            .with_html(&html);
        if let Err(e) = resend.emails.send(email).await {
            tracing::warn!("failed to send password reset email: {}", e);
        }
    }
}

/// Fallback when Resend env is not configured: logs the link instead of
/// delivering it, keeping local development usable.
pub struct LogMailer {
    mail: MailConfig,
}

impl LogMailer {
    pub fn new(mail: &MailConfig) -> Self {
        Self { mail: mail.clone() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_reset_email(&self, to: &str, token: &str) {
        let link = build_reset_link(&self.mail, token);
        tracing::info!(%to, %link, "password reset email (log only)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_base_and_path_normalizes_slashes() {
        assert_eq!(
            join_base_and_path("https://app.example.com/", "/reset-password"),
            "https://app.example.com/reset-password"
        );
        assert_eq!(
            join_base_and_path("https://app.example.com", "reset-password"),
            "https://app.example.com/reset-password"
        );
    }

    #[test]
    fn reset_link_embeds_token_as_query() {
        let mail = MailConfig {
            base_url: "https://app.example.com".into(),
            reset_path: "/reset-password".into(),
        };
        assert_eq!(
            build_reset_link(&mail, "tok123"),
            "https://app.example.com/reset-password?token=tok123"
        );
    }
}
