//! Run notifications. A completed run and every fatal failure produce one
//! message; where it goes depends on whether mail is configured.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::MailConfig;

/// Sink for the end-of-run message.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str) -> anyhow::Result<()>;
}

/// Used when mail is not configured or disabled: the message only goes to
/// the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        tracing::debug!("Notification (mail disabled): {}\n{}", subject, body);
        Ok(())
    }
}

/// Pipes an RFC 5322 message into `sendmail -t -i`.
#[derive(Debug)]
pub struct SendmailNotifier {
    sendmail_path: PathBuf,
    from: String,
    to: Vec<String>,
    subject_prefix: String,
    timeout: Duration,
}

impl SendmailNotifier {
    pub fn new(mail: &MailConfig) -> Self {
        Self {
            sendmail_path: mail.sendmail_path.clone(),
            from: mail.from.clone(),
            to: mail.to.clone(),
            subject_prefix: mail.subject_prefix.clone(),
            timeout: Duration::from_secs(mail.timeout_secs),
        }
    }

    fn subject(&self, subject: &str) -> String {
        if self.subject_prefix.is_empty() {
            subject.to_string()
        } else {
            format!("{} {}", self.subject_prefix, subject)
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(&self, subject: &str, body: &str) -> anyhow::Result<()> {
        let message = format_message(&self.from, &self.to, &self.subject(subject), body, Local::now());

        let mut child = Command::new(&self.sendmail_path)
            .arg("-t")
            .arg("-i")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to run {}", self.sendmail_path.display()))?;

        let mut stdin = child.stdin.take().context("sendmail stdin not captured")?;
        stdin
            .write_all(message.as_bytes())
            .await
            .context("Failed to write message to sendmail")?;
        drop(stdin);

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow::anyhow!("sendmail timed out after {:?}", self.timeout))?
            .context("Failed to wait for sendmail")?;

        if !output.status.success() {
            anyhow::bail!(
                "sendmail exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        tracing::debug!("Notification sent to {}", self.to.join(", "));
        Ok(())
    }
}

/// Mail when configured, otherwise the log.
pub fn from_config(mail: Option<&MailConfig>) -> Box<dyn Notifier> {
    match mail {
        Some(mail) => Box::new(SendmailNotifier::new(mail)),
        None => Box::new(LogNotifier),
    }
}

/// Plain-text message with the headers `sendmail -t` needs.
pub fn format_message(
    from: &str,
    to: &[String],
    subject: &str,
    body: &str,
    date: DateTime<Local>,
) -> String {
    let mut message = String::new();
    message.push_str(&format!("From: {}\r\n", from));
    message.push_str(&format!("To: {}\r\n", to.join(", ")));
    message.push_str(&format!("Subject: {}\r\n", subject));
    message.push_str(&format!("Date: {}\r\n", date.to_rfc2822()));
    message.push_str("MIME-Version: 1.0\r\n");
    message.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    message.push_str("\r\n");
    for line in body.lines() {
        message.push_str(line);
        message.push_str("\r\n");
    }
    message
}
