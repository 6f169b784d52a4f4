//! End-to-end flows through the command router over an on-disk store.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use keyward_bot::embed::Embed;
use keyward_bot::platform::CommandOptions;
use keyward_bot::{
    ActionError, CommandInvocation, CommandRouter, MessageEvent, MessageOutcome, Messenger,
    Moderator, Services,
};
use keyward_bot::responder::AutoResponder;
use keyward_core::{
    EligibilityConfig, JsonDirStore, KeyStoreConfig, SpamConfig, KEY_ARCHIVE_PREFIX,
};
use tempfile::TempDir;

#[derive(Default)]
struct NullPlatform {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Moderator for NullPlatform {
    async fn ban(&self, _: &str, _: &str, _: &str) -> Result<(), ActionError> {
        Ok(())
    }

    async fn kick(&self, _: &str, _: &str, _: &str) -> Result<(), ActionError> {
        Ok(())
    }

    async fn timeout(&self, _: &str, user: &str, _: Duration, _: &str) -> Result<(), ActionError> {
        self.sent.lock().unwrap().push(format!("timeout {user}"));
        Ok(())
    }
}

#[async_trait]
impl Messenger for NullPlatform {
    async fn send_message(&self, _: &str, content: &str) -> Result<(), ActionError> {
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn send_embed(&self, _: &str, _: &Embed) -> Result<(), ActionError> {
        Ok(())
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn open(dir: &TempDir, policy: EligibilityConfig) -> (Services, CommandRouter) {
    let store = Arc::new(JsonDirStore::open(dir.path()).unwrap());
    let services = Services::with_store(
        store,
        KeyStoreConfig::default(),
        policy,
        SpamConfig::disabled(),
        Some("api".to_string()),
    );
    let platform = Arc::new(NullPlatform::default());
    let router = CommandRouter::new(
        &services,
        AutoResponder::default(),
        platform.clone(),
        platform,
    );
    (services, router)
}

fn message(user: &str, at: DateTime<Utc>) -> MessageEvent {
    MessageEvent {
        user_id: user.to_string(),
        display_name: format!("member{user}"),
        community_id: Some("guild".to_string()),
        channel_id: "general".to_string(),
        content: "hello".to_string(),
        is_bot: false,
        timestamp: at,
    }
}

fn command(name: &str, user: &str) -> CommandInvocation {
    CommandInvocation {
        command: name.to_string(),
        user_id: user.to_string(),
        username: format!("member{user}"),
        community_id: Some("guild".to_string()),
        community_owner_id: Some("owner".to_string()),
        channel_id: "general".to_string(),
        options: CommandOptions::new(),
        permissions: BTreeSet::new(),
    }
}

#[tokio::test]
async fn test_member_earns_key_and_owner_resets_it() {
    let dir = TempDir::new().unwrap();
    let policy = EligibilityConfig {
        require_verification: true,
        minimum_qualifying_events: 10,
    };
    let (services, router) = open(&dir, policy);

    for _ in 0..9 {
        router.handle_message(&message("1", t0())).await;
    }
    let reply = router.handle_command(&command("get-key", "1"), t0()).await;
    assert!(reply.content.contains("/verify-me"), "{}", reply.content);

    router.handle_command(&command("verify-me", "1"), t0()).await;
    let reply = router.handle_command(&command("get-key", "1"), t0()).await;
    assert_eq!(reply.content, "You need 1 more message to get the key (9/10).");

    assert_eq!(
        router.handle_message(&message("1", t0())).await,
        MessageOutcome::Counted {
            total: 10,
            responded: false
        }
    );
    let reply = router.handle_command(&command("get-key", "1"), t0()).await;
    let first_key = services.keys.peek().unwrap();
    assert!(reply.content.contains(first_key.value()));

    let reply = router
        .handle_command(&command("reset-key", "owner"), t0() + TimeDelta::minutes(5))
        .await;
    let second_key = services.keys.peek().unwrap();
    assert_ne!(second_key.value(), first_key.value());
    assert!(reply.content.ends_with(&format!("`{}`", second_key.value())));

    let archived: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with(KEY_ARCHIVE_PREFIX))
        .collect();
    assert_eq!(archived.len(), 1);
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let policy = EligibilityConfig {
        require_verification: false,
        minimum_qualifying_events: 3,
    };

    {
        let (_services, router) = open(&dir, policy);
        for _ in 0..3 {
            router.handle_message(&message("1", t0())).await;
        }
        router.handle_command(&command("get-key", "1"), t0()).await;
    }

    let (services, router) = open(&dir, policy);
    let key_before = services.keys.peek().unwrap();
    let reply = router
        .handle_command(&command("get-key", "1"), t0() + TimeDelta::hours(1))
        .await;
    assert_eq!(
        reply.content,
        format!("Current key: `{}`\nExpires in: 11h 0m", key_before.value())
    );
    assert_eq!(services.usage.get("1").unwrap().commands["get-key"].count, 2);

    let after_expiry = router
        .handle_command(&command("get-key", "1"), t0() + TimeDelta::hours(13))
        .await;
    assert!(!after_expiry.content.contains(key_before.value()));
}

#[tokio::test]
async fn test_concurrent_commands_rotate_once() {
    let dir = TempDir::new().unwrap();
    let (services, router) = open(&dir, EligibilityConfig::default());
    let router = Arc::new(router);

    let mut handles = Vec::new();
    for i in 0..16 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            router
                .handle_command(&command("get-key", &i.to_string()), t0())
                .await
        }));
    }
    let mut replies = BTreeSet::new();
    for handle in handles {
        replies.insert(handle.await.unwrap().content);
    }

    assert_eq!(replies.len(), 1);
    assert!(replies
        .iter()
        .all(|r| r.contains(services.keys.peek().unwrap().value())));
}
