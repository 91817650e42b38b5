//! End-to-end publishing tests
//!
//! Runs the orchestrator against mock platforms and a Bluesky client backed
//! by the in-memory PDS, covering failure isolation between platforms and
//! the bounded Bluesky login loop.

use libcrosspost::platforms::bluesky::{BlueskyClient, MAX_LOGIN_ATTEMPTS};
use libcrosspost::platforms::mock::{MockAtprotoApi, MockConfig, MockPlatform};
use libcrosspost::platforms::Platform;
use libcrosspost::secret::{SecretSequence, StaticSecret};
use libcrosspost::types::PostPayload;
use libcrosspost::{Loaded, PlatformError, PlatformKind, PlatformSelection, Post};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn images(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("image-{}.png", i));
            fs::write(&path, b"\x89PNG").unwrap();
            path
        })
        .collect()
}

fn sample_post(image_paths: Vec<PathBuf>) -> Post {
    Post::from_payload(
        PostPayload {
            post: "Big news #rust".to_string(),
            mastodon_mentions: Some("@alice@mastodon.social".to_string()),
            twitter_mentions: Some("@alice".to_string()),
            bluesky_mentions: Some("@alice.bsky.social".to_string()),
        },
        image_paths,
    )
}

#[tokio::test]
async fn test_upload_failure_on_one_platform_does_not_affect_others() {
    let dir = TempDir::new().unwrap();
    let post = sample_post(images(&dir, 2));

    let mastodon = MockConfig {
        name: "mastodon".to_string(),
        ..Default::default()
    };
    let twitter = MockConfig {
        name: "twitter".to_string(),
        upload_succeeds: false,
        upload_error: Some("media type unsupported".to_string()),
        ..Default::default()
    };
    let bluesky = MockConfig {
        name: "bluesky".to_string(),
        ..Default::default()
    };
    let configs = [mastodon.clone(), twitter.clone(), bluesky.clone()];

    let completed = Loaded::new(post, PlatformSelection::all())
        .run(|kind| {
            let config = match kind {
                PlatformKind::Mastodon => configs[0].clone(),
                PlatformKind::Twitter => configs[1].clone(),
                PlatformKind::Bluesky => configs[2].clone(),
            };
            Ok(Box::new(MockPlatform::new(config)) as Box<dyn Platform>)
        })
        .await;

    let results = completed.results();
    assert_eq!(results.len(), 3);
    assert!(results[0].ok);
    assert!(!results[1].ok);
    assert!(results[1]
        .error
        .as_deref()
        .unwrap()
        .contains("media type unsupported"));
    assert!(results[2].ok);

    // The failing platform stopped at its first upload and never posted
    assert_eq!(*twitter.upload_call_count.lock().unwrap(), 1);
    assert_eq!(*twitter.post_call_count.lock().unwrap(), 0);

    // The others each uploaded both images and posted their own variant
    assert_eq!(*mastodon.upload_call_count.lock().unwrap(), 2);
    assert_eq!(
        *mastodon.posted_content.lock().unwrap(),
        vec!["Big news #rust\n@alice@mastodon.social"]
    );
    assert_eq!(bluesky.posted_media.lock().unwrap()[0].len(), 2);
    assert_eq!(
        *bluesky.posted_content.lock().unwrap(),
        vec!["Big news #rust\n@alice.bsky.social"]
    );
}

#[tokio::test]
async fn test_every_platform_attempted_exactly_once_when_all_fail() {
    let mut calls = Vec::new();

    let completed = Loaded::new(Post::new("Hello"), PlatformSelection::all())
        .run(|kind| {
            calls.push(kind);
            Ok(Box::new(MockPlatform::post_failure(kind.as_str(), "server on fire"))
                as Box<dyn Platform>)
        })
        .await;

    assert_eq!(calls, PlatformKind::ALL.to_vec());
    assert_eq!(completed.failures().count(), 3);
    assert!(completed
        .results()
        .iter()
        .all(|r| r.error.as_deref().unwrap().contains("server on fire")));
}

#[tokio::test]
async fn test_bluesky_gives_up_after_three_rejected_passwords() {
    let api = MockAtprotoApi::new().with_login_failures(10);
    let attempts = api.login_attempts();
    let records = api.records();
    let secrets = SecretSequence::new(["one", "two", "three", "four"]);
    let prompts = secrets.prompts();

    let mut client = Some(BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    ));

    let completed = Loaded::new(Post::new("Hello"), PlatformSelection::from_flags(false, false, false, true))
        .run(|_| {
            client
                .take()
                .map(|c| Box::new(c) as Box<dyn Platform>)
                .ok_or_else(|| PlatformError::Authentication("already used".to_string()))
        })
        .await;

    let result = &completed.results()[0];
    assert_eq!(result.platform, "bluesky");
    assert!(!result.ok);
    assert!(result.error.as_deref().unwrap().contains("after 3 attempts"));

    assert_eq!(*attempts.lock().unwrap(), MAX_LOGIN_ATTEMPTS);
    assert_eq!(prompts.lock().unwrap().len(), MAX_LOGIN_ATTEMPTS);
    assert!(records.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bluesky_succeeds_on_second_attempt_after_two_prompts() {
    let api = MockAtprotoApi::new()
        .with_login_failures(1)
        .with_handle("alice.bsky.social", "did:plc:alice");
    let records = api.records();
    let secrets = SecretSequence::new(["typo", "correct"]);
    let prompts = secrets.prompts();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    );

    let post = sample_post(Vec::new());
    let result =
        libcrosspost::publish(&mut client, &post.text_for(PlatformKind::Bluesky), &[]).await;

    assert!(result.ok, "{:?}", result.error);
    assert!(result
        .post_id
        .as_deref()
        .unwrap()
        .starts_with("at://did:plc:mock/app.bsky.feed.post/"));
    assert_eq!(prompts.lock().unwrap().len(), 2);

    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["text"], "Big news #rust\n@alice.bsky.social");

    let facets = records[0]["facets"].as_array().unwrap();
    assert_eq!(facets.len(), 2);
    assert_eq!(facets[0]["features"][0]["tag"], "rust");
    assert_eq!(facets[1]["features"][0]["did"], "did:plc:alice");
}

#[tokio::test]
async fn test_bluesky_network_failure_does_not_prompt_again() {
    let api = MockAtprotoApi::new()
        .with_login_error(PlatformError::Network("PDS unreachable".to_string()));
    let attempts = api.login_attempts();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(StaticSecret::new("pw")),
    );

    let result = libcrosspost::publish(&mut client, "Hello", &[]).await;

    assert!(!result.ok);
    assert!(result.error.unwrap().contains("PDS unreachable"));
    assert_eq!(*attempts.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_bluesky_images_become_embed() {
    let dir = TempDir::new().unwrap();
    let api = MockAtprotoApi::new();
    let records = api.records();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(StaticSecret::new("pw")),
    );

    let result = libcrosspost::publish(&mut client, "Gallery", &images(&dir, 3)).await;
    assert!(result.ok, "{:?}", result.error);

    let records = records.lock().unwrap();
    let embed = &records[0]["embed"];
    assert_eq!(embed["$type"], "app.bsky.embed.images");
    assert_eq!(embed["images"].as_array().unwrap().len(), 3);
    assert_eq!(embed["images"][0]["image"]["mimeType"], "image/png");
    assert!(records[0].get("facets").is_none());
}

#[tokio::test]
async fn test_bluesky_empty_password_is_asked_again() {
    let api = MockAtprotoApi::new();
    let attempts = api.login_attempts();
    let secrets = SecretSequence::new(["", "right"]);
    let prompts = secrets.prompts();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    );

    client.authenticate().await.unwrap();

    assert_eq!(prompts.lock().unwrap().len(), 2);
    // The empty entry never reached the server
    assert_eq!(*attempts.lock().unwrap(), 1);
    assert!(client.session().is_some());
}

#[tokio::test]
async fn test_bluesky_only_empty_passwords_count_as_failed_attempts() {
    let api = MockAtprotoApi::new();
    let attempts = api.login_attempts();
    let secrets = SecretSequence::new(["", "", "", "never asked"]);
    let prompts = secrets.prompts();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    );

    let err = client.authenticate().await.unwrap_err();

    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(prompts.lock().unwrap().len(), MAX_LOGIN_ATTEMPTS);
    assert_eq!(*attempts.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_bluesky_overlong_post_rejected_before_password_prompt() {
    let api = MockAtprotoApi::new();
    let attempts = api.login_attempts();
    let secrets = SecretSequence::new(["pw"]);
    let prompts = secrets.prompts();

    let mut client = BlueskyClient::new(
        Box::new(api),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    );

    let result = libcrosspost::publish(&mut client, &"a".repeat(301), &[]).await;

    assert!(!result.ok);
    assert!(result.error.unwrap().contains("300 character limit"));
    assert!(prompts.lock().unwrap().is_empty());
    assert_eq!(*attempts.lock().unwrap(), 0);
}

#[tokio::test]
async fn test_bluesky_oversized_image_rejected_before_password_prompt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("huge.png");
    fs::write(&path, vec![0u8; 1_000_001]).unwrap();

    let secrets = SecretSequence::new(["pw"]);
    let prompts = secrets.prompts();

    let mut client = BlueskyClient::new(
        Box::new(MockAtprotoApi::new()),
        "me.bsky.social".to_string(),
        Box::new(secrets),
    );

    let result = libcrosspost::publish(&mut client, "Gallery", &[path]).await;

    assert!(!result.ok);
    assert!(prompts.lock().unwrap().is_empty());
}
