// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use picrelay::channel::{AssetKind, ChannelError, RecordingChannel};
use picrelay::forward::{ForwardConfig, ForwardController, OperatorConsole, OperatorId};
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::intake::{
    run_intake, BotApi, Chat, Document, IntakeConfig, Message, PhotoSize, Update,
    UpdateDispatcher, User,
};
use picrelay::publish::{PublishConfig, PublishPipeline};
use picrelay::sources::{CandidateSource, CandidateStub, PostLookup, SourceError};
use picrelay::store::MockStore;
use picrelay::transform::TransformConfig;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

const OPERATOR: i64 = 8040798522;
const STRANGER: i64 = 42;

/// Bot serving scripted getUpdates answers, then waiting forever
struct ScriptedBot {
    batches: Mutex<VecDeque<Result<Vec<Update>, ChannelError>>>,
    offsets: Mutex<Vec<i64>>,
    replies: Mutex<Vec<(i64, String, Option<i64>)>>,
    drained: Notify,
}

impl ScriptedBot {
    fn new(batches: Vec<Result<Vec<Update>, ChannelError>>) -> Arc<Self> {
        Arc::new(Self {
            batches: Mutex::new(batches.into()),
            offsets: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            drained: Notify::new(),
        })
    }

    fn offsets(&self) -> Vec<i64> {
        self.offsets.lock().unwrap().clone()
    }

    fn reply_texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text, _)| text.clone())
            .collect()
    }
}

#[async_trait]
impl BotApi for ScriptedBot {
    async fn get_updates(&self, offset: i64, _timeout_secs: u64) -> Result<Vec<Update>, ChannelError> {
        self.offsets.lock().unwrap().push(offset);
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                self.drained.notify_one();
                std::future::pending().await
            }
        }
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        self.replies
            .lock()
            .unwrap()
            .push((chat_id, text.to_string(), reply_to));
        Ok(())
    }
}

/// Link lookup knowing a fixed set of post ids
struct FakeLookup {
    known: Vec<u64>,
    lookups: AtomicUsize,
}

#[async_trait]
impl CandidateSource for FakeLookup {
    fn name(&self) -> &'static str {
        "yande"
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(60 * 60)
    }

    async fn discover(&self) -> Result<Vec<CandidateStub>, SourceError> {
        Ok(Vec::new())
    }

    async fn download(&self, _stub: &CandidateStub) -> Result<Bytes, SourceError> {
        Ok(png())
    }
}

#[async_trait]
impl PostLookup for FakeLookup {
    fn key_for(&self, post_id: u64) -> String {
        format!("yande_{}", post_id)
    }

    async fn lookup(&self, post_id: u64) -> Result<Option<CandidateStub>, SourceError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.known.contains(&post_id) {
            return Ok(None);
        }
        Ok(Some(CandidateStub {
            key: self.key_for(post_id),
            source_tag: "yande".to_string(),
            download_url: format!("https://files.yande.re/image/{}.png", post_id),
            width: 16,
            height: 16,
            caption: format!("Yande: {}\nSize: 16x16\nTags: #sky", post_id),
            tags: "sky".to_string(),
        }))
    }
}

fn png() -> Bytes {
    let img = RgbImage::from_pixel(16, 16, Rgb([9, 8, 7]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    Bytes::from(buf.into_inner())
}

struct Harness {
    store: MockStore,
    channel: RecordingChannel,
    lookup: Arc<FakeLookup>,
    dispatcher: Arc<UpdateDispatcher>,
}

fn harness() -> Harness {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let cache = Arc::new(HistoryCache::new(
        Arc::new(store.clone()),
        HistoryConfig::default(),
    ));
    let pipeline = Arc::new(PublishPipeline::new(
        cache.clone(),
        Arc::new(channel.clone()),
        TransformConfig::default(),
        PublishConfig {
            send_interval: Duration::ZERO,
            ..Default::default()
        },
    ));
    let forward = Arc::new(ForwardController::new(
        pipeline.clone(),
        ForwardConfig {
            operators: vec![OperatorId(OPERATOR)],
            ..Default::default()
        },
    ));
    let console = Arc::new(OperatorConsole::new(forward.clone(), cache));
    let lookup = Arc::new(FakeLookup {
        known: vec![9],
        lookups: AtomicUsize::new(0),
    });
    let links: Arc<dyn PostLookup> = lookup.clone();
    let dispatcher = Arc::new(UpdateDispatcher::new(
        console,
        forward,
        pipeline,
        Some(links),
        IntakeConfig::default(),
    ));
    Harness {
        store,
        channel,
        lookup,
        dispatcher,
    }
}

fn message(update_id: i64, from: i64) -> Message {
    Message {
        message_id: update_id * 100,
        from: Some(User { id: from }),
        chat: Chat { id: from },
        ..Default::default()
    }
}

fn text(update_id: i64, from: i64, text: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            text: Some(text.to_string()),
            ..message(update_id, from)
        }),
    }
}

fn photo(update_id: i64, from: i64, file_id: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            photo: vec![
                PhotoSize {
                    file_id: format!("{}-thumb", file_id),
                    width: 90,
                    height: 60,
                },
                PhotoSize {
                    file_id: file_id.to_string(),
                    width: 1280,
                    height: 853,
                },
            ],
            ..message(update_id, from)
        }),
    }
}

fn document(update_id: i64, from: i64, file_id: &str) -> Update {
    Update {
        update_id,
        message: Some(Message {
            document: Some(Document {
                file_id: file_id.to_string(),
                file_name: Some("page.png".to_string()),
                thumbnail: None,
            }),
            ..message(update_id, from)
        }),
    }
}

/// Run the intake over `batches` until they are used up
async fn drive(h: &Harness, batches: Vec<Result<Vec<Update>, ChannelError>>) -> (Arc<ScriptedBot>, i64) {
    let bot = ScriptedBot::new(batches);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(run_intake(
        bot.clone(),
        h.dispatcher.clone(),
        IntakeConfig::default(),
        cancel.clone(),
    ));

    bot.drained.notified().await;
    cancel.cancel();
    let offset = handle.await.unwrap();
    (bot, offset)
}

#[tokio::test]
async fn test_forward_session_over_updates() {
    let h = harness();
    let (bot, offset) = drive(
        &h,
        vec![
            Ok(vec![
                text(1, OPERATOR, "/forward_start Night city #neon"),
                photo(2, OPERATOR, "photo-large"),
            ]),
            Ok(vec![
                document(3, OPERATOR, "doc-1"),
                text(4, OPERATOR, "/forward_continue"),
                text(5, OPERATOR, "/forward_end"),
            ]),
        ],
    )
    .await;

    assert_eq!(
        bot.reply_texts(),
        vec![
            "Forward session manual_100 (Night city) started, send page 0",
            "Preview for page 0 staged, send the original as a file",
            "Page 0 staged, /forward_continue to publish it",
            "Published manual_100_p0, send page 1",
            "Forward session ended",
        ]
    );
    assert_eq!(bot.offsets(), vec![0, 3, 6]);
    assert_eq!(offset, 6);

    // Replies go back to the sender's chat, threaded on the message
    let replies = bot.replies.lock().unwrap().clone();
    assert_eq!(replies[0].0, OPERATOR);
    assert_eq!(replies[0].2, Some(100));

    let photos = h.channel.sent_of(AssetKind::Photo).await;
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].reused.as_ref().unwrap().as_str(), "photo-large");
    let documents = h.channel.sent_of(AssetKind::Document).await;
    assert_eq!(documents[0].reused.as_ref().unwrap().as_str(), "doc-1");

    let record = h.store.record("manual_100_p0").await.unwrap();
    assert_eq!((record.width, record.height), (1280, 853));
}

#[tokio::test]
async fn test_file_before_preview_is_refused() {
    let h = harness();
    let (bot, _) = drive(
        &h,
        vec![Ok(vec![
            text(1, OPERATOR, "/forward_start"),
            document(2, OPERATOR, "doc-1"),
            text(3, OPERATOR, "/forward_continue"),
        ])],
    )
    .await;

    let replies = bot.reply_texts();
    assert_eq!(replies[1], "Send the preview for page 0 as a photo first");
    assert_eq!(replies[2], "No preview staged for the current page");
    assert!(h.channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_stranger_updates_are_dropped() {
    let h = harness();
    let (bot, offset) = drive(
        &h,
        vec![Ok(vec![
            text(1, OPERATOR, "/forward_start Set"),
            photo(2, STRANGER, "intruder"),
            text(3, STRANGER, "https://yande.re/post/show/9"),
            text(4, STRANGER, "/forward_end"),
            text(5, STRANGER, "hello"),
        ])],
    )
    .await;

    assert_eq!(
        bot.reply_texts(),
        vec![
            "Forward session manual_100 (Set) started, send page 0",
            "Operator 42 is not allowed to forward",
        ]
    );
    assert_eq!(offset, 6);
    assert_eq!(h.lookup.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_post_link_publishes_once() {
    let h = harness();
    let (bot, _) = drive(
        &h,
        vec![
            Ok(vec![text(1, OPERATOR, "https://yande.re/post/show/9")]),
            Ok(vec![text(2, OPERATOR, "again https://yande.re/post/show/9")]),
            Ok(vec![text(3, OPERATOR, "https://yande.re/post/show/404")]),
        ],
    )
    .await;

    assert_eq!(
        bot.reply_texts(),
        vec![
            "Published yande_9",
            "yande_9 was already published",
            "yande_404 not found",
        ]
    );
    // The repeat is answered from the history without a lookup
    assert_eq!(h.lookup.lookups.load(Ordering::SeqCst), 2);
    assert!(h.store.record("yande_9").await.is_some());
    assert_eq!(h.channel.sent_of(AssetKind::Photo).await.len(), 1);
}

#[tokio::test]
async fn test_link_ignored_during_forward_session() {
    let h = harness();
    let (bot, _) = drive(
        &h,
        vec![Ok(vec![
            text(1, OPERATOR, "/forward_start"),
            text(2, OPERATOR, "https://yande.re/post/show/9"),
        ])],
    )
    .await;

    assert_eq!(bot.reply_texts().len(), 1);
    assert_eq!(h.lookup.lookups.load(Ordering::SeqCst), 0);
    assert!(h.store.record("yande_9").await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_retries_after_delay() {
    let h = harness();
    let started = tokio::time::Instant::now();
    let (bot, offset) = drive(
        &h,
        vec![
            Err(ChannelError::Network("connection reset".to_string())),
            Err(ChannelError::RateLimited {
                retry_after_secs: 30,
            }),
            Ok(vec![text(7, OPERATOR, "/forward_end")]),
        ],
    )
    .await;

    // Default retry delay, then the longer server-requested wait
    assert!(started.elapsed() >= Duration::from_secs(5 + 30));
    assert_eq!(bot.offsets(), vec![0, 0, 0, 8]);
    assert_eq!(offset, 8);
    assert_eq!(bot.reply_texts(), vec!["No forward session is active"]);
}

#[tokio::test]
async fn test_cancel_stops_idle_poll() {
    let h = harness();
    let (bot, offset) = drive(&h, Vec::new()).await;

    assert_eq!(offset, 0);
    assert_eq!(bot.offsets(), vec![0]);
    assert!(bot.reply_texts().is_empty());
}
