//! End-to-end: OneBot frames through the runtime, with a fake implementation
//! answering API calls on the other side of the channel.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use parley::core::Adapter;
use parley::prelude::*;
use parley_adapter_onebot::{OneBotAdapter, OneBotConfig};

type Sent = Arc<Mutex<Vec<Value>>>;

/// Answers every outbound request with a success reply. `get_msg` reports
/// the bot itself as the author of even message ids and user 99 otherwise.
fn spawn_peer(
    adapter: Arc<OneBotAdapter>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
) -> (Sent, JoinHandle<()>) {
    let sent: Sent = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&sent);
    let handle = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            let request: Value = serde_json::from_slice(&frame).unwrap();
            let data = match request["action"].as_str() {
                Some("get_msg") => {
                    let id = request["params"]["message_id"].as_i64().unwrap();
                    let author = if id % 2 == 0 { 10 } else { 99 };
                    json!({ "message_id": id, "sender": { "user_id": author } })
                }
                _ => json!({ "message_id": recorded.lock().len() + 1 }),
            };
            let reply = json!({
                "status": "ok",
                "retcode": 0,
                "data": data,
                "echo": request["echo"].clone(),
            });
            recorded.lock().push(request);
            assert!(adapter.on_message(reply.to_string().as_bytes()).is_none());
        }
    });
    (sent, handle)
}

fn private_message(user_id: i64, text: &str) -> Vec<u8> {
    json!({
        "post_type": "message",
        "time": 1700000000,
        "self_id": 10,
        "message_type": "private",
        "sub_type": "friend",
        "message_id": 1,
        "user_id": user_id,
        "message": text,
        "raw_message": text,
        "font": 0,
        "sender": { "user_id": user_id, "nickname": "alice" }
    })
    .to_string()
    .into_bytes()
}

fn group_message(user_id: i64, raw: &str) -> Vec<u8> {
    json!({
        "post_type": "message",
        "self_id": 10,
        "message_type": "group",
        "sub_type": "normal",
        "message_id": 2,
        "user_id": user_id,
        "group_id": 7,
        "raw_message": raw,
        "sender": { "user_id": user_id, "nickname": "bob" }
    })
    .to_string()
    .into_bytes()
}

#[tokio::test]
async fn test_got_prompt_and_answer_over_onebot() {
    let runtime = ParleyRuntime::from_config(ParleyConfig::default()).unwrap();
    runtime.register(
        on_command("greet")
            .got("name", "What's your name?")
            .handler(|conv: Conversation| async move {
                let name = conv.arg_text("name").unwrap_or_default();
                Outcome::finish(format!("Hello, {name}!"))
            }),
    );

    let (tx, rx) = mpsc::channel(16);
    let adapter = Arc::new(OneBotAdapter::connect("10", OneBotConfig::default(), tx).unwrap());
    let (sent, peer) = spawn_peer(Arc::clone(&adapter), rx);
    let bot = adapter.bot();

    for text in ["/greet", "Alice"] {
        let frame = private_message(42, text);
        assert!(runtime.receive(adapter.as_ref(), bot.clone(), &frame).await);
    }

    let messages: Vec<Value> = sent
        .lock()
        .iter()
        .map(|request| {
            assert_eq!(request["action"], "send_msg");
            assert_eq!(request["params"]["message_type"], "private");
            assert_eq!(request["params"]["user_id"], 42);
            request["params"]["message"].clone()
        })
        .collect();
    assert_eq!(
        messages,
        vec![json!("What's your name?"), json!("Hello, Alice!")]
    );
    assert_eq!(adapter.pending_calls(), 0);

    // Only the command matcher is left once the conversation finishes.
    assert_eq!(runtime.registry().len(), 1);

    peer.abort();
}

#[tokio::test]
async fn test_other_users_do_not_answer_someone_elses_prompt() {
    let runtime = ParleyRuntime::from_config(ParleyConfig::default()).unwrap();
    let answers = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&answers);
    runtime.register(
        on_command("greet")
            .got("name", "What's your name?")
            .handler(move |conv: Conversation| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().push(conv.arg_text("name").unwrap_or_default());
                }
            }),
    );

    let (tx, rx) = mpsc::channel(16);
    let adapter = Arc::new(OneBotAdapter::connect("10", OneBotConfig::default(), tx).unwrap());
    let (_sent, peer) = spawn_peer(Arc::clone(&adapter), rx);
    let bot = adapter.bot();

    let receive = |user_id: i64, text: &'static str| {
        let frame = private_message(user_id, text);
        let (runtime, adapter, bot) = (&runtime, Arc::clone(&adapter), bot.clone());
        async move { runtime.receive(adapter.as_ref(), bot, &frame).await }
    };
    assert!(receive(42, "/greet").await);
    assert!(!receive(7, "Mallory").await);
    assert!(receive(42, "Alice").await);

    assert_eq!(*answers.lock(), vec!["Alice".to_string()]);
    peer.abort();
}

#[tokio::test]
async fn test_reply_to_bot_message_addresses_the_bot() {
    let runtime = ParleyRuntime::from_config(ParleyConfig::default()).unwrap();
    let heard = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&heard);
    runtime.register(
        on_message()
            .rule(Rule::to_me())
            .handler(move |event: BoxedEvent| {
                let recorded = Arc::clone(&recorded);
                async move {
                    recorded.lock().push(event.plain_text());
                }
            }),
    );

    let (tx, rx) = mpsc::channel(16);
    let adapter = Arc::new(OneBotAdapter::connect("10", OneBotConfig::default(), tx).unwrap());
    let (sent, peer) = spawn_peer(Arc::clone(&adapter), rx);
    let bot = adapter.bot();

    // Message 4 is the bot's own, message 5 someone else's.
    let to_bot = group_message(42, "[CQ:reply,id=4][CQ:at,qq=10] nice one");
    let to_other = group_message(42, "[CQ:reply,id=5][CQ:at,qq=99] nice one");
    assert!(runtime.receive(adapter.as_ref(), bot.clone(), &to_bot).await);
    assert!(!runtime.receive(adapter.as_ref(), bot.clone(), &to_other).await);

    assert_eq!(*heard.lock(), vec!["nice one".to_string()]);
    let lookups: Vec<Value> = sent
        .lock()
        .iter()
        .map(|request| {
            assert_eq!(request["action"], "get_msg");
            request["params"]["message_id"].clone()
        })
        .collect();
    assert_eq!(lookups, vec![json!(4), json!(5)]);
    assert_eq!(adapter.pending_calls(), 0);

    peer.abort();
}
