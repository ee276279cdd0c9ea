mod integration_db;

use actix_codec::{AsyncRead, AsyncWrite, Framed};
use actix_web::App;
use actix_http::ws;
use breadcharts_server::{
    config::VotingConfig,
    db::user::UserId,
    managers::voting::VoteQuota,
    server,
    websocket::{
        IncomingLogin, IncomingMessage, IncomingSubmit, IncomingVote, OutgoingMessage,
        OutgoingOutcome, OutgoingSubmissions,
    },
};
use futures::{SinkExt, StreamExt};
use insta::assert_json_snapshot;
use integration_db::{track, user, IntegrationTestDb};
use std::time::Duration;
use tokio::time::timeout;

const READ_TIMEOUT_MS: u64 = 300;

macro_rules! frame_message_type {
    ($framed:expr, $message_type:path) => {
        match read_message(&mut $framed)
            .await
            .expect("Unable to read ws frame")
        {
            $message_type(message_type) => message_type,
            _ => panic!("Wrong outgoing message type"),
        }
    };
}

async fn read_message(
    framed: &mut Framed<impl AsyncRead + AsyncWrite + Unpin, ws::Codec>,
) -> Option<OutgoingMessage> {
    let frame = timeout(Duration::from_millis(READ_TIMEOUT_MS), framed.next())
        .await
        .ok()??;
    match frame.unwrap() {
        ws::Frame::Text(item) => Some(serde_json::from_slice(&item[..]).unwrap()),
        _ => None,
    }
}

async fn read_messages(
    framed: &mut Framed<impl AsyncRead + AsyncWrite + Unpin, ws::Codec>,
) -> Vec<OutgoingMessage> {
    let mut messages = vec![];
    while let Some(message) = read_message(framed).await {
        messages.push(message);
    }
    messages
}

async fn send_message(
    framed: &mut Framed<impl AsyncRead + AsyncWrite + Unpin, ws::Codec>,
    message: IncomingMessage,
) {
    let message = serde_json::to_string(&message).unwrap();
    framed.send(ws::Message::Text(message.into())).await.unwrap();
}

fn latest_submissions(messages: &[OutgoingMessage]) -> Option<&OutgoingSubmissions> {
    messages.iter().rev().find_map(|message| match message {
        OutgoingMessage::Submissions(submissions) => Some(submissions),
        _ => None,
    })
}

fn latest_quota(messages: &[OutgoingMessage]) -> Option<&VoteQuota> {
    messages.iter().rev().find_map(|message| match message {
        OutgoingMessage::Quota(quota) => Some(quota),
        _ => None,
    })
}

fn outcomes(messages: &[OutgoingMessage]) -> Vec<&OutgoingOutcome> {
    messages
        .iter()
        .filter_map(|message| match message {
            OutgoingMessage::Outcome(outcome) => Some(outcome),
            _ => None,
        })
        .collect()
}

fn start_server(test_db: &IntegrationTestDb) -> actix_test::TestServer {
    let actors = server::start_system_actors(test_db.pool(), VotingConfig::default());
    actix_test::start(move || {
        let actors = actors.clone();
        App::new().configure(move |cfg| server::configure(cfg, actors))
    })
}

fn login(user_id: &str) -> IncomingMessage {
    IncomingMessage::Login(IncomingLogin {
        user_id: UserId::from(user_id),
    })
}

#[actix_rt::test]
async fn test_connect() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut framed = srv.ws_at("/ws/").await.unwrap();

    let client = frame_message_type!(framed, OutgoingMessage::Client);
    assert_eq!(client.user_id, None);
}

#[actix_rt::test]
async fn test_login_user() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut framed = srv.ws_at("/ws/").await.unwrap();
    frame_message_type!(framed, OutgoingMessage::Client);

    send_message(&mut framed, login("alice")).await;
    let messages = read_messages(&mut framed).await;

    let client = messages
        .iter()
        .find_map(|message| match message {
            OutgoingMessage::Client(client) => Some(client),
            _ => None,
        })
        .expect("Client details should be sent after login");
    assert_json_snapshot!(client, { ".id" => "[uuid]" }, @r###"
    {
      "id": "[uuid]",
      "user_id": "alice"
    }
    "###);
    assert!(latest_submissions(&messages).unwrap().songs.is_empty());
    assert_eq!(
        latest_quota(&messages),
        Some(&VoteQuota { used: 0, max: 10 })
    );
}

#[actix_rt::test]
async fn test_submit_and_vote() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut framed = srv.ws_at("/ws/").await.unwrap();
    send_message(&mut framed, login("alice")).await;
    read_messages(&mut framed).await;

    send_message(
        &mut framed,
        IncomingMessage::Submit(IncomingSubmit {
            track_id: track("t1"),
            track_name: "Song One".to_owned(),
        }),
    )
    .await;
    let messages = read_messages(&mut framed).await;
    assert_eq!(
        outcomes(&messages),
        vec![&OutgoingOutcome {
            ok: true,
            message: "Song submitted and your vote has been added.".to_owned(),
        }]
    );
    assert_eq!(latest_quota(&messages).unwrap().used, 1);
    let songs = &latest_submissions(&messages).unwrap().songs;
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].vote_count, 1);
    assert!(songs[0].has_voted);

    send_message(
        &mut framed,
        IncomingMessage::Unvote(IncomingVote {
            track_id: track("t1"),
        }),
    )
    .await;
    let messages = read_messages(&mut framed).await;
    assert_eq!(
        outcomes(&messages)[0].message,
        "Unvoted and removed submission (no remaining votes)"
    );
    assert!(latest_submissions(&messages).unwrap().songs.is_empty());
    assert_eq!(latest_quota(&messages).unwrap().used, 0);
}

#[actix_rt::test]
async fn test_change_is_pushed_to_other_clients() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut alice = srv.ws_at("/ws/").await.unwrap();
    let mut bob = srv.ws_at("/ws/").await.unwrap();
    send_message(&mut alice, login("alice")).await;
    send_message(&mut bob, login("bob")).await;
    read_messages(&mut alice).await;
    read_messages(&mut bob).await;

    send_message(
        &mut alice,
        IncomingMessage::Submit(IncomingSubmit {
            track_id: track("t1"),
            track_name: "Song One".to_owned(),
        }),
    )
    .await;
    read_messages(&mut alice).await;

    let messages = read_messages(&mut bob).await;
    assert!(outcomes(&messages).is_empty());
    let songs = &latest_submissions(&messages)
        .expect("Bob should receive refreshed submissions")
        .songs;
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].vote_count, 1);
    assert!(!songs[0].has_voted);
    assert_eq!(songs[0].submitted_by_user_id, user("alice"));
}

#[actix_rt::test]
async fn test_anonymous_vote_is_rejected() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut framed = srv.ws_at("/ws/").await.unwrap();
    frame_message_type!(framed, OutgoingMessage::Client);

    send_message(
        &mut framed,
        IncomingMessage::Vote(IncomingVote {
            track_id: track("t1"),
        }),
    )
    .await;
    let messages = read_messages(&mut framed).await;
    assert_eq!(
        outcomes(&messages),
        vec![&OutgoingOutcome {
            ok: false,
            message: "Not authenticated".to_owned(),
        }]
    );
}

#[actix_rt::test]
async fn test_malformed_message_is_ignored() {
    let test_db = IntegrationTestDb::new().await;
    let mut srv = start_server(&test_db);
    let mut framed = srv.ws_at("/ws/").await.unwrap();
    frame_message_type!(framed, OutgoingMessage::Client);

    framed
        .send(ws::Message::Text("definitely not json".into()))
        .await
        .unwrap();
    send_message(&mut framed, IncomingMessage::Submissions).await;

    let submissions = frame_message_type!(framed, OutgoingMessage::Submissions);
    assert!(submissions.songs.is_empty());

    // Close connection
    framed
        .send(ws::Message::Close(Some(ws::CloseCode::Normal.into())))
        .await
        .unwrap();

    let item = timeout(Duration::from_millis(READ_TIMEOUT_MS), framed.next())
        .await
        .expect("timeout")
        .unwrap()
        .unwrap();
    assert_eq!(item, ws::Frame::Close(Some(ws::CloseCode::Normal.into())));
}
