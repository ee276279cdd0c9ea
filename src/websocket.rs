use crate::db::{song::TrackId, user::UserId};
use crate::managers::voting::{Outcome, SubmittedSongView, VoteQuota};
use crate::services::broadcast::{BroadcastActor, SubmissionsChanged, Subscribe, Unsubscribe};
use crate::services::voting::{
    CastVote, RetractVote, SubmissionsFor, SubmitSong, VoteQuotaFor, VotingActor,
};
use crate::span::SpanMessage;
use actix::prelude::*;
use actix_web_actors::ws;
use color_eyre::eyre::Report;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct IncomingLogin {
    pub user_id: UserId,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IncomingSubmit {
    pub track_id: TrackId,
    pub track_name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct IncomingVote {
    pub track_id: TrackId,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    #[serde(rename = "login")]
    Login(IncomingLogin),
    #[serde(rename = "submissions")]
    Submissions,
    #[serde(rename = "submit")]
    Submit(IncomingSubmit),
    #[serde(rename = "vote")]
    Vote(IncomingVote),
    #[serde(rename = "unvote")]
    Unvote(IncomingVote),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutgoingClient {
    pub id: Uuid,
    pub user_id: Option<UserId>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutgoingSubmissions {
    pub songs: Vec<SubmittedSongView>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OutgoingOutcome {
    pub ok: bool,
    pub message: String,
}

impl From<Outcome> for OutgoingOutcome {
    fn from(outcome: Outcome) -> Self {
        Self {
            ok: outcome.ok,
            message: outcome.message,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    #[serde(rename = "client")]
    Client(OutgoingClient),
    #[serde(rename = "submissions")]
    Submissions(OutgoingSubmissions),
    #[serde(rename = "quota")]
    Quota(VoteQuota),
    #[serde(rename = "outcome")]
    Outcome(OutgoingOutcome),
}

pub struct WsClient {
    id: Uuid,
    user_id: Option<UserId>,
    voting: Addr<VotingActor>,
    broadcast: Addr<BroadcastActor>,
}

impl WsClient {
    pub fn new(voting: Addr<VotingActor>, broadcast: Addr<BroadcastActor>) -> WsClient {
        WsClient {
            id: Uuid::new_v4(),
            user_id: None,
            voting,
            broadcast,
        }
    }

    fn current_user(&self) -> UserId {
        self.user_id.clone().unwrap_or_else(UserId::anonymous)
    }

    fn send_json<T: Serialize>(&self, ctx: &mut ws::WebsocketContext<Self>, value: &T) {
        match serde_json::to_string(value) {
            Ok(json) => ctx.text(json),
            Err(err) => error!("Failed to convert to JSON {error}", error = err.to_string()),
        }
    }

    fn send_client(&self, ctx: &mut ws::WebsocketContext<Self>) {
        self.send_json(
            ctx,
            &OutgoingMessage::Client(OutgoingClient {
                id: self.id,
                user_id: self.user_id.clone(),
            }),
        )
    }

    fn send_submissions(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let request = self
            .voting
            .send(SpanMessage::new(SubmissionsFor(self.current_user())));
        ctx.spawn(request.into_actor(self).map(|res, act, ctx| match res {
            Ok(Ok(songs)) => act.send_json(
                ctx,
                &OutgoingMessage::Submissions(OutgoingSubmissions { songs }),
            ),
            Ok(Err(report)) => error!("Failed to retrieve submissions: {:?}", report),
            Err(err) => error!("Voting actor did not answer: {}", err),
        }));
    }

    fn send_quota(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let request = self
            .voting
            .send(SpanMessage::new(VoteQuotaFor(self.current_user())));
        ctx.spawn(request.into_actor(self).map(|res, act, ctx| match res {
            Ok(Ok(quota)) => act.send_json(ctx, &OutgoingMessage::Quota(quota)),
            Ok(Err(report)) => error!("Failed to retrieve vote quota: {:?}", report),
            Err(err) => error!("Voting actor did not answer: {}", err),
        }));
    }

    /// Relays the outcome of a voting operation, followed by the caller's quota.
    fn send_outcome<F>(&self, ctx: &mut ws::WebsocketContext<Self>, request: F)
    where
        F: Future<Output = Result<Result<Outcome, Report>, MailboxError>> + 'static,
    {
        ctx.spawn(request.into_actor(self).map(|res, act, ctx| {
            match res {
                Ok(Ok(outcome)) => {
                    act.send_json(ctx, &OutgoingMessage::Outcome(outcome.into()));
                }
                Ok(Err(report)) => error!("Voting operation failed: {:?}", report),
                Err(err) => error!("Voting actor did not answer: {}", err),
            }
            act.send_quota(ctx);
        }));
    }

    fn handle_incoming(&mut self, message: IncomingMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let span = info_span!("ws_message", client = %self.id);
        let _enter = span.enter();
        match message {
            IncomingMessage::Login(login) => {
                debug!("Incoming login {}", login.user_id.as_str());
                self.user_id = Some(login.user_id).filter(|user_id| !user_id.is_blank());
                self.send_client(ctx);
                self.send_submissions(ctx);
                self.send_quota(ctx);
            }
            IncomingMessage::Submissions => {
                debug!("Incoming submissions request");
                self.send_submissions(ctx);
            }
            IncomingMessage::Submit(submit) => {
                debug!("Incoming submit {}", submit.track_id.as_str());
                let request = self.voting.send(SpanMessage::new(SubmitSong {
                    user_id: self.current_user(),
                    track_id: submit.track_id,
                    track_name: submit.track_name,
                }));
                self.send_outcome(ctx, request);
            }
            IncomingMessage::Vote(vote) => {
                debug!("Incoming vote {}", vote.track_id.as_str());
                let request = self
                    .voting
                    .send(SpanMessage::new(CastVote(self.current_user(), vote.track_id)));
                self.send_outcome(ctx, request);
            }
            IncomingMessage::Unvote(vote) => {
                debug!("Incoming unvote {}", vote.track_id.as_str());
                let request = self
                    .voting
                    .send(SpanMessage::new(RetractVote(self.current_user(), vote.track_id)));
                self.send_outcome(ctx, request);
            }
        }
    }
}

impl Actor for WsClient {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(client = %self.id, "New ws client");
        self.broadcast.do_send(Subscribe {
            id: self.id,
            recipient: ctx.address().recipient(),
        });
        self.send_client(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        info!(client = %self.id, "Ws client left");
        self.broadcast.do_send(Unsubscribe(self.id));
    }
}

// Incoming messages from ws
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsClient {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => match serde_json::from_str::<IncomingMessage>(&text) {
                Ok(message) => self.handle_incoming(message, ctx),
                Err(err) => warn!(client = %self.id, "Ignoring malformed message: {}", err),
            },
            Ok(ws::Message::Ping(bytes)) => ctx.pong(&bytes),
            Ok(ws::Message::Pong(_)) => {}
            Ok(ws::Message::Close(reason)) => {
                debug!("Got close message from WS. Reason: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Ok(message) => {
                warn!("Client sent something else than text: {:?}", message);
            }
            Err(err) => {
                error!("ProtocolError in StreamHandler {:?}", err);
            }
        }
    }
}

impl Handler<SubmissionsChanged> for WsClient {
    type Result = ();

    fn handle(&mut self, _msg: SubmissionsChanged, ctx: &mut Self::Context) {
        debug!(client = %self.id, "Refreshing submissions after change");
        self.send_submissions(ctx);
    }
}
