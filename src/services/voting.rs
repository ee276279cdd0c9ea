use super::broadcast::{BroadcastActor, SubmissionsChanged};
use crate::{
    atomic_message_handler_with_span,
    db::{song::TrackId, user::UserId},
    managers::voting::{Outcome, SubmittedSongView, VoteQuota, VotingManager},
    span::SpanMessage,
};
use actix::prelude::*;
use actix_interop::with_ctx;
use color_eyre::eyre::Report;
use tracing::{debug, info};
use tracing_futures::Instrument;

// Messages

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Vec<SubmittedSongView>, Report>")]
pub struct SubmissionsFor(pub UserId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<VoteQuota, Report>")]
pub struct VoteQuotaFor(pub UserId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Outcome, Report>")]
pub struct SubmitSong {
    pub user_id: UserId,
    pub track_id: TrackId,
    pub track_name: String,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Outcome, Report>")]
pub struct CastVote(pub UserId, pub TrackId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Outcome, Report>")]
pub struct RetractVote(pub UserId, pub TrackId);

// Actor

pub struct VotingActor {
    manager: VotingManager,
    broadcast: Addr<BroadcastActor>,
}

impl VotingActor {
    pub fn new(manager: VotingManager, broadcast: Addr<BroadcastActor>) -> Self {
        Self { manager, broadcast }
    }
}

impl Actor for VotingActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(
            max_votes_per_user = self.manager.max_votes_per_user(),
            "Voting actor started"
        );
    }
}

fn manager() -> VotingManager {
    with_ctx(|a: &mut VotingActor, _| a.manager.clone())
}

fn notify_if_changed(outcome: &Outcome) {
    if outcome.changed {
        debug!("Submissions changed, notifying subscribers");
        with_ctx(|a: &mut VotingActor, _| a.broadcast.do_send(SubmissionsChanged));
    }
}

// Reads run on the runtime rather than inside the actor so that they keep
// making progress while a mutation holds the actor.
impl Handler<SpanMessage<SubmissionsFor>> for VotingActor {
    type Result = ResponseFuture<Result<Vec<SubmittedSongView>, Report>>;

    fn handle(&mut self, msg: SpanMessage<SubmissionsFor>, _ctx: &mut Context<Self>) -> Self::Result {
        let SpanMessage {
            msg: SubmissionsFor(user_id),
            span,
        } = msg;
        let manager = self.manager.clone();
        Box::pin(async move { manager.submissions(&user_id).await }.instrument(span))
    }
}

impl Handler<SpanMessage<VoteQuotaFor>> for VotingActor {
    type Result = ResponseFuture<Result<VoteQuota, Report>>;

    fn handle(&mut self, msg: SpanMessage<VoteQuotaFor>, _ctx: &mut Context<Self>) -> Self::Result {
        let SpanMessage {
            msg: VoteQuotaFor(user_id),
            span,
        } = msg;
        let manager = self.manager.clone();
        Box::pin(async move { manager.quota(&user_id).await }.instrument(span))
    }
}

atomic_message_handler_with_span! {
    impl AsyncSpanHandler<SubmitSong> for VotingActor {
        async fn handle(msg: SubmitSong) -> Result<Outcome, Report> {
            debug!("VotingActor handling SubmitSong");
            let outcome = manager()
                .submit(&msg.user_id, &msg.track_id, &msg.track_name)
                .await?;
            notify_if_changed(&outcome);
            Ok(outcome)
        }
    }
}

atomic_message_handler_with_span! {
    impl AsyncSpanHandler<CastVote> for VotingActor {
        async fn handle(msg: CastVote) -> Result<Outcome, Report> {
            debug!("VotingActor handling CastVote");
            let CastVote(user_id, track_id) = msg;
            let outcome = manager().vote(&user_id, &track_id).await?;
            notify_if_changed(&outcome);
            Ok(outcome)
        }
    }
}

atomic_message_handler_with_span! {
    impl AsyncSpanHandler<RetractVote> for VotingActor {
        async fn handle(msg: RetractVote) -> Result<Outcome, Report> {
            debug!("VotingActor handling RetractVote");
            let RetractVote(user_id, track_id) = msg;
            let outcome = manager().unvote(&user_id, &track_id).await?;
            notify_if_changed(&outcome);
            Ok(outcome)
        }
    }
}
