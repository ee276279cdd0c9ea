use actix::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Fired after every operation that persisted a change to the poll.
/// Carries nothing; subscribers re-query what they show.
#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "()")]
pub struct SubmissionsChanged;

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub id: Uuid,
    pub recipient: Recipient<SubmissionsChanged>,
}

#[derive(Message, Clone, Copy, Debug)]
#[rtype(result = "()")]
pub struct Unsubscribe(pub Uuid);

// Actor
#[derive(Default)]
pub struct BroadcastActor {
    subscribers: HashMap<Uuid, Recipient<SubmissionsChanged>>,
}

impl BroadcastActor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for BroadcastActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!("Broadcast actor started");
    }
}

impl Handler<Subscribe> for BroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _ctx: &mut Context<Self>) -> Self::Result {
        debug!(subscriber = %msg.id, "Adding subscriber to broadcast");
        self.subscribers.insert(msg.id, msg.recipient);
    }
}

impl Handler<Unsubscribe> for BroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _ctx: &mut Context<Self>) -> Self::Result {
        debug!(subscriber = %msg.0, "Removing subscriber from broadcast");
        self.subscribers.remove(&msg.0);
    }
}

impl Handler<SubmissionsChanged> for BroadcastActor {
    type Result = ();

    fn handle(&mut self, msg: SubmissionsChanged, _ctx: &mut Context<Self>) -> Self::Result {
        debug!(
            "Broadcasting SubmissionsChanged to subscribers. Number of subscribers: {subscribers}",
            subscribers = self.subscribers.len()
        );
        // Subscribers that went away without unsubscribing are dropped here
        self.subscribers
            .retain(|id, recipient| match recipient.try_send(msg) {
                Ok(()) => true,
                Err(SendError::Full(msg)) => {
                    recipient.do_send(msg);
                    true
                }
                Err(SendError::Closed(_)) => {
                    debug!(subscriber = %id, "Dropping closed subscriber");
                    false
                }
            });
    }
}
