use cinder_shared::clients::rabbitmq::RabbitMQClient;
use cinder_shared::types::event::{payloads, routing_keys, Event};

const SOURCE: &str = "cinder-api";

pub async fn publish_profile_created(rabbitmq: &RabbitMQClient, user_id: &str, display_name: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PROFILE_CREATED,
        payloads::ProfileCreated {
            user_id: user_id.to_string(),
            display_name: display_name.to_string(),
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PROFILE_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish profile.created event");
    }
}

pub async fn publish_profile_updated(rabbitmq: &RabbitMQClient, user_id: &str) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_PROFILE_UPDATED,
        payloads::ProfileUpdated {
            user_id: user_id.to_string(),
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_PROFILE_UPDATED, &event).await {
        tracing::error!(error = %e, "failed to publish profile.updated event");
    }
}

pub async fn publish_matchmaker_verified(
    rabbitmq: &RabbitMQClient,
    user_id: &str,
    organization: Option<&str>,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::USER_MATCHMAKER_VERIFIED,
        payloads::MatchmakerVerified {
            user_id: user_id.to_string(),
            organization: organization.map(str::to_string),
        },
    )
    .with_user(user_id);

    if let Err(e) = rabbitmq.publish(routing_keys::USER_MATCHMAKER_VERIFIED, &event).await {
        tracing::error!(error = %e, "failed to publish matchmaker.verified event");
    }
}

pub async fn publish_like_sent(
    rabbitmq: &RabbitMQClient,
    actor_id: &str,
    target_id: &str,
    matched: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCH_LIKE_SENT,
        payloads::LikeSent {
            actor_id: actor_id.to_string(),
            target_id: target_id.to_string(),
            matched,
        },
    )
    .with_user(actor_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MATCH_LIKE_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish like.sent event");
    }
}

pub async fn publish_match_created(
    rabbitmq: &RabbitMQClient,
    match_id: &str,
    user_a: &str,
    user_b: &str,
    arranged: bool,
) {
    let event = Event::new(
        SOURCE,
        routing_keys::MATCH_CREATED,
        payloads::MatchCreated {
            match_id: match_id.to_string(),
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            arranged,
        },
    );

    if let Err(e) = rabbitmq.publish(routing_keys::MATCH_CREATED, &event).await {
        tracing::error!(error = %e, "failed to publish match.created event");
    }
}

pub async fn publish_message_sent(
    rabbitmq: &RabbitMQClient,
    message_id: &str,
    match_id: &str,
    sender_id: &str,
    body: &str,
) {
    let preview: String = body.chars().take(80).collect();
    let event = Event::new(
        SOURCE,
        routing_keys::MESSAGING_MESSAGE_SENT,
        payloads::MessageSent {
            message_id: message_id.to_string(),
            match_id: match_id.to_string(),
            sender_id: sender_id.to_string(),
            content_preview: preview,
        },
    )
    .with_user(sender_id);

    if let Err(e) = rabbitmq.publish(routing_keys::MESSAGING_MESSAGE_SENT, &event).await {
        tracing::error!(error = %e, "failed to publish message.sent event");
    }
}
