//! Conversation gateway: authenticated live connections, room membership and
//! event fan-out.
//!
//! The gateway is transport-agnostic. A transport calls [`Gateway::connect`]
//! once per socket, feeds every inbound text frame to [`Gateway::dispatch`]
//! in arrival order, writes every frame that arrives on the returned receiver
//! to the socket, and calls [`Gateway::disconnect`] when the socket closes.

use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::message_types::{
    ClientEvent, ErrorNotice, MessageReadPayload, NewMessagePayload, ReadReceipt, ServerEvent,
    TypingNotice, TypingUser,
};
use super::{ConnectionId, ConnectionRegistry};
use crate::error::{GatewayError, IdentityError, StoreError};
use crate::metrics;
use crate::models::{ConversationKey, MessageView, NewMessage, UserProfile};
use crate::services::directory::ProfileLookup;
use crate::services::identity::IdentityVerifier;
use crate::services::message_store::MessageStore;
use crate::services::notifier::{NotificationEvent, Notifier};

const ACCESS_DENIED: &str = "Access denied to conversation";
const JOIN_FAILED: &str = "Failed to join conversation";
const SEND_FAILED: &str = "Failed to send message";
const RECIPIENT_NOT_FOUND: &str = "Recipient not found";

/// An authenticated live connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    user: UserProfile,
    sender: UnboundedSender<String>,
}

impl Connection {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    fn send_event(&self, event: &ServerEvent) {
        match event.to_frame() {
            Ok(frame) => {
                if self.sender.send(frame).is_err() {
                    debug!(connection_id = %self.id, "connection closed before frame was sent");
                }
            }
            Err(e) => error!(error = %e, event = event.event_name(), "failed to encode frame"),
        }
    }
}

#[derive(Clone)]
pub struct Gateway {
    store: MessageStore,
    identity: Arc<dyn IdentityVerifier>,
    profiles: Arc<dyn ProfileLookup>,
    notifier: Arc<dyn Notifier>,
    registry: ConnectionRegistry,
}

impl Gateway {
    pub fn new(
        store: MessageStore,
        identity: Arc<dyn IdentityVerifier>,
        profiles: Arc<dyn ProfileLookup>,
        notifier: Arc<dyn Notifier>,
        registry: ConnectionRegistry,
    ) -> Self {
        Self {
            store,
            identity,
            profiles,
            notifier,
            registry,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Authenticate a new connection. Nothing is registered on failure.
    pub async fn connect(
        &self,
        credential: Option<&str>,
    ) -> Result<(Connection, UnboundedReceiver<String>), GatewayError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::AuthenticationFailed("Authentication required".into()))?;

        let user_id = self.identity.verify(token).await.map_err(|e| {
            match &e {
                IdentityError::Invalid(reason) => debug!(%reason, "connection credential rejected"),
                IdentityError::Unavailable(reason) => {
                    error!(%reason, "identity verification unavailable")
                }
            }
            GatewayError::AuthenticationFailed("Invalid credential".into())
        })?;

        let user = match self.profiles.display_fields(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(%user_id, "credential for unknown user");
                return Err(GatewayError::AuthenticationFailed("User not found".into()));
            }
            Err(e) => {
                error!(%user_id, error = %e, "profile lookup failed during connect");
                return Err(GatewayError::Persistence("Failed to authenticate connection".into()));
            }
        };

        let (sender, receiver) = unbounded_channel();
        let connection = Connection {
            id: ConnectionId::new(),
            user,
            sender,
        };
        metrics::connection_opened();
        info!(
            connection_id = %connection.id,
            user_id = %connection.user_id(),
            "live connection authenticated"
        );
        Ok((connection, receiver))
    }

    /// Decode and handle one inbound frame. Failures become an `error` frame
    /// on this connection only; the connection keeps serving.
    pub async fn dispatch(&self, connection: &Connection, frame: &str) {
        let result = match serde_json::from_str::<ClientEvent>(frame) {
            Ok(event) => self.handle(connection, event).await,
            Err(e) => {
                debug!(connection_id = %connection.id, error = %e, "malformed event payload");
                Err(GatewayError::Validation("Invalid event payload".into()))
            }
        };

        if let Err(err) = result {
            metrics::record_gateway_error(err.code());
            connection.send_event(&ServerEvent::Error(ErrorNotice::from(&err)));
        }
    }

    pub async fn handle(&self, connection: &Connection, event: ClientEvent) -> Result<(), GatewayError> {
        match event {
            ClientEvent::JoinConversation(join) => {
                self.join_conversation(connection, join.conversation_id()).await
            }
            ClientEvent::NewMessage(payload) => self.new_message(connection, payload).await,
            ClientEvent::Typing(r) => self.typing(connection, &r.conversation_id, true).await,
            ClientEvent::StopTyping(r) => self.typing(connection, &r.conversation_id, false).await,
            ClientEvent::MessageRead(payload) => self.message_read(connection, payload).await,
        }
    }

    async fn join_conversation(
        &self,
        connection: &Connection,
        conversation_id: &str,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();
        let allowed = self
            .store
            .is_participant(conversation_id, user_id)
            .await
            .map_err(|e| {
                error!(%user_id, %conversation_id, error = %e, "participant check failed");
                GatewayError::Persistence(JOIN_FAILED.into())
            })?;
        if !allowed {
            warn!(%user_id, %conversation_id, "join refused: not a participant");
            return Err(GatewayError::AuthorizationDenied(ACCESS_DENIED.into()));
        }

        self.registry
            .join(conversation_id, connection.id, user_id, connection.sender.clone())
            .await;
        Ok(())
    }

    async fn new_message(
        &self,
        connection: &Connection,
        payload: NewMessagePayload,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();
        let key = ConversationKey::parse(&payload.conversation_id)
            .ok_or_else(|| GatewayError::Validation("Invalid conversation id".into()))?;
        let receiver_id = key
            .other_participant(user_id)
            .ok_or_else(|| GatewayError::AuthorizationDenied(ACCESS_DENIED.into()))?;
        if key.listing_id() != payload.listing_id {
            return Err(GatewayError::Validation(
                "listingId does not match conversation".into(),
            ));
        }

        let view = self
            .store
            .create(NewMessage {
                sender_id: user_id,
                receiver_id,
                listing_id: payload.listing_id,
                content: payload.content,
                conversation_id: Some(payload.conversation_id),
            })
            .await
            .map_err(|e| match e {
                StoreError::Validation(msg) => GatewayError::Validation(msg),
                StoreError::UserNotFound(_) => {
                    GatewayError::NotFound(RECIPIENT_NOT_FOUND.into())
                }
                StoreError::Persistence(reason) => {
                    error!(%user_id, %reason, "message persistence failed");
                    GatewayError::Persistence(SEND_FAILED.into())
                }
            })?;

        self.publish_new_message(&view).await;
        Ok(())
    }

    /// Fan a persisted message out to its room and notify the recipient if
    /// they are not watching it. Returns how many connections got the frame.
    pub async fn publish_new_message(&self, view: &MessageView) -> usize {
        let conversation_id = view.message.conversation_id.as_str();
        let event = ServerEvent::NewMessage(view.clone());
        let delivered = match event.to_frame() {
            Ok(frame) => self.registry.broadcast(conversation_id, &frame, None).await,
            Err(e) => {
                error!(error = %e, "failed to encode new_message frame");
                0
            }
        };
        metrics::record_broadcast(event.event_name(), delivered);

        let recipient = view.message.receiver_id;
        if !self.registry.has_user(conversation_id, recipient).await {
            let notifier = Arc::clone(&self.notifier);
            let notification = NotificationEvent::new_message(view);
            tokio::spawn(async move {
                notifier.notify(recipient, notification).await;
            });
        }

        debug!(
            %conversation_id,
            message_id = %view.message.id,
            delivered,
            "new_message published"
        );
        delivered
    }

    async fn typing(
        &self,
        connection: &Connection,
        conversation_id: &str,
        started: bool,
    ) -> Result<(), GatewayError> {
        self.require_joined(connection, conversation_id).await?;

        let notice = TypingNotice {
            user_id: connection.user_id(),
            conversation_id: conversation_id.to_string(),
            user: TypingUser::from(connection.user()),
        };
        let event = if started {
            ServerEvent::Typing(notice)
        } else {
            ServerEvent::StopTyping(notice)
        };
        self.broadcast_to_others(connection, conversation_id, &event).await;
        Ok(())
    }

    /// Relay a read receipt to the rest of the room. Persisting read state is
    /// the REST `mark-read` call's job.
    async fn message_read(
        &self,
        connection: &Connection,
        payload: MessageReadPayload,
    ) -> Result<(), GatewayError> {
        self.require_joined(connection, &payload.conversation_id).await?;
        if payload.message_ids.is_empty() {
            return Err(GatewayError::Validation("messageIds must not be empty".into()));
        }

        let event = ServerEvent::MessageRead(ReadReceipt {
            message_ids: payload.message_ids,
            read_by: connection.user_id(),
            conversation_id: payload.conversation_id.clone(),
        });
        self.broadcast_to_others(connection, &payload.conversation_id, &event).await;
        Ok(())
    }

    /// Drop every room membership of the connection.
    pub async fn disconnect(&self, connection: &Connection) {
        let rooms = self.registry.remove_connection(connection.id).await;
        metrics::connection_closed();
        info!(
            connection_id = %connection.id,
            user_id = %connection.user_id(),
            rooms,
            "live connection closed"
        );
    }

    async fn require_joined(
        &self,
        connection: &Connection,
        conversation_id: &str,
    ) -> Result<(), GatewayError> {
        if self.registry.is_joined(conversation_id, connection.id).await {
            Ok(())
        } else {
            Err(GatewayError::AuthorizationDenied(ACCESS_DENIED.into()))
        }
    }

    async fn broadcast_to_others(
        &self,
        connection: &Connection,
        conversation_id: &str,
        event: &ServerEvent,
    ) {
        match event.to_frame() {
            Ok(frame) => {
                let delivered = self
                    .registry
                    .broadcast(conversation_id, &frame, Some(connection.id))
                    .await;
                metrics::record_broadcast(event.event_name(), delivered);
            }
            Err(e) => error!(error = %e, event = event.event_name(), "failed to encode frame"),
        }
    }
}
