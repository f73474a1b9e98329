// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session lifecycle.
//!
//! ```text
//!            open ok, tasks ok, declarations ok
//! Closed -> Connecting{n} ------------------------> Open
//!   ^           |  ^                                  |
//!   |           |  | backoff (cancellable)            | link lost
//!   |           +--+ any failure, session closed      v
//!   +------------------------------------------- Connecting{1}
//!                 stop requested
//! ```
//!
//! [`OpenSession`] owns everything that lives exactly as long as one
//! transport session: the liveliness tokens, the publisher handles (one per
//! registry descriptor, in registry order) and the attachment state.

use crate::attachment::{Attachment, TimestampSource};
use crate::error::{Error, Result};
use crate::guid::Guid;
use crate::keyexpr::{EntityKind, KeyExprContext, TopicKey};
use crate::registry::{Descriptor, PublishSink, Registry};
use crate::transport::{Session, SessionConfig, Transport};

/// Connection state of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session and no attempt in progress.
    #[default]
    Closed,
    /// Opening or waiting to retry; `attempt` starts at 1.
    Connecting {
        /// Attempt number since the last open session
        attempt: u32,
    },
    /// Session open and publishers declared.
    Open,
}

/// Class of a connect failure, used to pick the log message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Transport refused to open.
    TransportOpen,
    /// Scouting found no router or peer.
    ScoutNoResults,
    /// Task start, declaration or anything else.
    Other,
}

impl FailureKind {
    /// Classify a connect error.
    pub fn classify(err: &Error) -> Self {
        match err {
            Error::TransportOpen(_) => FailureKind::TransportOpen,
            Error::ScoutNoResults => FailureKind::ScoutNoResults,
            _ => FailureKind::Other,
        }
    }
}

/// Identity of the local node in key expressions and attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeIdentity {
    /// Local GUID
    pub guid: Guid,
    /// ROS domain id
    pub domain_id: u32,
    /// Attachment timestamp source
    pub timestamps: TimestampSource,
}

/// Per-session state of an open, fully declared session.
pub struct OpenSession<S: Session> {
    session: S,
    node_token: S::Token,
    topic_tokens: Vec<S::Token>,
    publishers: Box<[S::Publisher]>,
    attachment: Attachment,
}

struct Declarations<S: Session> {
    node_token: S::Token,
    topic_tokens: Vec<S::Token>,
    publishers: Vec<S::Publisher>,
}

impl<S: Session> OpenSession<S> {
    /// Open a session, start its tasks and declare every registered topic.
    ///
    /// On any failure after the transport opened, the handles declared so
    /// far are dropped and the session is closed before the error returns.
    pub fn establish<T>(
        transport: &T,
        config: &SessionConfig,
        identity: &NodeIdentity,
        registry: &Registry,
    ) -> Result<Self>
    where
        T: Transport<Session = S>,
    {
        let mut session = transport.open(config)?;

        if let Err(err) = start_tasks(&mut session) {
            close_after_failure(session);
            return Err(err);
        }

        let declarations = match declare(&mut session, identity, registry) {
            Ok(declarations) => declarations,
            Err(err) => {
                close_after_failure(session);
                return Err(err);
            }
        };

        Ok(Self {
            session,
            node_token: declarations.node_token,
            topic_tokens: declarations.topic_tokens,
            publishers: declarations.publishers.into_boxed_slice(),
            attachment: Attachment::new(identity.guid, identity.timestamps),
        })
    }

    /// Transport-assigned session id.
    pub fn session_id(&self) -> [u8; crate::keyexpr::ID_SIZE] {
        self.session.session_id()
    }

    /// Whether the link is still up.
    pub fn is_alive(&self) -> bool {
        self.session.is_alive()
    }

    /// Attachment state of this session.
    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    /// Withdraw tokens, drop publishers and close the transport session.
    pub fn close(self) -> Result<()> {
        let Self {
            session,
            node_token,
            topic_tokens,
            publishers,
            attachment: _,
        } = self;
        drop(publishers);
        drop(topic_tokens);
        drop(node_token);
        session.close()
    }
}

impl<S: Session> PublishSink for OpenSession<S> {
    fn publish(&mut self, index: usize, descriptor: &Descriptor, payload: &[u8]) -> Result<()> {
        let publisher = self.publishers.get(index).ok_or_else(|| {
            Error::Publish(format!("no publisher declared for {}", descriptor.topic_name()))
        })?;
        let attachment = self.attachment.build();
        self.session.publish(publisher, payload, &attachment)
    }
}

fn start_tasks<S: Session>(session: &mut S) -> Result<()> {
    session.start_read_task()?;
    session.start_lease_task()
}

fn declare<S: Session>(
    session: &mut S,
    identity: &NodeIdentity,
    registry: &Registry,
) -> Result<Declarations<S>> {
    let ctx = KeyExprContext::new(
        session.session_id(),
        *identity.guid.as_bytes(),
        identity.domain_id,
    );

    let node_ke = ctx.node_liveliness()?;
    log::debug!("[zenoh] declaring node token {}", node_ke);
    let node_token = session.declare_liveliness_token(&node_ke)?;

    let mut topic_tokens = Vec::with_capacity(registry.len());
    let mut publishers = Vec::with_capacity(registry.len());
    for descriptor in registry.descriptors() {
        let schema = descriptor.schema();
        let topic = TopicKey {
            name: descriptor.topic_name(),
            type_name: schema.type_name,
            type_hash: &schema.type_hash,
        };

        let liveliness_ke = ctx.topic_liveliness(&topic, EntityKind::Publisher)?;
        log::debug!("[zenoh] declaring publisher token {}", liveliness_ke);
        topic_tokens.push(session.declare_liveliness_token(&liveliness_ke)?);

        let data_ke = ctx.topic_data(&topic)?;
        log::debug!("[zenoh] declaring publisher {}", data_ke);
        publishers.push(session.declare_publisher(&data_ke)?);
    }

    Ok(Declarations {
        node_token,
        topic_tokens,
        publishers,
    })
}

fn close_after_failure<S: Session>(session: S) {
    if let Err(err) = session.close() {
        log::warn!("[zenoh] failed to close session: {}", err);
    }
}
