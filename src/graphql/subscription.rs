//! GraphQL subscriptions over the `graphql-transport-ws` protocol
//!
//! A [`SubscriptionClient`] owns one WebSocket connection and carries one
//! subscription. The handshake is:
//!
//! ```text
//! client: connection_init      server: connection_ack
//! client: subscribe {id}       server: next {id}* then complete {id} | error {id}
//! ```
//!
//! Server `ping` messages are answered with `pong` while the stream is polled.

use futures::{SinkExt, Stream, StreamExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use super::{GraphqlError, GraphqlRequest, GraphqlResponse};
use crate::config::GraphqlConfig;
use crate::{HarnessError, Result};

/// WebSocket subprotocol name negotiated during the upgrade
pub const GRAPHQL_TRANSPORT_WS: &str = "graphql-transport-ws";

const SUBSCRIPTION_ID: &str = "1";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage<'a> {
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<&'a Value>,
    },
    Subscribe {
        id: &'a str,
        payload: &'a GraphqlRequest,
    },
    Pong,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck,
    Next {
        id: String,
        payload: GraphqlResponse,
    },
    Error {
        id: String,
        payload: Vec<GraphqlError>,
    },
    Complete {
        id: String,
    },
    Ping,
    Pong,
}

/// An acknowledged `graphql-transport-ws` connection.
pub struct SubscriptionClient {
    socket: Socket,
    endpoint: String,
}

impl std::fmt::Debug for SubscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionClient").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

impl SubscriptionClient {
    /// Open the WebSocket and complete the `connection_init` handshake.
    ///
    /// The upgrade and the acknowledgement are each bounded by
    /// `config.request_timeout`.
    pub async fn connect(config: &GraphqlConfig) -> Result<Self> {
        Self::connect_with_payload(config, None).await
    }

    /// Like [`SubscriptionClient::connect`], sending `payload` with `connection_init`.
    pub async fn connect_with_payload(config: &GraphqlConfig, payload: Option<Value>) -> Result<Self> {
        let endpoint = config.ws_endpoint.clone();
        let mut request = endpoint.as_str().into_client_request()?;
        request
            .headers_mut()
            .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(GRAPHQL_TRANSPORT_WS));

        debug!("Connecting subscription socket to {}", endpoint);
        let (socket, _response) = tokio::time::timeout(
            config.request_timeout,
            tokio_tungstenite::connect_async(request),
        )
        .await
        .map_err(|_| HarnessError::timeout(config.request_timeout, format!("WebSocket upgrade at {}", endpoint)))??;

        let mut client = Self { socket, endpoint };
        client.send(&ClientMessage::ConnectionInit { payload: payload.as_ref() }).await?;
        client.await_ack(config.request_timeout).await?;

        debug!("Subscription socket to {} acknowledged", client.endpoint);
        Ok(client)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Start `request` and stream its decoded `next` payloads.
    ///
    /// The stream ends when the server completes the subscription or closes
    /// the socket. An `error` message or a failing payload yields one `Err`
    /// item and then ends the stream.
    pub async fn subscribe<D>(
        mut self,
        request: GraphqlRequest,
    ) -> Result<impl Stream<Item = Result<D>> + Send + 'static>
    where
        D: DeserializeOwned + Send + 'static,
    {
        let label = request.label();
        self.send(&ClientMessage::Subscribe { id: SUBSCRIPTION_ID, payload: &request }).await?;
        debug!("Subscribed to {} on {}", label, self.endpoint);

        let stream = futures::stream::unfold(Some((self.socket, label)), |state| async move {
            let (mut socket, label) = state?;
            loop {
                match next_message(&mut socket).await {
                    Ok(Some(ServerMessage::Next { id, payload })) if id == SUBSCRIPTION_ID => {
                        let item = payload.into_data::<D>(&label);
                        let next = if item.is_ok() { Some((socket, label)) } else { None };
                        return Some((item, next));
                    }
                    Ok(Some(ServerMessage::Error { id, payload })) if id == SUBSCRIPTION_ID => {
                        return Some((Err(HarnessError::Graphql { errors: payload }), None));
                    }
                    Ok(Some(ServerMessage::Complete { id })) if id == SUBSCRIPTION_ID => {
                        debug!("Server completed {}", label);
                        if let Err(e) = socket.close(None).await {
                            debug!("Closing subscription socket after {} failed: {}", label, e);
                        }
                        return None;
                    }
                    Ok(Some(ServerMessage::Ping)) => {
                        if let Err(e) = send_message(&mut socket, &ClientMessage::Pong).await {
                            return Some((Err(e), None));
                        }
                    }
                    Ok(Some(other)) => trace!("Ignoring {:?} during {}", other, label),
                    Ok(None) => {
                        debug!("Subscription socket closed during {}", label);
                        return None;
                    }
                    Err(e) => return Some((Err(e), None)),
                }
            }
        });

        Ok(stream)
    }

    /// Close the connection without subscribing.
    pub async fn close(mut self) -> Result<()> {
        self.socket.close(None).await?;
        Ok(())
    }

    async fn send(&mut self, message: &ClientMessage<'_>) -> Result<()> {
        send_message(&mut self.socket, message).await
    }

    async fn await_ack(&mut self, timeout: Duration) -> Result<()> {
        let ack = tokio::time::timeout(timeout, async {
            loop {
                match next_message(&mut self.socket).await? {
                    Some(ServerMessage::ConnectionAck) => return Ok::<(), HarnessError>(()),
                    Some(ServerMessage::Ping) => self.send(&ClientMessage::Pong).await?,
                    Some(other) => {
                        return Err(HarnessError::protocol(format!(
                            "expected connection_ack, got {:?}",
                            other
                        )));
                    }
                    None => return Err(HarnessError::websocket("socket closed before connection_ack")),
                }
            }
        })
        .await;

        match ack {
            Ok(result) => result,
            Err(_) => Err(HarnessError::timeout(timeout, "connection_ack")),
        }
    }
}

async fn send_message(socket: &mut Socket, message: &ClientMessage<'_>) -> Result<()> {
    let text = serde_json::to_string(message)?;
    trace!("-> {}", text);
    socket.send(Message::text(text)).await?;
    Ok(())
}

/// Next protocol message, or `None` once the socket closes.
async fn next_message(socket: &mut Socket) -> Result<Option<ServerMessage>> {
    while let Some(message) = socket.next().await {
        match message? {
            Message::Text(text) => {
                trace!("<- {}", text.as_str());
                let parsed = serde_json::from_str(text.as_str())
                    .map_err(|e| HarnessError::protocol(format!("undecodable message: {}", e)))?;
                return Ok(Some(parsed));
            }
            Message::Close(frame) => {
                debug!("Subscription socket close frame: {:?}", frame);
                return Ok(None);
            }
            // WebSocket-level ping/pong is answered by tungstenite itself
            _ => continue,
        }
    }
    Ok(None)
}
