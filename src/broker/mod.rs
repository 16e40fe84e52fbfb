//! Owns the AMQP broker connection lifecycle: connect, declare, publish, shut down.

use std::time::Duration;

use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind,
};
use snafu::Snafu;
use tracing::{error, info, warn};

use crate::config::BrokerConfig;

/// The broker error taxonomy, collapsed from the specific AMQP condition that
/// triggered it. Every variant is logged with its specific cause before being
/// converted to this single surfaced type.
#[derive(Debug, Snafu)]
pub enum BrokerError {
    /// The server speaks an incompatible protocol version.
    #[snafu(display("broker protocol incompatible: {reason}"))]
    ProtocolIncompatible { reason: String },
    /// Credentials were rejected.
    #[snafu(display("broker authentication failed: {reason}"))]
    AuthFailed { reason: String },
    /// The user lacks permission on the target vhost/exchange.
    #[snafu(display("broker access denied: {reason}"))]
    AccessDenied { reason: String },
    /// TCP/TLS connection failed or timed out.
    #[snafu(display("broker connect failed after {attempts} attempt(s): {reason}"))]
    ConnectFailed { attempts: u32, reason: String },
    /// The server closed the channel.
    #[snafu(display("broker channel closed: {reason}"))]
    ChannelClosed { reason: String },
    /// The server closed the connection.
    #[snafu(display("broker connection closed: {reason}"))]
    ConnectionClosed { reason: String },
    /// A call was made with a misconfigured argument.
    #[snafu(display("broker call misconfigured: {reason}"))]
    BadArgument { reason: String },
    /// A publish failed after the connection was otherwise healthy.
    #[snafu(display("broker publish failed: {reason}"))]
    Publish { reason: String },
}

/// Classify a `lapin::Error` into the broker error taxonomy.
///
/// `lapin::Error`'s variants wrap the underlying protocol/IO errors; rather
/// than pattern-match on their exact shape (which shifts across lapin
/// releases), classification reads the rendered message, matching the same
/// coarse taxonomy the AMQP client library this was ported from exposes to
/// its callers.
fn classify(err: &lapin::Error) -> BrokerError {
    let reason = err.to_string();
    let lower = reason.to_lowercase();

    if lower.contains("access") && (lower.contains("denied") || lower.contains("refused")) {
        BrokerError::AccessDenied { reason }
    } else if lower.contains("auth") {
        BrokerError::AuthFailed { reason }
    } else if lower.contains("protocol") && lower.contains("version") {
        BrokerError::ProtocolIncompatible { reason }
    } else if lower.contains("channel") && lower.contains("clos") {
        BrokerError::ChannelClosed { reason }
    } else if lower.contains("connection") && lower.contains("clos") {
        BrokerError::ConnectionClosed { reason }
    } else if lower.contains("invalid") || lower.contains("argument") {
        BrokerError::BadArgument { reason }
    } else {
        BrokerError::ConnectFailed {
            attempts: 1,
            reason,
        }
    }
}

/// An established, exclusively-owned AMQP connection, channel, and fanout
/// exchange, as described in the data model's broker-connection triple.
pub struct BrokerClient {
    connection: Connection,
    channel: Channel,
    exchange: String,
}

impl BrokerClient {
    /// Connect to the broker, declaring the configured fanout exchange,
    /// retrying up to `config.connection_attempts` times.
    pub async fn connect(config: &BrokerConfig) -> Result<Self, BrokerError> {
        let uri = format!(
            "amqp://{}:{}@{}:{}/%2f",
            config.user, config.password, config.host, config.port
        );
        let properties = ConnectionProperties::default();

        let mut last_err = None;
        for attempt in 1..=config.connection_attempts.max(1) {
            match Connection::connect(&uri, properties.clone()).await {
                Ok(connection) => {
                    info!(host = %config.host, port = config.port, "connected to broker");
                    let channel = connection.create_channel().await.map_err(|e| classify(&e))?;
                    channel
                        .exchange_declare(
                            &config.exchange,
                            ExchangeKind::Fanout,
                            ExchangeDeclareOptions {
                                durable: true,
                                ..Default::default()
                            },
                            FieldTable::default(),
                        )
                        .await
                        .map_err(|e| classify(&e))?;
                    return Ok(Self {
                        connection,
                        channel,
                        exchange: config.exchange.clone(),
                    });
                }
                Err(e) => {
                    warn!(attempt, error = %e, "broker connection attempt failed");
                    last_err = Some(classify(&e));
                    if attempt < config.connection_attempts {
                        tokio::time::sleep(Duration::from_secs(config.retry_delay_secs)).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or(BrokerError::ConnectFailed {
            attempts: config.connection_attempts,
            reason: "no connection attempts were made".to_string(),
        }))
    }

    /// Publish one persistent message with an empty routing key (fanout).
    pub async fn publish(&self, body: &[u8], termination: bool) -> Result<(), BrokerError> {
        let mut headers = FieldTable::default();
        if termination {
            headers.insert("termination".into(), lapin::types::AMQPValue::Boolean(true));
        }
        let properties = BasicProperties::default()
            .with_delivery_mode(2)
            .with_headers(headers);

        self.channel
            .basic_publish(
                &self.exchange,
                "",
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|e| classify(&e))?
            .await
            .map_err(|e| classify(&e))?;
        Ok(())
    }

    /// Publish the empty-body, `termination=true` poison pill.
    pub async fn publish_poison_pill(&self) -> Result<(), BrokerError> {
        self.publish(&[], true).await
    }

    /// Close the channel then the connection. Idempotent; failures are logged,
    /// not propagated, matching the source tool's best-effort shutdown.
    pub async fn shutdown(self) {
        if let Err(e) = self.channel.close(200, "reporter shutdown").await {
            warn!(error = %e, "error closing broker channel during shutdown");
        }
        if let Err(e) = self.connection.close(200, "reporter shutdown").await {
            warn!(error = %e, "error closing broker connection during shutdown");
        }
    }
}

impl std::fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerClient")
            .field("exchange", &self.exchange)
            .finish()
    }
}

/// Logged at `error!` level before a fatal broker failure is surfaced, so the
/// specific cause is never lost even once collapsed into [`BrokerError`].
pub fn log_fatal(context: &str, err: &BrokerError) {
    error!(error = %err, "{context}");
}
