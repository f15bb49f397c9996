use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::{lookup_host, UdpSocket};

use crate::config::RunConfig;
use crate::dns::{build_query, parse_response, DnsResponse};

/// Responses larger than this are truncated by the receive
pub const RESPONSE_BUFFER_SIZE: usize = 512;

/// Outcome of one round-trip attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryResult {
	/// Wall-clock time of the attempt, populated on failure too
	pub duration: Duration,
	pub success: bool,
}

/// Ways a single attempt can fail
#[derive(Debug, Error)]
pub enum QueryError {
	#[error("error connecting to DNS server: {0}")]
	Connect(std::io::Error),
	#[error("no address found for DNS server '{0}'")]
	NoAddress(String),
	#[error("error packing DNS message: {0}")]
	Encode(anyhow::Error),
	#[error("error sending DNS query: {0}")]
	Send(std::io::Error),
	#[error("no DNS response within {0:?}")]
	Timeout(Duration),
	#[error("error reading DNS response: {0}")]
	Receive(std::io::Error),
	#[error("error unpacking DNS response: {0}")]
	Decode(anyhow::Error),
}

/// Performs one query attempt per call.
///
/// Implementations never fail: every problem is folded into a
/// `QueryResult` with `success == false`.
pub trait QueryExecutor: Send + Sync + 'static {
	fn execute(&self) -> impl Future<Output = QueryResult> + Send;
}

/// Sends the run's query over a fresh UDP socket per attempt
#[derive(Debug, Clone)]
pub struct UdpExecutor {
	config: Arc<RunConfig>,
}

impl UdpExecutor {
	pub fn new(config: Arc<RunConfig>) -> Self {
		UdpExecutor { config }
	}

	/// One round-trip. The socket is dropped on every return path.
	async fn round_trip(&self) -> Result<DnsResponse, QueryError> {
		let config = &self.config;

		let server = lookup_host(config.destination.as_str())
			.await
			.map_err(QueryError::Connect)?
			.next()
			.ok_or_else(|| QueryError::NoAddress(config.destination.clone()))?;

		let bind_addr = if server.is_ipv4() {
			"0.0.0.0:0"
		} else {
			"[::]:0"
		};
		let socket = UdpSocket::bind(bind_addr).await.map_err(QueryError::Connect)?;
		socket.connect(server).await.map_err(QueryError::Connect)?;

		let txid: u16 = rand::random();
		let query = build_query(&config.name, config.record_kind.record_type(), txid)
			.map_err(QueryError::Encode)?;
		socket.send(&query).await.map_err(QueryError::Send)?;

		let mut buf = [0u8; RESPONSE_BUFFER_SIZE];
		let len = match tokio::time::timeout(config.timeout, socket.recv(&mut buf)).await {
			Ok(Ok(len)) => len,
			Ok(Err(e)) => return Err(QueryError::Receive(e)),
			Err(_) => return Err(QueryError::Timeout(config.timeout)),
		};

		parse_response(&buf[..len]).map_err(QueryError::Decode)
	}
}

impl QueryExecutor for UdpExecutor {
	async fn execute(&self) -> QueryResult {
		let start = Instant::now();
		let outcome = self.round_trip().await;
		let duration = start.elapsed();

		match outcome {
			Ok(response) => {
				tracing::debug!(
					id = response.id,
					rcode = %response.rcode,
					answers = response.answer_count,
					elapsed_ms = duration.as_secs_f64() * 1000.0,
					"DNS response received"
				);
				QueryResult { duration, success: true }
			}
			Err(e) => {
				tracing::warn!(server = %self.config.destination, "{}", e);
				QueryResult { duration, success: false }
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::QueryLimit;
	use hickory_proto::op::{Message, MessageType};
	use std::net::SocketAddr;

	/// How the loopback server answers
	#[derive(Clone, Copy)]
	enum Reply {
		Answer,
		Garbage,
		Silent,
	}

	async fn spawn_server(reply: Reply) -> SocketAddr {
		let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let addr = socket.local_addr().unwrap();
		tokio::spawn(async move {
			let mut buf = vec![0u8; 512];
			while let Ok((len, src)) = socket.recv_from(&mut buf).await {
				let bytes = match reply {
					Reply::Answer => {
						let mut message = Message::from_vec(&buf[..len]).unwrap();
						message.set_message_type(MessageType::Response);
						message.to_vec().unwrap()
					}
					Reply::Garbage => vec![0xde, 0xad, 0xbe, 0xef, 0x00],
					Reply::Silent => continue,
				};
				let _ = socket.send_to(&bytes, src).await;
			}
		});
		addr
	}

	fn executor(destination: &str, timeout: Duration) -> UdpExecutor {
		let mut config = RunConfig::for_test(destination, QueryLimit::Count(1), 1);
		config.timeout = timeout;
		UdpExecutor::new(Arc::new(config))
	}

	#[tokio::test]
	async fn test_successful_round_trip() {
		let addr = spawn_server(Reply::Answer).await;
		let result = executor(&addr.to_string(), Duration::from_secs(2)).execute().await;
		assert!(result.success);
		assert!(result.duration < Duration::from_secs(2));
	}

	#[tokio::test]
	async fn test_undecodable_response_fails() {
		let addr = spawn_server(Reply::Garbage).await;
		let result = executor(&addr.to_string(), Duration::from_secs(2)).execute().await;
		assert!(!result.success);
	}

	#[tokio::test]
	async fn test_timeout_counts_as_failure() {
		let addr = spawn_server(Reply::Silent).await;
		let timeout = Duration::from_millis(100);
		let result = executor(&addr.to_string(), timeout).execute().await;
		assert!(!result.success);
		// Duration runs until the timeout fired
		assert!(result.duration >= timeout);
		assert!(result.duration < Duration::from_secs(2));
	}

	#[tokio::test]
	async fn test_unresolvable_server_fails() {
		let result = executor("not a valid host:53", Duration::from_millis(100))
			.execute()
			.await;
		assert!(!result.success);
	}
}
