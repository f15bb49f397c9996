use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use hickory_proto::rr::{Name, RecordType};
use thiserror::Error;

use crate::cli::Cli;

/// Port appended to a destination given without one
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Upper bound on concurrent workers, each holding one UDP socket while busy
pub const MAX_CONCURRENCY: usize = 10_000;

/// Upper bound on a single round-trip attempt
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration problems detected before any query is sent
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("please provide a domain name using the --domain flag")]
	EmptyDomain,
	#[error("invalid domain name '{domain}': {reason}")]
	InvalidDomain { domain: String, reason: String },
	#[error("invalid record type: {0}")]
	UnknownRecordType(String),
	#[error("invalid query count {0}: use a non-negative number or -1 for continuous")]
	InvalidQueryLimit(i64),
	#[error("concurrency must be at least 1")]
	ZeroConcurrency,
	#[error("concurrency {requested} exceeds the maximum of {max}")]
	ConcurrencyTooHigh { requested: usize, max: usize },
	#[error("empty DNS server address")]
	EmptyServer,
}

/// Record types the probe can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
	A,
	Ns,
	Cname,
	Soa,
	Ptr,
	Mx,
	Txt,
	Aaaa,
}

impl RecordKind {
	/// Numeric QTYPE code sent on the wire.
	pub fn code(self) -> u16 {
		match self {
			RecordKind::A => 1,
			RecordKind::Ns => 2,
			RecordKind::Cname => 5,
			RecordKind::Soa => 6,
			RecordKind::Ptr => 12,
			RecordKind::Mx => 15,
			RecordKind::Txt => 16,
			RecordKind::Aaaa => 28,
		}
	}

	pub fn mnemonic(self) -> &'static str {
		match self {
			RecordKind::A => "A",
			RecordKind::Ns => "NS",
			RecordKind::Cname => "CNAME",
			RecordKind::Soa => "SOA",
			RecordKind::Ptr => "PTR",
			RecordKind::Mx => "MX",
			RecordKind::Txt => "TXT",
			RecordKind::Aaaa => "AAAA",
		}
	}

	pub fn record_type(self) -> RecordType {
		RecordType::from(self.code())
	}
}

impl FromStr for RecordKind {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"A" => Ok(RecordKind::A),
			"NS" => Ok(RecordKind::Ns),
			"CNAME" => Ok(RecordKind::Cname),
			"SOA" => Ok(RecordKind::Soa),
			"PTR" => Ok(RecordKind::Ptr),
			"MX" => Ok(RecordKind::Mx),
			"TXT" => Ok(RecordKind::Txt),
			"AAAA" => Ok(RecordKind::Aaaa),
			_ => Err(ConfigError::UnknownRecordType(s.to_string())),
		}
	}
}

impl fmt::Display for RecordKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.mnemonic())
	}
}

/// How many work tokens the producer may issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLimit {
	Unbounded,
	Count(u64),
}

impl QueryLimit {
	/// Map the command-line convention (-1 = continuous) onto a limit.
	pub fn from_flag(queries: i64) -> Result<Self, ConfigError> {
		match queries {
			-1 => Ok(QueryLimit::Unbounded),
			n if n >= 0 => Ok(QueryLimit::Count(n as u64)),
			n => Err(ConfigError::InvalidQueryLimit(n)),
		}
	}

	/// True while another token may be produced after `produced` tokens.
	pub fn permits(self, produced: u64) -> bool {
		match self {
			QueryLimit::Unbounded => true,
			QueryLimit::Count(limit) => produced < limit,
		}
	}

	/// True when `produced` is the last token of a bounded run.
	pub fn is_final(self, produced: u64) -> bool {
		matches!(self, QueryLimit::Count(limit) if produced == limit)
	}
}

/// Immutable parameters shared by every task of a run
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub domain: String,
	pub name: Name,
	pub record_kind: RecordKind,
	pub concurrency: usize,
	pub limit: QueryLimit,
	pub destination: String,
	pub timeout: Duration,
}

impl RunConfig {
	/// Validate command-line values into a run configuration.
	///
	/// Nothing here touches the network; a bad value stops the run
	/// before the first query.
	pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
		let domain = cli.domain.trim().to_string();
		let name = parse_domain(&domain)?;
		let record_kind: RecordKind = cli.record_type.parse()?;
		let limit = QueryLimit::from_flag(cli.queries)?;
		if cli.concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}
		if cli.concurrency > MAX_CONCURRENCY {
			return Err(ConfigError::ConcurrencyTooHigh {
				requested: cli.concurrency,
				max: MAX_CONCURRENCY,
			});
		}
		if cli.dns.trim().is_empty() {
			return Err(ConfigError::EmptyServer);
		}

		Ok(RunConfig {
			domain,
			name,
			record_kind,
			concurrency: cli.concurrency,
			limit,
			destination: normalize_destination(&cli.dns),
			timeout: QUERY_TIMEOUT,
		})
	}
}

#[cfg(test)]
impl RunConfig {
	/// Configuration for an A query of example.com against `destination`.
	pub fn for_test(destination: &str, limit: QueryLimit, concurrency: usize) -> Self {
		RunConfig {
			domain: "example.com".to_string(),
			name: Name::from_ascii("example.com.").unwrap(),
			record_kind: RecordKind::A,
			concurrency,
			limit,
			destination: destination.to_string(),
			timeout: QUERY_TIMEOUT,
		}
	}
}

/// Parse a domain into a fully-qualified DNS name.
pub fn parse_domain(domain: &str) -> Result<Name, ConfigError> {
	if domain.is_empty() {
		return Err(ConfigError::EmptyDomain);
	}
	let fqdn = if domain.ends_with('.') {
		domain.to_string()
	} else {
		format!("{}.", domain)
	};
	Name::from_ascii(&fqdn).map_err(|e| ConfigError::InvalidDomain {
		domain: domain.to_string(),
		reason: e.to_string(),
	})
}

/// Append the default DNS port to a destination given without one.
///
/// Supports formats:
///   "8.8.8.8"              -- IPv4, port 53 appended
///   "8.8.8.8:5353"         -- kept as is
///   "2001:4860::8888"      -- bare IPv6, bracketed with port 53
///   "[2001:4860::8888]:53" -- kept as is
///   "dns.google"           -- hostname, port 53 appended
pub fn normalize_destination(input: &str) -> String {
	let trimmed = input.trim();
	if let Ok(ip) = trimmed.parse::<IpAddr>() {
		return SocketAddr::new(ip, DEFAULT_DNS_PORT).to_string();
	}
	if trimmed.contains(':') {
		return trimmed.to_string();
	}
	format!("{}:{}", trimmed, DEFAULT_DNS_PORT)
}
