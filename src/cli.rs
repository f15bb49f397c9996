use clap::Parser;

/// Concurrent DNS query probe
#[derive(Parser, Debug)]
#[command(name = "dns-probe")]
#[command(about = "Send repeated DNS queries to one server and report latency and throughput")]
pub struct Cli {
	/// Domain name to query
	#[arg(short = 'd', long = "domain", env = "DNS_PROBE_DOMAIN", default_value = "")]
	pub domain: String,

	/// DNS record type (A, AAAA, MX, TXT, NS, CNAME, SOA, PTR)
	#[arg(short = 't', long = "type", env = "DNS_PROBE_TYPE", default_value = "A")]
	pub record_type: String,

	/// Number of queries to perform (-1 for continuous)
	#[arg(
		short = 'n',
		long = "queries",
		env = "DNS_PROBE_QUERIES",
		default_value = "-1",
		allow_negative_numbers = true
	)]
	pub queries: i64,

	/// Number of concurrent queries
	#[arg(short = 'c', long = "concurrency", env = "DNS_PROBE_CONCURRENCY", default_value = "10")]
	pub concurrency: usize,

	/// DNS server to use (IP, host, or IP:port); port 53 when omitted
	#[arg(long = "dns", env = "DNS_PROBE_SERVER", default_value = "8.8.8.8")]
	pub dns: String,

	/// Log file for query diagnostics (default: write to stdout)
	#[arg(short = 'l', long = "log", env = "DNS_PROBE_LOG")]
	pub log: Option<String>,

	/// Output CSV file path for the final statistics
	#[arg(short = 'o', long = "output", env = "DNS_PROBE_OUTPUT")]
	pub output: Option<String>,
}

impl Cli {
	/// Log destination, treating an empty path as standard output.
	pub fn log_path(&self) -> Option<&str> {
		self.log.as_deref().filter(|p| !p.is_empty())
	}
}
