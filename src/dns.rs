use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};

/// Fields of a decoded response worth logging
#[derive(Debug)]
pub struct DnsResponse {
	pub id: u16,
	pub rcode: ResponseCode,
	pub answer_count: usize,
}

/// Build a recursive DNS query for `name` and serialize it for UDP.
pub fn build_query(name: &Name, record_type: RecordType, txid: u16) -> Result<Vec<u8>> {
	let mut message = Message::new();
	message.set_id(txid);
	message.set_message_type(MessageType::Query);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name.clone(), record_type));

	message.to_vec()
		.map_err(|e| anyhow!("failed to serialize DNS query for '{}': {}", name, e))
}

/// Decode a DNS response.
///
/// Any well-formed message is accepted regardless of its response code;
/// the caller decides what the code means.
pub fn parse_response(bytes: &[u8]) -> Result<DnsResponse> {
	let message = Message::from_vec(bytes)
		.map_err(|e| anyhow!("failed to parse DNS response: {}", e))?;

	Ok(DnsResponse {
		id: message.id(),
		rcode: message.response_code(),
		answer_count: message.answer_count() as usize,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn example_name() -> Name {
		Name::from_ascii("example.com.").unwrap()
	}

	#[test]
	fn test_build_query_header() {
		let bytes = build_query(&example_name(), RecordType::A, 1234).unwrap();
		// DNS header is 12 bytes minimum
		assert!(bytes.len() >= 12);
		assert_eq!(bytes[0], (1234 >> 8) as u8);
		assert_eq!(bytes[1], (1234 & 0xff) as u8);

		let message = Message::from_vec(&bytes).unwrap();
		assert!(message.recursion_desired());
		assert_eq!(message.queries().len(), 1);
		assert_eq!(message.queries()[0].query_type(), RecordType::A);
	}

	#[test]
	fn test_build_query_record_type() {
		let bytes = build_query(&example_name(), RecordType::TXT, 7).unwrap();
		let message = Message::from_vec(&bytes).unwrap();
		assert_eq!(message.queries()[0].query_type(), RecordType::TXT);
		assert_eq!(message.queries()[0].name(), &example_name());
	}

	#[test]
	fn test_parse_valid_response() {
		let query_bytes = build_query(&example_name(), RecordType::A, 9999).unwrap();
		let mut response = Message::from_vec(&query_bytes).unwrap();
		response.set_message_type(MessageType::Response);
		response.set_response_code(ResponseCode::NXDomain);
		let response_bytes = response.to_vec().unwrap();

		let parsed = parse_response(&response_bytes).unwrap();
		assert_eq!(parsed.id, 9999);
		assert_eq!(parsed.rcode, ResponseCode::NXDomain);
		assert_eq!(parsed.answer_count, 0);
	}

	#[test]
	fn test_truncated_buffer() {
		// Only 5 bytes -- too short for a valid DNS message
		let bytes = vec![0u8; 5];
		assert!(parse_response(&bytes).is_err());
	}
}
