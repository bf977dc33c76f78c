use bytes::Bytes;
use resp::RespValue;

/// A RESP array decomposed into a command name and its argument bytes.
pub struct ParsedCmd {
	pub name: String,
	pub args: Vec<Bytes>,
}

impl TryFrom<RespValue> for ParsedCmd {
	type Error = String;

	fn try_from(value: RespValue) -> Result<Self, Self::Error> {
		let args = value.as_array().ok_or("ERR expected a command array")?;
		if args.is_empty() {
			return Err("ERR empty command".to_string());
		}

		let name = args[0].as_str().ok_or("ERR invalid command name")?.to_uppercase();
		let args: Result<Vec<Bytes>, _> = args[1..].iter().map(|v| v.as_bytes().cloned().ok_or("ERR invalid argument")).collect();

		Ok(ParsedCmd { name, args: args? })
	}
}
