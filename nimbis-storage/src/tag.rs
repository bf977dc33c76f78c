/// Maximum length of a logical user key, per §4.1: the explicit 16-bit
/// length prefix used inside composite keys bounds it at `u16::MAX`.
pub const MAX_USER_KEY_LEN: usize = u16::MAX as usize;

/// First byte of every encoded store key: identifies which record kind the
/// rest of the key belongs to. Keeping one tag per record kind (rather than
/// per logical type) is what lets a size/meta record sort before its own
/// subrecords while subrecords of different logical types never interleave.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordTag {
	Kv = b'k',
	HSize = b'H',
	HField = b'h',
	LMeta = b'L',
	LElem = b'l',
	ZSize = b'Z',
	ZSetField = b'z',
	ZSetScore = b'y',
	ExpMeta = b'M',
	ExpTime = b'T',
}

impl RecordTag {
	pub fn from_u8(v: u8) -> Option<Self> {
		match v {
			b'k' => Some(Self::Kv),
			b'H' => Some(Self::HSize),
			b'h' => Some(Self::HField),
			b'L' => Some(Self::LMeta),
			b'l' => Some(Self::LElem),
			b'Z' => Some(Self::ZSize),
			b'z' => Some(Self::ZSetField),
			b'y' => Some(Self::ZSetScore),
			b'M' => Some(Self::ExpMeta),
			b'T' => Some(Self::ExpTime),
			_ => None,
		}
	}
}

/// The four logical data structures TTL entries and WRONGTYPE checks must
/// distinguish between. Distinct from [`RecordTag`]: a single `DataKind`
/// spans several record tags (e.g. `Hash` owns both `HSize` and `HField`).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
	Kv = b'k',
	Hash = b'h',
	List = b'l',
	ZSet = b'z',
}

impl DataKind {
	pub fn from_u8(v: u8) -> Option<Self> {
		match v {
			b'k' => Some(Self::Kv),
			b'h' => Some(Self::Hash),
			b'l' => Some(Self::List),
			b'z' => Some(Self::ZSet),
			_ => None,
		}
	}
}
