use std::collections::HashMap;
use std::sync::Arc;

use crate::cmd_trait::Cmd;
use crate::generic::PingCmd;
use crate::hash::HClearCmd;
use crate::hash::HDelCmd;
use crate::hash::HExistsCmd;
use crate::hash::HExpireCmd;
use crate::hash::HGetAllCmd;
use crate::hash::HGetCmd;
use crate::hash::HIncrByCmd;
use crate::hash::HKeysCmd;
use crate::hash::HLenCmd;
use crate::hash::HMGetCmd;
use crate::hash::HMSetCmd;
use crate::hash::HPersistCmd;
use crate::hash::HScanCmd;
use crate::hash::HSetCmd;
use crate::hash::HTtlCmd;
use crate::hash::HValuesCmd;
use crate::kv::DecrByCmd;
use crate::kv::DecrCmd;
use crate::kv::DelCmd;
use crate::kv::ExistsCmd;
use crate::kv::ExpireAtCmd;
use crate::kv::ExpireCmd;
use crate::kv::GetCmd;
use crate::kv::GetSetCmd;
use crate::kv::IncrByCmd;
use crate::kv::IncrCmd;
use crate::kv::MGetCmd;
use crate::kv::MSetCmd;
use crate::kv::PersistCmd;
use crate::kv::SetCmd;
use crate::kv::SetNxCmd;
use crate::kv::TtlCmd;
use crate::list::LClearCmd;
use crate::list::LExpireCmd;
use crate::list::LIndexCmd;
use crate::list::LLenCmd;
use crate::list::LPersistCmd;
use crate::list::LPopCmd;
use crate::list::LPushCmd;
use crate::list::LRangeCmd;
use crate::list::LTtlCmd;
use crate::list::RPopCmd;
use crate::list::RPushCmd;
use crate::zset::ZAddCmd;
use crate::zset::ZCardCmd;
use crate::zset::ZClearCmd;
use crate::zset::ZCountCmd;
use crate::zset::ZExpireCmd;
use crate::zset::ZIncrByCmd;
use crate::zset::ZPersistCmd;
use crate::zset::ZRangeByScoreCmd;
use crate::zset::ZRangeCmd;
use crate::zset::ZRankCmd;
use crate::zset::ZRemCmd;
use crate::zset::ZRemRangeByRankCmd;
use crate::zset::ZRemRangeByScoreCmd;
use crate::zset::ZRevRangeByScoreCmd;
use crate::zset::ZRevRangeCmd;
use crate::zset::ZRevRankCmd;
use crate::zset::ZScoreCmd;
use crate::zset::ZTtlCmd;

/// Registry mapping an uppercased command name to its handler. `SELECT` is
/// deliberately absent here: it mutates the connection's current database
/// index, which this table has no access to (see `Dispatcher`).
pub struct CmdTable {
	inner: HashMap<String, Arc<dyn Cmd>>,
}

impl Default for CmdTable {
	fn default() -> Self {
		Self::new()
	}
}

macro_rules! register {
	($inner:expr, $($name:literal => $cmd:ty),* $(,)?) => {
		$( $inner.insert($name.to_string(), Arc::new(<$cmd>::default()) as Arc<dyn Cmd>); )*
	};
}

impl CmdTable {
	pub fn new() -> Self {
		let mut inner: HashMap<String, Arc<dyn Cmd>> = HashMap::new();
		register!(inner,
			"PING" => PingCmd,

			"GET" => GetCmd,
			"SET" => SetCmd,
			"SETNX" => SetNxCmd,
			"GETSET" => GetSetCmd,
			"MGET" => MGetCmd,
			"MSET" => MSetCmd,
			"DEL" => DelCmd,
			"EXISTS" => ExistsCmd,
			"INCR" => IncrCmd,
			"DECR" => DecrCmd,
			"INCRBY" => IncrByCmd,
			"DECRBY" => DecrByCmd,
			"EXPIRE" => ExpireCmd,
			"EXPIREAT" => ExpireAtCmd,
			"TTL" => TtlCmd,
			"PERSIST" => PersistCmd,

			"HSET" => HSetCmd,
			"HGET" => HGetCmd,
			"HMSET" => HMSetCmd,
			"HMGET" => HMGetCmd,
			"HDEL" => HDelCmd,
			"HEXISTS" => HExistsCmd,
			"HLEN" => HLenCmd,
			"HINCRBY" => HIncrByCmd,
			"HKEYS" => HKeysCmd,
			"HVALUES" => HValuesCmd,
			"HGETALL" => HGetAllCmd,
			"HCLEAR" => HClearCmd,
			"HSCAN" => HScanCmd,
			"HEXPIRE" => HExpireCmd,
			"HTTL" => HTtlCmd,
			"HPERSIST" => HPersistCmd,

			"LPUSH" => LPushCmd,
			"RPUSH" => RPushCmd,
			"LPOP" => LPopCmd,
			"RPOP" => RPopCmd,
			"LLEN" => LLenCmd,
			"LINDEX" => LIndexCmd,
			"LRANGE" => LRangeCmd,
			"LCLEAR" => LClearCmd,
			"LEXPIRE" => LExpireCmd,
			"LTTL" => LTtlCmd,
			"LPERSIST" => LPersistCmd,

			"ZADD" => ZAddCmd,
			"ZINCRBY" => ZIncrByCmd,
			"ZREM" => ZRemCmd,
			"ZSCORE" => ZScoreCmd,
			"ZCARD" => ZCardCmd,
			"ZRANGE" => ZRangeCmd,
			"ZREVRANGE" => ZRevRangeCmd,
			"ZRANGEBYSCORE" => ZRangeByScoreCmd,
			"ZREVRANGEBYSCORE" => ZRevRangeByScoreCmd,
			"ZCOUNT" => ZCountCmd,
			"ZRANK" => ZRankCmd,
			"ZREVRANK" => ZRevRankCmd,
			"ZREMRANGEBYRANK" => ZRemRangeByRankCmd,
			"ZREMRANGEBYSCORE" => ZRemRangeByScoreCmd,
			"ZCLEAR" => ZClearCmd,
			"ZEXPIRE" => ZExpireCmd,
			"ZTTL" => ZTtlCmd,
			"ZPERSIST" => ZPersistCmd,
		);
		Self { inner }
	}

	pub fn get_cmd(&self, name: &str) -> Option<&Arc<dyn Cmd>> {
		self.inner.get(name)
	}
}
