// SPDX-License-Identifier: MIT

//! Command dispatch over the keyspace: one family per value kind, plus
//! TTL, pub/sub, and cache-mode-gated admin commands.
//! Protocol-agnostic — [`super::CacheRuntime`] encodes a [`Reply`] to
//! whichever wire protocol the connection auto-detected.

use std::collections::{HashSet, VecDeque};

use super::keyspace::{CacheMode, Keyspace};
use super::snapshot;
use super::value::Value;

#[derive(Debug, Clone)]
pub enum Reply {
    Simple(&'static str),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
    Array(Vec<Reply>),
}

/// Side effects the connection handler must carry out after dispatch —
/// kept out of `Keyspace` itself since publish fan-out and replication
/// cross runtime boundaries the keyspace doesn't know about.
#[derive(Debug, Default)]
pub struct Effects {
    pub publish: Option<(String, Vec<u8>)>,
    pub replicate: Option<(Vec<u8>, Vec<u8>)>,
}

pub fn dispatch(ks: &mut Keyspace, mode: CacheMode, snapshot_path: Option<&std::path::Path>, args: &[Vec<u8>], now_ms: u64) -> (Reply, Effects) {
    let mut effects = Effects::default();
    let Some(cmd) = args.first() else {
        return (Reply::Error("empty command".into()), effects);
    };
    let name = String::from_utf8_lossy(cmd).to_ascii_uppercase();
    let is_write = matches!(
        name.as_str(),
        "SET" | "DEL" | "LPUSH" | "RPUSH" | "LPOP" | "RPOP" | "SADD" | "SREM" | "HSET" | "HDEL" | "EXPIRE" | "PERSIST"
    );
    if is_write && mode == CacheMode::ReadOnly {
        return (Reply::Error("readonly cache".into()), effects);
    }

    let reply = match name.as_str() {
        "SET" => cmd_set(ks, args, now_ms, &mut effects),
        "GET" => cmd_get(ks, args, now_ms),
        "DEL" => cmd_del(ks, args),
        "LPUSH" | "RPUSH" => cmd_push(ks, &name, args, now_ms),
        "LPOP" | "RPOP" => cmd_pop(ks, &name, args, now_ms),
        "LLEN" => cmd_llen(ks, args, now_ms),
        "LRANGE" => cmd_lrange(ks, args, now_ms),
        "SADD" => cmd_sadd(ks, args, now_ms),
        "SREM" => cmd_srem(ks, args, now_ms),
        "SISMEMBER" => cmd_sismember(ks, args, now_ms),
        "SCARD" => cmd_scard(ks, args, now_ms),
        "HSET" => cmd_hset(ks, args, now_ms),
        "HGET" => cmd_hget(ks, args, now_ms),
        "HDEL" => cmd_hdel(ks, args, now_ms),
        "HLEN" => cmd_hlen(ks, args, now_ms),
        "HGETALL" => cmd_hgetall(ks, args, now_ms),
        "EXPIRE" => cmd_expire(ks, args, now_ms),
        "TTL" => cmd_ttl(ks, args, now_ms),
        "PERSIST" => cmd_persist(ks, args),
        "PUBLISH" => cmd_publish(args, &mut effects),
        "FLUSH" if mode == CacheMode::Admin => cmd_flush(ks, snapshot_path, now_ms),
        "LOAD" if mode == CacheMode::Admin => cmd_load(ks, snapshot_path),
        "SIZE" if mode == CacheMode::Admin => Reply::Integer(ks.len() as i64),
        "FLUSH" | "LOAD" | "SIZE" => Reply::Error("admin command requires admin mode".into()),
        other => Reply::Error(format!("unknown command '{other}'")),
    };
    (reply, effects)
}

fn arg_str(args: &[Vec<u8>], idx: usize) -> Option<&[u8]> {
    args.get(idx).map(|v| v.as_slice())
}

fn cmd_set(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64, _effects: &mut Effects) -> Reply {
    let (Some(key), Some(value)) = (arg_str(args, 1), arg_str(args, 2)) else {
        return Reply::Error("SET requires key and value".into());
    };
    let ttl_ms = args.get(3).and_then(|v| std::str::from_utf8(v).ok()).and_then(|s| s.parse::<u64>().ok());
    if ks.set(key.to_vec(), Value::Str(value.to_vec()), ttl_ms, now_ms) {
        Reply::Simple("OK")
    } else {
        Reply::Error("OOM max memory exceeded".into())
    }
}

fn cmd_get(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("GET requires a key".into()) };
    match ks.get(key, now_ms) {
        Some(Value::Str(s)) => Reply::Bulk(Some(s.clone())),
        Some(_) => Reply::Error("WRONGTYPE not a string".into()),
        None => Reply::Bulk(None),
    }
}

fn cmd_del(ks: &mut Keyspace, args: &[Vec<u8>]) -> Reply {
    let deleted = args[1..].iter().filter(|k| ks.del(k)).count();
    Reply::Integer(deleted as i64)
}

fn cmd_push(ks: &mut Keyspace, name: &str, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(item)) = (arg_str(args, 1), arg_str(args, 2)) else {
        return Reply::Error(format!("{name} requires key and value"));
    };
    let item = item.to_vec();
    let front = name == "LPUSH";
    let Some(value) = ks.get_or_insert_with(key, now_ms, || Value::List(VecDeque::new())) else {
        return Reply::Error("internal error".into());
    };
    let Value::List(list) = value else { return Reply::Error("WRONGTYPE not a list".into()) };
    if front {
        list.push_front(item);
    } else {
        list.push_back(item);
    }
    let len = list.len();
    Reply::Integer(len as i64)
}

fn cmd_pop(ks: &mut Keyspace, name: &str, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error(format!("{name} requires a key")) };
    let front = name == "LPOP";
    let popped = ks.with_value_mut(key, now_ms, |v| match v {
        Value::List(list) => if front { list.pop_front() } else { list.pop_back() },
        _ => None,
    });
    match popped {
        Some(Some(item)) => Reply::Bulk(Some(item)),
        Some(None) => Reply::Bulk(None),
        None => Reply::Bulk(None),
    }
}

fn cmd_llen(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("LLEN requires a key".into()) };
    match ks.get(key, now_ms) {
        Some(Value::List(l)) => Reply::Integer(l.len() as i64),
        Some(_) => Reply::Error("WRONGTYPE not a list".into()),
        None => Reply::Integer(0),
    }
}

fn cmd_lrange(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(start), Some(stop)) = (
        arg_str(args, 1),
        arg_str(args, 2).and_then(|v| std::str::from_utf8(v).ok()).and_then(|s| s.parse::<i64>().ok()),
        arg_str(args, 3).and_then(|v| std::str::from_utf8(v).ok()).and_then(|s| s.parse::<i64>().ok()),
    ) else {
        return Reply::Error("LRANGE requires key, start, stop".into());
    };
    match ks.get(key, now_ms) {
        Some(Value::List(list)) => {
            let len = list.len() as i64;
            let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i.min(len) };
            let (start, stop) = (norm(start), norm(stop));
            let items = if start > stop {
                vec![]
            } else {
                list.iter().skip(start as usize).take((stop - start + 1) as usize).map(|v| Reply::Bulk(Some(v.clone()))).collect()
            };
            Reply::Array(items)
        }
        Some(_) => Reply::Error("WRONGTYPE not a list".into()),
        None => Reply::Array(vec![]),
    }
}

fn cmd_sadd(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("SADD requires a key".into()) };
    let members: Vec<Vec<u8>> = args[2..].to_vec();
    let added = ks.get_or_insert_with(key, now_ms, || Value::Set(HashSet::new())).and_then(|v| match v {
        Value::Set(set) => Some(members.into_iter().filter(|m| set.insert(m.clone())).count()),
        _ => None,
    });
    match added {
        Some(n) => Reply::Integer(n as i64),
        None => Reply::Error("WRONGTYPE not a set".into()),
    }
}

fn cmd_srem(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("SREM requires a key".into()) };
    let removed = ks.with_value_mut(key, now_ms, |v| match v {
        Value::Set(set) => Some(args[2..].iter().filter(|m| set.remove(m.as_slice())).count()),
        _ => None,
    });
    match removed {
        Some(Some(n)) => Reply::Integer(n as i64),
        _ => Reply::Integer(0),
    }
}

fn cmd_sismember(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(member)) = (arg_str(args, 1), arg_str(args, 2)) else {
        return Reply::Error("SISMEMBER requires key and member".into());
    };
    match ks.get(key, now_ms) {
        Some(Value::Set(set)) => Reply::Integer(i64::from(set.contains(member))),
        Some(_) => Reply::Error("WRONGTYPE not a set".into()),
        None => Reply::Integer(0),
    }
}

fn cmd_scard(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("SCARD requires a key".into()) };
    match ks.get(key, now_ms) {
        Some(Value::Set(set)) => Reply::Integer(set.len() as i64),
        Some(_) => Reply::Error("WRONGTYPE not a set".into()),
        None => Reply::Integer(0),
    }
}

fn cmd_hset(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(field), Some(value)) = (arg_str(args, 1), arg_str(args, 2), arg_str(args, 3)) else {
        return Reply::Error("HSET requires key, field, value".into());
    };
    let (field, value) = (field.to_vec(), value.to_vec());
    let result = ks.get_or_insert_with(key, now_ms, || Value::Hash(std::collections::HashMap::new())).and_then(|v| match v {
        Value::Hash(map) => Some(map.insert(field, value).is_none()),
        _ => None,
    });
    match result {
        Some(created) => Reply::Integer(i64::from(created)),
        None => Reply::Error("WRONGTYPE not a hash".into()),
    }
}

fn cmd_hget(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(field)) = (arg_str(args, 1), arg_str(args, 2)) else {
        return Reply::Error("HGET requires key and field".into());
    };
    match ks.get(key, now_ms) {
        Some(Value::Hash(map)) => Reply::Bulk(map.get(field).cloned()),
        Some(_) => Reply::Error("WRONGTYPE not a hash".into()),
        None => Reply::Bulk(None),
    }
}

fn cmd_hdel(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("HDEL requires a key".into()) };
    let removed = ks.with_value_mut(key, now_ms, |v| match v {
        Value::Hash(map) => Some(args[2..].iter().filter(|f| map.remove(f.as_slice()).is_some()).count()),
        _ => None,
    });
    match removed {
        Some(Some(n)) => Reply::Integer(n as i64),
        _ => Reply::Integer(0),
    }
}

fn cmd_hlen(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("HLEN requires a key".into()) };
    match ks.get(key, now_ms) {
        Some(Value::Hash(map)) => Reply::Integer(map.len() as i64),
        Some(_) => Reply::Error("WRONGTYPE not a hash".into()),
        None => Reply::Integer(0),
    }
}

fn cmd_hgetall(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("HGETALL requires a key".into()) };
    match ks.get(key, now_ms) {
        Some(Value::Hash(map)) => {
            let mut out = Vec::with_capacity(map.len() * 2);
            for (k, v) in map {
                out.push(Reply::Bulk(Some(k.clone())));
                out.push(Reply::Bulk(Some(v.clone())));
            }
            Reply::Array(out)
        }
        Some(_) => Reply::Error("WRONGTYPE not a hash".into()),
        None => Reply::Array(vec![]),
    }
}

fn cmd_expire(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let (Some(key), Some(secs)) =
        (arg_str(args, 1), arg_str(args, 2).and_then(|v| std::str::from_utf8(v).ok()).and_then(|s| s.parse::<u64>().ok()))
    else {
        return Reply::Error("EXPIRE requires key and seconds".into());
    };
    Reply::Integer(i64::from(ks.expire(key, secs * 1000, now_ms)))
}

fn cmd_ttl(ks: &mut Keyspace, args: &[Vec<u8>], now_ms: u64) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("TTL requires a key".into()) };
    match ks.ttl_ms(key, now_ms) {
        Some(Some(ms)) => Reply::Integer((ms / 1000) as i64),
        Some(None) => Reply::Integer(-1),
        None => Reply::Integer(-2),
    }
}

fn cmd_persist(ks: &mut Keyspace, args: &[Vec<u8>]) -> Reply {
    let Some(key) = arg_str(args, 1) else { return Reply::Error("PERSIST requires a key".into()) };
    Reply::Integer(i64::from(ks.persist(key)))
}

fn cmd_publish(args: &[Vec<u8>], effects: &mut Effects) -> Reply {
    let (Some(channel), Some(message)) = (arg_str(args, 1), arg_str(args, 2)) else {
        return Reply::Error("PUBLISH requires channel and message".into());
    };
    effects.publish = Some((String::from_utf8_lossy(channel).into_owned(), message.to_vec()));
    Reply::Integer(1)
}

fn cmd_flush(ks: &mut Keyspace, snapshot_path: Option<&std::path::Path>, _now_ms: u64) -> Reply {
    let Some(path) = snapshot_path else { return Reply::Error("no persistent path configured".into()) };
    let entries: Vec<snapshot::SnapshotEntry> =
        ks.entries().into_iter().map(|(key, value, expires_at_ms)| snapshot::SnapshotEntry { key, value, expires_at_ms }).collect();
    match snapshot::save(path, &entries) {
        Ok(()) => Reply::Simple("OK"),
        Err(e) => Reply::Error(e.to_string()),
    }
}

fn cmd_load(ks: &mut Keyspace, snapshot_path: Option<&std::path::Path>) -> Reply {
    let Some(path) = snapshot_path else { return Reply::Error("no persistent path configured".into()) };
    match snapshot::load(path) {
        Ok(entries) => {
            for entry in entries {
                // expires_at_ms was already an absolute deadline; setting
                // "now" to 0 makes the ttl argument land on that same
                // absolute value.
                ks.set(entry.key, entry.value, entry.expires_at_ms, 0);
            }
            Reply::Simple("OK")
        }
        Err(e) => Reply::Error(e.to_string()),
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
