//! Normalization of host-API payloads into [`DiscoveredServer`]s.
//!
//! Host APIs disagree on shape: servers may sit in a top-level array, under
//! `data`, under `servers`, or deeper. Every object anywhere in the document is
//! treated as a candidate and probed for the three fields the agent needs.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use serde_json::{Map, Value};

use super::DiscoveredServer;
use crate::container::ContainerID;

const SERVER_ID_KEYS: [&str; 4] = ["server_id", "uuid", "identifier", "id"];
const CONTAINER_ID_KEYS: [&str; 4] = ["container_id", "container", "docker_container", "docker_id"];
const NESTED_CONTAINER_ID_KEYS: [&str; 3] = ["id", "container_id", "docker_id"];
const PORT_KEYS: [&str; 4] = ["allocated_port", "allocation_port", "game_port", "port"];
const STATE_KEYS: [&str; 3] = ["status", "state", "current_state"];

const RUNNING_STATES: [&str; 4] = ["running", "online", "started", "on"];
const STOPPED_STATES: [&str; 5] = ["stopped", "offline", "suspended", "installing", "stopping"];

/// Collects every running server described anywhere in `payload`.
///
/// Objects are visited depth-first in document order, parents before their
/// children. When two objects name the same `server_id`, the first one wins.
/// The result is sorted by `server_id`.
pub fn extract_servers(payload: &Value) -> Vec<DiscoveredServer> {
    let mut discovered = BTreeMap::new();

    for candidate in objects(payload) {
        let Some(server) = extract_server(candidate) else {
            continue;
        };
        match discovered.entry(server.server_id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(server);
            }
            Entry::Occupied(entry) => {
                log::trace!(
                    "ignoring duplicate entry for server `{}` (container {})",
                    entry.key(),
                    server.container_id
                );
            }
        }
    }

    discovered.into_values().collect()
}

/// Returns every object in `root`, pre-order, without recursing on the call stack.
fn objects(root: &Value) -> Vec<&Map<String, Value>> {
    let mut stack = vec![root];
    let mut out = Vec::new();

    while let Some(current) = stack.pop() {
        match current {
            Value::Object(map) => {
                out.push(map);
                stack.extend(map.values().rev());
            }
            Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    out
}

fn extract_server(data: &Map<String, Value>) -> Option<DiscoveredServer> {
    let server_id = server_id(data)?;
    let container_id = container_id(data)?;
    let allocated_port = allocated_port(data)?;
    if !is_running(data) {
        return None;
    }

    Some(DiscoveredServer {
        server_id,
        container_id,
        allocated_port,
    })
}

fn server_id(data: &Map<String, Value>) -> Option<String> {
    SERVER_ID_KEYS
        .iter()
        .filter_map(|key| data.get(*key)?.as_str())
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_owned)
}

fn container_id(data: &Map<String, Value>) -> Option<ContainerID> {
    let block = data.get("container").and_then(Value::as_object);
    let direct = CONTAINER_ID_KEYS.iter().filter_map(|key| data.get(*key));
    let nested = NESTED_CONTAINER_ID_KEYS
        .iter()
        .filter_map(|key| block?.get(*key));

    direct
        .chain(nested)
        .filter_map(Value::as_str)
        .find_map(|raw| ContainerID::new(raw).ok())
}

fn allocated_port(data: &Map<String, Value>) -> Option<u16> {
    if let Some(port) = PORT_KEYS.iter().find_map(|key| parse_port(data.get(*key)?)) {
        return Some(port);
    }

    let nested_port = |value: &Value| parse_port(value.as_object()?.get("port")?);

    if let Some(port) = data.get("allocation").and_then(nested_port) {
        return Some(port);
    }

    match data.get("allocations")? {
        Value::Array(entries) => entries.iter().find_map(nested_port),
        allocations @ Value::Object(_) => nested_port(allocations),
        _ => None,
    }
}

/// Accepts integers and all-digit strings in `1..=65535`.
fn parse_port(value: &Value) -> Option<u16> {
    let port = match value {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            text.parse::<u64>().ok()?
        }
        _ => return None,
    };

    u16::try_from(port).ok().filter(|port| *port != 0)
}

/// An explicit `running` flag wins. Otherwise unknown or missing states count as running.
fn is_running(data: &Map<String, Value>) -> bool {
    if let Some(running) = data.get("running").and_then(Value::as_bool) {
        return running;
    }

    let Some(state) = STATE_KEYS
        .iter()
        .filter_map(|key| data.get(*key)?.as_str())
        .map(str::trim)
        .find(|state| !state.is_empty())
    else {
        return true;
    };

    let state = state.to_ascii_lowercase();
    if RUNNING_STATES.contains(&state.as_str()) {
        return true;
    }
    !STOPPED_STATES.contains(&state.as_str())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn server(server_id: &str, container_id: &str, allocated_port: u16) -> DiscoveredServer {
        DiscoveredServer {
            server_id: server_id.to_owned(),
            container_id: ContainerID::new(container_id).unwrap(),
            allocated_port,
        }
    }

    #[test]
    fn test_nested_wings_shape() {
        let payload = json!({"data": {"servers": [{
            "uuid": "abc",
            "container": {"id": "docker://deadbeef"},
            "allocation": {"port": 25565},
            "status": "running"
        }]}});

        assert_eq!(extract_servers(&payload), vec![server("abc", "deadbeef", 25565)]);
    }

    #[test]
    fn test_flat_array_sorted_by_server_id() {
        let payload = json!([
            {"server_id": "zeta", "container_id": "c2", "port": "25566"},
            {"server_id": "alpha", "docker_id": "c1", "game_port": 25565, "running": true},
        ]);

        assert_eq!(
            extract_servers(&payload),
            vec![server("alpha", "c1", 25565), server("zeta", "c2", 25566)]
        );
    }

    #[test]
    fn test_key_priority() {
        let payload = json!({
            "server_id": " ",
            "uuid": " u-1 ",
            "id": "ignored",
            "container_id": "",
            "container": "c-main",
            "allocated_port": 0,
            "allocation_port": "not a port",
            "port": 30000,
        });

        assert_eq!(extract_servers(&payload), vec![server("u-1", "c-main", 30000)]);
    }

    #[test]
    fn test_allocations_list_and_object() {
        let payload = json!({"servers": [
            {"id": "a", "container_id": "ca", "allocations": [{"port": 70000}, {"ip": "0.0.0.0"}, {"port": "2000"}]},
            {"id": "b", "container_id": "cb", "allocations": {"port": 3000}},
        ]});

        assert_eq!(
            extract_servers(&payload),
            vec![server("a", "ca", 2000), server("b", "cb", 3000)]
        );
    }

    #[test]
    fn test_rejects_unusable_ports() {
        for port in [json!(-1), json!(65536), json!(25565.5), json!(true), json!("25 565"), json!("+80")] {
            assert_eq!(parse_port(&port), None, "{port}");
        }
        assert_eq!(parse_port(&json!(" 8080 ")), Some(8080));
        assert_eq!(parse_port(&json!(65535)), Some(65535));
    }

    #[test]
    fn test_running_verdicts() {
        let base = |extra: Value| {
            let mut object = json!({"id": "s", "container_id": "c", "port": 1});
            object
                .as_object_mut()
                .unwrap()
                .extend(extra.as_object().unwrap().clone());
            object
        };

        assert!(extract_servers(&base(json!({"status": "OFFLINE"}))).is_empty());
        assert!(extract_servers(&base(json!({"state": "installing"}))).is_empty());
        assert!(extract_servers(&base(json!({"running": false, "status": "running"}))).is_empty());
        assert_eq!(extract_servers(&base(json!({"running": true, "status": "stopped"}))).len(), 1);
        assert_eq!(extract_servers(&base(json!({"current_state": "Starting"}))).len(), 1);
        assert_eq!(extract_servers(&base(json!({"status": "", "state": "on"}))).len(), 1);
        assert_eq!(extract_servers(&base(json!({"running": "no"}))).len(), 1);
    }

    #[test]
    fn test_first_duplicate_wins() {
        let payload = json!({
            "first": {"id": "dup", "container_id": "c1", "port": 1000, "nested": {"id": "dup", "container_id": "c2", "port": 2000}},
            "second": {"id": "dup", "container_id": "c3", "port": 3000},
        });

        assert_eq!(extract_servers(&payload), vec![server("dup", "c1", 1000)]);
    }

    #[test]
    fn test_stopped_duplicate_does_not_shadow_running_one() {
        let payload = json!([
            {"id": "s", "container_id": "old", "port": 1000, "status": "stopped"},
            {"id": "s", "container_id": "new", "port": 1000, "status": "running"},
        ]);

        assert_eq!(extract_servers(&payload), vec![server("s", "new", 1000)]);
    }

    #[test]
    fn test_scalars_and_incomplete_objects_yield_nothing() {
        assert!(extract_servers(&json!("running")).is_empty());
        assert!(extract_servers(&json!({})).is_empty());
        assert!(extract_servers(&json!([{"id": "s", "port": 1}])).is_empty());
    }

    #[test]
    fn test_deep_nesting_does_not_overflow() {
        let mut payload = json!({"id": "deep", "container_id": "c", "port": 1});
        for _ in 0..1_000 {
            payload = json!([payload]);
        }

        assert_eq!(extract_servers(&payload), vec![server("deep", "c", 1)]);
    }
}
