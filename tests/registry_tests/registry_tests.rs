//! Tests for the server/stats registry
//!
//! These tests verify:
//! - Server specs add the right endpoints
//! - Bad specs leave the pool unchanged
//! - Stats are keyed by "host:port" and skip unreachable servers

use typedcache::config::Config;
use typedcache::driver::MAX_SERVER_WEIGHT;
use typedcache::{CacheError, Client, MemoryCluster, MemoryDriver, ServerEndpoint};

// =============================================================================
// Helper Functions
// =============================================================================

fn empty_client() -> (MemoryCluster, Client<MemoryDriver>) {
    let cluster = MemoryCluster::new();
    let config = Config::default();
    let client = Client::new(MemoryDriver::connect(&cluster, &config), config).unwrap();
    (cluster, client)
}

// =============================================================================
// Adding Servers
// =============================================================================

#[test]
fn test_add_single_server() {
    let (_cluster, mut client) = empty_client();

    assert_eq!(client.add_server("10.0.0.1:11311").unwrap(), 1);
    assert_eq!(client.servers(), vec![ServerEndpoint::new("10.0.0.1", 11311)]);
}

#[test]
fn test_add_server_default_port() {
    let (_cluster, mut client) = empty_client();

    client.add_server("cache.local").unwrap();

    let servers = client.servers();
    assert_eq!(servers[0].port, 11211);
    assert_eq!(servers[0].label(), "cache.local:11211");
}

#[test]
fn test_add_server_list() {
    let (_cluster, mut client) = empty_client();

    let added = client.add_server("a:11211, b:11212 c").unwrap();

    assert_eq!(added, 3);
    let labels: Vec<String> = client.servers().iter().map(|s| s.label()).collect();
    assert_eq!(labels, vec!["a:11211", "b:11212", "c:11211"]);
}

#[test]
fn test_add_server_with_weight() {
    let (_cluster, mut client) = empty_client();

    client.add_server("heavy:11211:5").unwrap();

    assert_eq!(client.servers()[0].weight, 5);
}

#[test]
fn test_add_server_appends() {
    let (_cluster, mut client) = empty_client();

    client.add_server("a").unwrap();
    client.add_server("b").unwrap();

    assert_eq!(client.servers().len(), 2);
}

#[test]
fn test_bad_spec_adds_nothing() {
    let (_cluster, mut client) = empty_client();

    for spec in ["", "host:notaport", "host:0", "a:1,b:x"] {
        let err = client.add_server(spec).unwrap_err();
        assert!(matches!(err, CacheError::Config(_)), "{:?} -> {:?}", spec, err);
    }
    assert!(client.servers().is_empty());
}

#[test]
fn test_huge_weight_rejected() {
    let (_cluster, mut client) = empty_client();
    client.add_server("a:11211").unwrap();

    for spec in ["b:11211:50000000", "b:11211:4294967295", "c:1,b:11211:101"] {
        let err = client.add_server(spec).unwrap_err();
        assert!(matches!(err, CacheError::Config(_)), "{:?} -> {:?}", spec, err);
    }

    // Pool untouched and still routing
    assert_eq!(client.servers(), vec![ServerEndpoint::new("a", 11211)]);
    client.set(b"k", "v", 0).unwrap();
    assert_eq!(client.get(b"k").unwrap(), typedcache::Value::from("v"));
}

#[test]
fn test_max_weight_accepted() {
    let (_cluster, mut client) = empty_client();

    client
        .add_server(&format!("heavy:11211:{}", MAX_SERVER_WEIGHT))
        .unwrap();

    assert_eq!(client.servers()[0].weight, MAX_SERVER_WEIGHT);
}

#[test]
fn test_configured_servers_added_on_new() {
    let cluster = MemoryCluster::new();
    let config = Config::builder().server("a:1").server("b:2,c:3").build();
    let client = Client::new(MemoryDriver::connect(&cluster, &config), config).unwrap();

    assert_eq!(client.servers().len(), 3);
}

#[test]
fn test_bad_configured_server_fails_new() {
    let cluster = MemoryCluster::new();
    let config = Config::builder().server("a:99999").build();

    let result = Client::new(MemoryDriver::connect(&cluster, &config), config);
    assert!(matches!(result, Err(CacheError::Config(_))));
}

// =============================================================================
// Stats
// =============================================================================

#[test]
fn test_stats_keyed_by_server() {
    let (_cluster, mut client) = empty_client();
    client.add_server("a:1,b:2").unwrap();

    let stats = client.stats();

    assert_eq!(stats.len(), 2);
    assert!(stats.contains_key("a:1"));
    assert!(stats.contains_key("b:2"));
    for server_stats in stats.values() {
        assert!(server_stats.contains_key("pid"));
        assert!(server_stats.contains_key("uptime"));
        assert!(server_stats.contains_key("curr_items"));
    }
}

#[test]
fn test_stats_skip_unreachable_server() {
    let (cluster, mut client) = empty_client();
    client.add_server("a:1,b:2").unwrap();
    cluster.set_down("a:1", true);

    let stats = client.stats();

    assert_eq!(stats.len(), 1);
    assert!(stats.contains_key("b:2"));
}

#[test]
fn test_stats_empty_pool() {
    let (_cluster, mut client) = empty_client();

    assert!(client.stats().is_empty());
}

#[test]
fn test_stats_reflect_traffic() {
    let (_cluster, mut client) = empty_client();
    client.add_server("only:1").unwrap();

    client.set(b"k", "v", 0).unwrap();
    client.get(b"k").unwrap();
    let _ = client.get(b"missing");

    let stats = client.stats();
    let only = &stats["only:1"];
    assert_eq!(only["curr_items"], "1");
    assert_eq!(only["cmd_set"], "1");
    assert_eq!(only["get_hits"], "1");
    assert_eq!(only["get_misses"], "1");
}

#[test]
fn test_stats_table_is_fresh_each_call() {
    let (_cluster, mut client) = empty_client();
    client.add_server("only:1").unwrap();

    let before = client.stats();
    client.set(b"k", "v", 0).unwrap();
    let after = client.stats();

    assert_eq!(before["only:1"]["curr_items"], "0");
    assert_eq!(after["only:1"]["curr_items"], "1");
}
