#![allow(clippy::unwrap_used)]
// WAN status model tests: ordering, per-type decoding and traffic merge.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pepfob_api::{RouterClient, paths};
use pepfob_core::store::JAR_NAMESPACE;
use pepfob_core::{
    CredentialJar, CredentialStore, MemoryStore, RouterConfig, SessionManager, SimSlot,
    WanStatusModel,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn ok(response: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "stat": "ok", "response": response }))
}

async fn setup() -> (MockServer, WanStatusModel) {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    let jar = CredentialJar {
        cookie: Some(SecretString::from("bauth=c".to_owned())),
        token: Some(SecretString::from("tok".to_owned())),
    };
    store.save(JAR_NAMESPACE, &jar.encode().unwrap()).unwrap();

    let url = Url::parse(&server.uri()).unwrap();
    let config = RouterConfig::new(url.clone(), "admin", SecretString::from("pw".to_owned()));
    let client = RouterClient::with_client(reqwest::Client::new(), url);
    let session = Arc::new(SessionManager::with_client(client, &config, store));
    (server, WanStatusModel::new(session))
}

fn ethernet(name: &str, priority: u32) -> serde_json::Value {
    json!({
        "type": "ethernet", "name": name, "message": "Connected", "statusLed": "green",
        "priority": priority, "ip": format!("10.0.0.{priority}")
    })
}

async fn mount_traffic(server: &MockServer, bandwidth: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(paths::TRAFFIC))
        .respond_with(ok(json!({ "bandwidth": bandwidth })))
        .mount(server)
        .await;
}

// ── Ordering ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_links_are_ordered_by_priority_with_unset_last() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({
            "order": [2, 5, 1],
            "2": ethernet("WAN 2", 1),
            "5": ethernet("WAN 5", 0),
            "1": ethernet("WAN 1", 2)
        })))
        .mount(&server)
        .await;
    mount_traffic(
        &server,
        json!({
            "order": [1, 2, 5], "unit": "kbps",
            "1": { "name": "WAN 1", "overall": { "download": 100, "upload": 10 } },
            "2": { "name": "WAN 2", "overall": { "download": 200, "upload": 20 } },
            "5": { "name": "WAN 5", "overall": { "download": 500, "upload": 50 } }
        }),
    )
    .await;

    let links = wans.refresh(None).await.unwrap();
    let ids: Vec<u8> = links.iter().map(|l| l.id).collect();
    assert_eq!(ids, vec![2, 1, 5]);

    assert_eq!(links[0].download, 200);
    assert_eq!(links[1].download, 100);
    assert_eq!(links[2].upload, 50);
    assert_eq!(links[0].unit, "kbps");
    assert_eq!(wans.links().len(), 3);
}

// ── Per-type decoding ───────────────────────────────────────────────

#[tokio::test]
async fn test_cellular_sim_slots() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({
            "order": [3],
            "3": {
                "type": "cellular", "name": "Cellular", "message": "Connected",
                "statusLed": "green", "priority": 1, "ip": "100.64.0.7",
                "cellular": {
                    "signalLevel": 4, "network": "LTE",
                    "carrier": { "name": "Carrier X" },
                    "sim": {
                        "order": [1, 2],
                        "1": { "simCardDetected": true, "active": true, "iccid": "8985200001" },
                        "2": { "simCardDetected": false }
                    }
                }
            }
        })))
        .mount(&server)
        .await;
    mount_traffic(&server, json!({ "order": [], "unit": "kbps" })).await;

    let links = wans.refresh(None).await.unwrap();
    let cell = links[0].cellular().unwrap();
    assert_eq!(cell.carrier.as_deref(), Some("Carrier X"));
    assert_eq!(cell.signal_level, 4);
    assert_eq!(
        cell.sim_cards,
        vec![
            SimSlot {
                detected: true,
                active: true,
                iccid: Some("8985200001".into()),
            },
            SimSlot {
                detected: false,
                active: false,
                iccid: None,
            },
        ]
    );
}

#[tokio::test]
async fn test_disabled_link_keeps_defaults_even_with_traffic() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({
            "order": [1, 2],
            "1": ethernet("WAN 1", 1),
            "2": {
                "type": "ethernet", "name": "WAN 2", "message": "Disabled",
                "statusLed": "gray", "priority": 2, "ip": "10.9.9.9"
            }
        })))
        .mount(&server)
        .await;
    mount_traffic(
        &server,
        json!({
            "order": [1, 2], "unit": "kbps",
            "1": { "overall": { "download": 7, "upload": 3 } },
            "2": { "overall": { "download": 999, "upload": 999 } }
        }),
    )
    .await;

    let links = wans.refresh(None).await.unwrap();
    let disabled = links.iter().find(|l| l.id == 2).unwrap();
    assert!(disabled.is_disabled());
    assert_eq!(disabled.ip, None);
    assert_eq!((disabled.download, disabled.upload), (0, 0));
    assert!(disabled.unit.is_empty());
}

#[tokio::test]
async fn test_unsupported_type_skips_only_that_entry() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({
            "order": [1, 4],
            "1": ethernet("WAN 1", 1),
            "4": { "type": "satellite", "name": "Sat", "message": "Connected", "priority": 2 }
        })))
        .mount(&server)
        .await;
    mount_traffic(&server, json!({ "order": [] })).await;

    let links = wans.refresh(None).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].id, 1);
}

// ── Traffic merge ───────────────────────────────────────────────────

#[tokio::test]
async fn test_filtered_refresh_merges_by_id_not_position() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param("id", "2"))
        .respond_with(ok(json!({ "order": [2], "2": ethernet("WAN 2", 1) })))
        .mount(&server)
        .await;
    mount_traffic(
        &server,
        json!({
            "order": [1, 2], "unit": "kbps",
            "1": { "overall": { "download": 111, "upload": 11 } },
            "2": { "overall": { "download": 222, "upload": 22 } }
        }),
    )
    .await;

    let links = wans.refresh(Some(2)).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!((links[0].download, links[0].upload), (222, 22));
}

#[tokio::test]
async fn test_traffic_failure_keeps_links_with_default_rates() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({ "order": [1], "1": ethernet("WAN 1", 1) })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::TRAFFIC))
        .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
        .mount(&server)
        .await;

    let links = wans.refresh(None).await.unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].download, 0);
}

#[tokio::test]
async fn test_failed_refresh_clears_previous_list() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({ "order": [1], "1": ethernet("WAN 1", 1) })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!("not a status table")))
        .mount(&server)
        .await;
    mount_traffic(&server, json!({ "order": [] })).await;

    let mut updates = wans.subscribe();
    wans.refresh(None).await.unwrap();
    assert_eq!(updates.borrow_and_update().len(), 1);

    assert!(wans.refresh(None).await.is_err());
    assert!(wans.links().is_empty());
}

// ── Filtered refresh ────────────────────────────────────────────────

#[tokio::test]
async fn test_filtered_refresh_keeps_the_rest_of_the_list() {
    let (server, wans) = setup().await;

    let mut degraded = ethernet("WAN 2", 2);
    degraded["message"] = json!("No Cable Detected");
    degraded["statusLed"] = json!("red");
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param("id", "2"))
        .respond_with(ok(json!({ "order": [2], "2": degraded })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param_is_missing("id"))
        .respond_with(ok(json!({
            "order": [1, 2, 3],
            "1": ethernet("WAN 1", 1),
            "2": ethernet("WAN 2", 2),
            "3": ethernet("WAN 3", 3)
        })))
        .mount(&server)
        .await;
    mount_traffic(&server, json!({ "order": [] })).await;

    assert_eq!(wans.refresh(None).await.unwrap().len(), 3);

    let detail = wans.refresh(Some(2)).await.unwrap();
    assert_eq!(detail.len(), 1);
    assert_eq!(detail[0].status, "No Cable Detected");

    let names: Vec<String> = wans.links().iter().map(|l| l.name.clone()).collect();
    assert_eq!(names, vec!["WAN 1", "WAN 2", "WAN 3"]);
    assert_eq!(wans.links()[1].status, "No Cable Detected");
}

#[tokio::test]
async fn test_filtered_failure_leaves_the_list_alone() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param("id", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .respond_with(ok(json!({ "order": [1, 2], "1": ethernet("WAN 1", 1), "2": ethernet("WAN 2", 2) })))
        .mount(&server)
        .await;
    mount_traffic(&server, json!({ "order": [] })).await;

    wans.refresh(None).await.unwrap();
    assert!(wans.refresh(Some(1)).await.is_err());
    assert_eq!(wans.links().len(), 2);
}

#[tokio::test]
async fn test_id_zero_means_every_wan() {
    let (server, wans) = setup().await;

    Mock::given(method("GET"))
        .and(path(paths::WAN_CONNECTION))
        .and(query_param_is_missing("id"))
        .respond_with(ok(json!({ "order": [1, 2], "1": ethernet("WAN 1", 1), "2": ethernet("WAN 2", 2) })))
        .expect(1)
        .mount(&server)
        .await;
    mount_traffic(
        &server,
        json!({
            "order": [1, 2], "unit": "kbps",
            "1": { "overall": { "download": 111, "upload": 11 } },
            "2": { "overall": { "download": 222, "upload": 22 } }
        }),
    )
    .await;

    let links = wans.refresh(Some(0)).await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!((links[0].download, links[1].download), (111, 222));

    wans.merge_traffic(Some(0)).await.unwrap();
    assert_eq!(wans.links()[1].upload, 22);
}
