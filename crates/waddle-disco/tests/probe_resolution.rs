//! End-to-end capability resolution over a scripted transport.
//!
//! These tests drive the full path: presence observation, probe
//! launch, hash verification, candidate fallback, abandonment, and the
//! disco#info shortcut once a hash is verified.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jid::Jid;

use waddle_disco::{
    compute_caps_hash, Caps, CapsKey, CapsLookup, DiscoInfo, DiscoItems, DiscoService,
    DiscoTransport, HashAlgorithm, Identity, RequestError,
};

const NODE: &str = "https://waddle.social/caps";

/// Transport double with per-target scripted responses.
///
/// Unscripted requests hang forever, which is exactly what an
/// unresponsive peer looks like to the engine.
#[derive(Default)]
struct ScriptedTransport {
    log: Mutex<Vec<(String, Option<String>)>>,
    responses: Mutex<HashMap<String, VecDeque<Result<DiscoInfo, RequestError>>>>,
}

impl ScriptedTransport {
    fn script(&self, target: &str, result: Result<DiscoInfo, RequestError>) {
        self.responses
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(result);
    }

    fn requests(&self) -> Vec<(String, Option<String>)> {
        self.log.lock().unwrap().clone()
    }

    fn request_count(&self) -> usize {
        self.log.lock().unwrap().len()
    }
}

#[async_trait]
impl DiscoTransport for ScriptedTransport {
    async fn disco_info(&self, to: &Jid, node: Option<&str>) -> Result<DiscoInfo, RequestError> {
        self.log
            .lock()
            .unwrap()
            .push((to.to_string(), node.map(String::from)));

        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&to.to_string())
            .and_then(|queue| queue.pop_front());

        match scripted {
            Some(result) => result,
            None => std::future::pending().await,
        }
    }

    async fn disco_items(&self, to: &Jid, _node: Option<&str>) -> Result<DiscoItems, RequestError> {
        self.log.lock().unwrap().push((to.to_string(), None));
        Err(RequestError::peer("feature-not-implemented"))
    }
}

fn jid(s: &str) -> Jid {
    s.parse().unwrap()
}

fn client_info() -> DiscoInfo {
    DiscoInfo::new(Some(NODE))
        .with_identity(Identity::client("pc", Some("Waddle")))
        .with_feature("http://jabber.org/protocol/caps")
        .with_feature("http://jabber.org/protocol/disco#info")
        .with_feature("urn:xmpp:mam:2")
}

fn wrong_info() -> DiscoInfo {
    DiscoInfo::new(Some(NODE))
        .with_identity(Identity::client("pc", Some("Imposter")))
        .with_feature("http://jabber.org/protocol/disco#info")
}

fn advertisement(ver: &str) -> Caps {
    Caps {
        hash: "sha-1".to_string(),
        node: NODE.to_string(),
        ver: ver.to_string(),
    }
}

fn setup() -> (
    DiscoService<Arc<ScriptedTransport>>,
    Arc<ScriptedTransport>,
    Caps,
    CapsKey,
) {
    let transport = Arc::new(ScriptedTransport::default());
    let service = DiscoService::new(Arc::clone(&transport));
    let ver = compute_caps_hash(&client_info(), HashAlgorithm::Sha1);
    let caps = advertisement(&ver);
    let key = CapsKey::new(HashAlgorithm::Sha1, &ver);
    (service, transport, caps, key)
}

/// Poll until `cond` holds, failing the test after two seconds.
async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn at_most_one_probe_for_many_observers() {
    let (service, transport, caps, key) = setup();

    service.observe(&jid("a@waddle.social/ice"), &caps);
    service.observe(&jid("b@waddle.social/ice"), &caps);
    service.observe(&jid("c@waddle.social/ice"), &caps);

    // Give the probe task a chance to issue its request and prove that
    // the other sightings did not issue theirs.
    wait_until(|| transport.request_count() >= 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(transport.request_count(), 1);
    assert_eq!(
        transport.requests()[0],
        (
            "a@waddle.social/ice".to_string(),
            Some(format!("{NODE}#{}", caps.ver))
        )
    );
    assert!(matches!(service.caps_lookup(&key), CapsLookup::Pending));
}

#[tokio::test]
async fn mismatch_falls_back_to_next_candidate() {
    let (service, transport, caps, key) = setup();
    transport.script("a@waddle.social/ice", Ok(wrong_info()));
    transport.script("b@waddle.social/ice", Ok(client_info()));

    service.observe(&jid("a@waddle.social/ice"), &caps);
    service.observe(&jid("b@waddle.social/ice"), &caps);

    wait_until(|| matches!(service.caps_lookup(&key), CapsLookup::Resolved(_))).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "a@waddle.social/ice");
    assert_eq!(requests[1].0, "b@waddle.social/ice");

    // Both observers are bound to the now-verified hash.
    let resolved = service
        .capabilities_of(&jid("a@waddle.social/ice"))
        .expect("binding should resolve");
    assert!(resolved.has_feature("urn:xmpp:mam:2"));
    assert!(service
        .capabilities_of(&jid("b@waddle.social/ice"))
        .is_some());

    // Resolution is terminal: further sightings trigger nothing.
    service.observe(&jid("d@waddle.social/ice"), &caps);
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn exhausting_candidates_drops_key_and_allows_restart() {
    let (service, transport, caps, key) = setup();
    transport.script(
        "a@waddle.social/ice",
        Err(RequestError::peer("service-unavailable")),
    );

    service.observe(&jid("a@waddle.social/ice"), &caps);
    wait_until(|| matches!(service.caps_lookup(&key), CapsLookup::Unknown)).await;
    assert_eq!(transport.request_count(), 1);

    // A later sighting starts over from zero candidates and succeeds.
    transport.script("a@waddle.social/ice", Ok(client_info()));
    service.observe(&jid("a@waddle.social/ice"), &caps);

    wait_until(|| matches!(service.caps_lookup(&key), CapsLookup::Resolved(_))).await;
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn verified_caps_answer_info_without_network() {
    let (service, transport, caps, key) = setup();
    let from = jid("a@waddle.social/ice");
    transport.script("a@waddle.social/ice", Ok(client_info()));

    service.observe(&from, &caps);
    wait_until(|| matches!(service.caps_lookup(&key), CapsLookup::Resolved(_))).await;
    assert_eq!(transport.request_count(), 1);

    // A root info query is answered from the verified binding.
    let info = service.info(&from, None, false).await.unwrap();
    assert!(info.has_feature("urn:xmpp:mam:2"));
    assert_eq!(transport.request_count(), 1);

    // Forcing a refresh still reaches the network.
    transport.script("a@waddle.social/ice", Ok(client_info()));
    service.info(&from, None, true).await.unwrap();
    assert_eq!(transport.request_count(), 2);
}

#[tokio::test]
async fn stalled_probe_is_taken_over_by_new_sighting() {
    let transport = Arc::new(ScriptedTransport::default());
    let service = DiscoService::with_config(
        Arc::clone(&transport),
        waddle_disco::DiscoConfig {
            probe_timeout: Duration::ZERO,
        },
    );
    let ver = compute_caps_hash(&client_info(), HashAlgorithm::Sha1);
    let caps = advertisement(&ver);
    let key = CapsKey::new(HashAlgorithm::Sha1, &ver);

    // The first target never answers; with a zero timeout the second
    // sighting immediately replaces the stalled attempt.
    transport.script("b@waddle.social/ice", Ok(client_info()));

    service.observe(&jid("a@waddle.social/ice"), &caps);
    wait_until(|| transport.request_count() >= 1).await;

    service.observe(&jid("b@waddle.social/ice"), &caps);
    wait_until(|| matches!(service.caps_lookup(&key), CapsLookup::Resolved(_))).await;

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "a@waddle.social/ice");
    assert_eq!(requests[1].0, "b@waddle.social/ice");
}
