use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use vf_dfcx_core::config::SyncConfig;
use vf_dfcx_core::contract::MockAgentClient;
use vf_dfcx_core::project::{load_project, VfProject};
use vf_dfcx_core::remote::{EntityType, Intent, IntentParameter, Page, Part};
use vf_dfcx_core::synchronise::{synchronise, SyncError};

const AGENT: &str = "projects/pizza/locations/us-central1/agents/bot";

fn pizza_project() -> VfProject {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/pizza.vf");
    load_project(path).expect("fixture project should load")
}

/// Echoes create requests back with a resource name derived from the display name.
fn echo_creates(client: &mut MockAgentClient) {
    client.expect_create_entity_type().returning(|req| {
        Ok(EntityType {
            name: Some(format!("{AGENT}/entityTypes/{}", req.display_name)),
            ..req.clone()
        })
    });
    client.expect_create_page().returning(|flow, req| {
        Ok(Page {
            name: Some(format!("{flow}/pages/{}", req.display_name)),
            ..req.clone()
        })
    });
}

fn record_intents(client: &mut MockAgentClient) -> Arc<Mutex<Vec<Intent>>> {
    let created = Arc::new(Mutex::new(Vec::new()));
    let sink = created.clone();
    client.expect_create_intent().returning(move |req| {
        sink.lock().unwrap().push(req.clone());
        Ok(Intent {
            name: Some(format!("{AGENT}/intents/{}", req.display_name)),
            ..req.clone()
        })
    });
    created
}

#[tokio::test]
async fn test_fresh_agent_receives_every_entity_and_intent() {
    let project = pizza_project();
    let mut client = MockAgentClient::new();
    client.expect_list_intents().return_once(|| Ok(vec![]));
    client.expect_list_entity_types().return_once(|| Ok(vec![]));
    client.expect_list_pages().never();
    echo_creates(&mut client);
    let intents = record_intents(&mut client);

    let report = synchronise(&project, &client, &SyncConfig::new(AGENT))
        .await
        .expect("synchronise should succeed");

    assert_eq!(report.entity_types.created.len(), 2);
    assert!(report.entity_types.skipped.is_empty());
    assert_eq!(report.intents.created.len(), 2, "VF.HELP must not be uploaded");
    assert!(report.pages.is_none());

    let intents = intents.lock().unwrap();
    let order = intents
        .iter()
        .find(|i| i.display_name == "order_pizza")
        .expect("order_pizza uploaded");
    assert_eq!(
        order.labels,
        BTreeMap::from([("vf_intent_id".to_string(), "ord1".to_string())])
    );
    assert_eq!(
        order.parameters,
        vec![
            IntentParameter {
                id: "size".into(),
                entity_type: format!("{AGENT}/entityTypes/size__sz1-vf"),
                is_list: false,
            },
            IntentParameter {
                id: "topping".into(),
                entity_type: format!("{AGENT}/entityTypes/topping__tp2-vf"),
                is_list: false,
            },
        ]
    );
    assert_eq!(
        order.training_phrases[0].parts,
        vec![
            Part::text("i want a "),
            Part::parameter("size", "small"),
            Part::text(" pizza with "),
            Part::parameter("topping", "pepperoni"),
        ]
    );
    assert_eq!(
        order.training_phrases[1].parts,
        vec![Part::parameter("size", "small"), Part::text(" please")]
    );
    assert_eq!(order.training_phrases[2].parts, vec![Part::text("order a pizza")]);
}

#[tokio::test]
async fn test_existing_records_are_skipped_and_reused() {
    let project = pizza_project();
    let mut client = MockAgentClient::new();
    client.expect_list_entity_types().return_once(|| {
        Ok(vec![
            EntityType {
                name: Some(format!("{AGENT}/entityTypes/existing-size")),
                display_name: "size__sz1-vf".into(),
                ..Default::default()
            },
            EntityType {
                name: Some(format!("{AGENT}/entityTypes/hand-made")),
                display_name: "colour".into(),
                ..Default::default()
            },
        ])
    });
    client.expect_list_intents().return_once(|| {
        Ok(vec![Intent {
            name: Some(format!("{AGENT}/intents/42")),
            display_name: "track_order".into(),
            labels: BTreeMap::from([("vf_intent_id".to_string(), "trk2".to_string())]),
            ..Default::default()
        }])
    });
    client
        .expect_create_entity_type()
        .times(1)
        .returning(|req| {
            assert_eq!(req.display_name, "topping__tp2-vf");
            Ok(EntityType {
                name: Some(format!("{AGENT}/entityTypes/new-topping")),
                ..req.clone()
            })
        });
    let intents = record_intents(&mut client);

    let report = synchronise(&project, &client, &SyncConfig::new(AGENT))
        .await
        .expect("synchronise should succeed");

    assert_eq!(report.entity_types.skipped, vec!["size".to_string()]);
    assert_eq!(report.entity_types.created.len(), 1);
    assert_eq!(report.intents.skipped, vec!["track_order".to_string()]);

    let intents = intents.lock().unwrap();
    assert_eq!(intents.len(), 1);
    let entity_types: Vec<_> = intents[0]
        .parameters
        .iter()
        .map(|p| p.entity_type.as_str())
        .collect();
    assert_eq!(
        entity_types,
        vec![
            format!("{AGENT}/entityTypes/existing-size"),
            format!("{AGENT}/entityTypes/new-topping"),
        ]
    );
}

#[tokio::test]
async fn test_pages_created_for_missing_sub_topics() {
    let project = pizza_project();
    let mut config = SyncConfig::new(AGENT);
    config.upload_pages = true;
    let start_flow = format!("{AGENT}/flows/00000000-0000-0000-0000-000000000000");

    let mut client = MockAgentClient::new();
    client.expect_list_intents().return_once(|| Ok(vec![]));
    client.expect_list_entity_types().return_once(|| Ok(vec![]));
    let expected_flow = start_flow.clone();
    client
        .expect_list_pages()
        .withf(move |flow| flow == expected_flow)
        .return_once(|_| {
            Ok(vec![Page {
                name: Some("p/1".into()),
                display_name: "Delivery__dlv-vf".into(),
            }])
        });
    echo_creates(&mut client);
    record_intents(&mut client);

    let report = synchronise(&project, &client, &config)
        .await
        .expect("synchronise should succeed");

    let pages = report.pages.expect("pages were requested");
    assert_eq!(pages.skipped, vec!["Delivery".to_string()]);
    assert_eq!(pages.created.len(), 1);
    assert_eq!(pages.created[0].local_id, "pay");
    assert_eq!(pages.created[0].display_name, "Payment__pay-vf");
    assert_eq!(
        pages.created[0].remote_name,
        format!("{start_flow}/pages/Payment__pay-vf")
    );
}

#[tokio::test]
async fn test_failed_create_aborts_the_run() {
    let project = pizza_project();
    let mut client = MockAgentClient::new();
    client.expect_list_intents().return_once(|| Ok(vec![]));
    client.expect_list_entity_types().return_once(|| Ok(vec![]));
    echo_creates(&mut client);
    client
        .expect_create_intent()
        .returning(|_| Err("quota exceeded".into()));

    let err = synchronise(&project, &client, &SyncConfig::new(AGENT))
        .await
        .expect_err("a failing create must fail the run");

    match err {
        SyncError::Create { collection, .. } => assert_eq!(collection, "intent"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_listing_creates_nothing() {
    let project = pizza_project();
    let mut client = MockAgentClient::new();
    client
        .expect_list_intents()
        .return_once(|| Err("permission denied".into()));
    client.expect_list_entity_types().returning(|| Ok(vec![]));
    client.expect_create_entity_type().never();
    client.expect_create_intent().never();

    let err = synchronise(&project, &client, &SyncConfig::new(AGENT))
        .await
        .expect_err("listing failure must fail the run");

    assert!(matches!(err, SyncError::List { collection: "intents", .. }));
    assert!(err.to_string().contains("permission denied"));
}

#[tokio::test]
async fn test_entity_without_resource_name_is_an_error() {
    let project = pizza_project();
    let mut client = MockAgentClient::new();
    client.expect_list_intents().return_once(|| Ok(vec![]));
    client.expect_list_entity_types().return_once(|| Ok(vec![]));
    client
        .expect_create_entity_type()
        .returning(|req| Ok(req.clone()));
    client.expect_create_intent().never();

    let err = synchronise(&project, &client, &SyncConfig::new(AGENT))
        .await
        .expect_err("nameless create response must fail");

    assert!(matches!(err, SyncError::MissingName { .. }));
}
