mod common;

use std::sync::Arc;

use common::{MockClient, address_form};
use form_engine::{CacheKey, FetchError, OptionResolver, Refresh, preview_options, settle};
use form_spec::{ApiConfig, HttpMethod, MapOptions, ValueEnv};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn env(value: Value) -> ValueEnv {
    ValueEnv::try_from(value).expect("object")
}

fn geo_client() -> MockClient {
    MockClient::new()
        .route(
            "/countries",
            json!({ "data": [
                { "code": "US", "name": "United States" },
                { "code": "CA", "name": "Canada" }
            ] }),
        )
        .route("/states?country=US", json!([{ "name": "Ohio" }, { "name": "Texas" }]))
        .route("/states?country=CA", json!([{ "name": "Ontario" }]))
}

fn ids(resolver: &OptionResolver, key: &CacheKey) -> Vec<String> {
    resolver
        .cache()
        .state(key)
        .options
        .into_iter()
        .map(|option| option.id)
        .collect()
}

#[tokio::test]
async fn identical_inputs_fetch_once() {
    let client = Arc::new(geo_client());
    let resolver = OptionResolver::new(client.clone());
    let form = address_form();
    let country = form.field("country").expect("country");

    let Refresh::Fetching(handle) = resolver.refresh_field(country, &ValueEnv::new()) else {
        panic!("first refresh should fetch");
    };
    assert!(matches!(
        resolver.refresh_field(country, &ValueEnv::new()),
        Refresh::Unchanged
    ));
    handle.await.expect("task");
    assert!(matches!(
        resolver.refresh_field(country, &env(json!({ "name": "Ada" }))),
        Refresh::Unchanged
    ));

    assert_eq!(client.count("/countries"), 1);
    assert_eq!(ids(&resolver, &CacheKey::field("country")), vec!["US", "CA"]);
    let state = resolver.cache().state(&CacheKey::field("country"));
    assert!(!state.loading);
    assert_eq!(state.options[0].label, "United States");
    assert_eq!(state.options[0].extra["code"], json!("US"));
}

#[tokio::test]
async fn dependent_list_waits_for_its_dependency() {
    let client = Arc::new(geo_client());
    let resolver = OptionResolver::new(client.clone());
    let form = address_form();
    let state_field = form.field("state").expect("state");

    assert!(matches!(
        resolver.refresh_field(state_field, &ValueEnv::new()),
        Refresh::Cleared
    ));
    assert!(matches!(
        resolver.refresh_field(state_field, &env(json!({ "country": "" }))),
        Refresh::Cleared
    ));
    assert!(client.requests().is_empty());

    let us = env(json!({ "country": { "id": "US", "label": "United States" } }));
    settle(resolver.refresh_field(state_field, &us).into_handle().into_iter().collect()).await;
    assert_eq!(ids(&resolver, &CacheKey::field("state")), vec!["Ohio", "Texas"]);
    assert_eq!(
        client.requests()[0].url,
        "https://geo.example.test/states?country=US"
    );

    // Dropping the dependency empties the list; restoring it fetches again.
    assert!(matches!(
        resolver.refresh_field(state_field, &ValueEnv::new()),
        Refresh::Cleared
    ));
    assert!(ids(&resolver, &CacheKey::field("state")).is_empty());
    settle(resolver.refresh_field(state_field, &us).into_handle().into_iter().collect()).await;
    assert_eq!(client.count("country=US"), 2);
}

#[tokio::test]
async fn superseded_response_is_ignored() {
    let client = Arc::new(geo_client());
    let release_us = client.hold("country=US");
    let resolver = OptionResolver::new(client.clone());
    let form = address_form();
    let state_field = form.field("state").expect("state");

    let slow = resolver
        .refresh_field(state_field, &env(json!({ "country": { "id": "US" } })))
        .into_handle()
        .expect("fetching US");
    let fast = resolver
        .refresh_field(state_field, &env(json!({ "country": { "id": "CA" } })))
        .into_handle()
        .expect("fetching CA");

    fast.await.expect("task");
    assert_eq!(ids(&resolver, &CacheKey::field("state")), vec!["Ontario"]);

    release_us.notify_one();
    slow.await.expect("task");
    assert_eq!(ids(&resolver, &CacheKey::field("state")), vec!["Ontario"]);
    assert!(!resolver.cache().is_loading(&CacheKey::field("state")));
}

#[tokio::test]
async fn failed_request_leaves_empty_list() {
    let client = Arc::new(geo_client());
    let resolver = OptionResolver::new(client.clone());
    let form = address_form();
    let state_field = form.field("state").expect("state");

    let handle = resolver
        .refresh_field(state_field, &env(json!({ "country": { "id": "MX" } })))
        .into_handle()
        .expect("fetching");
    handle.await.expect("task");

    let state = resolver.cache().state(&CacheKey::field("state"));
    assert!(state.options.is_empty());
    assert!(!state.loading);
    // The failed signature is current; only a change retries.
    assert!(matches!(
        resolver.refresh_field(state_field, &env(json!({ "country": { "id": "MX" } }))),
        Refresh::Unchanged
    ));
}

#[tokio::test]
async fn table_cells_resolve_per_row() {
    let client = Arc::new(
        MockClient::new()
            .route(r#""category":"plants""#, json!([{ "sku": "p-1", "title": "Fern" }]))
            .route(r#""category":"hardware""#, json!([{ "sku": "h-1", "title": "Hammer" }])),
    );
    let resolver = OptionResolver::new(client.clone());
    let form = address_form();
    let table = form.field("line_items").expect("table");
    let values = env(json!({ "line_items": [
        { "category": { "id": "plants", "label": "Plants" } },
        {},
        { "category": { "id": "hardware", "label": "Hardware" } }
    ] }));

    let handles = resolver.refresh_table(table, &values);
    assert_eq!(handles.len(), 2);
    settle(handles).await;

    assert_eq!(ids(&resolver, &CacheKey::cell("line_items", "product", 0)), vec!["p-1"]);
    assert!(ids(&resolver, &CacheKey::cell("line_items", "product", 1)).is_empty());
    assert_eq!(ids(&resolver, &CacheKey::cell("line_items", "product", 2)), vec!["h-1"]);

    let requests = client.requests();
    assert!(requests.iter().all(|request| request.method == HttpMethod::Post));
    assert!(requests.iter().all(|request| request.url == "https://shop.example.test/products"));
    assert!(resolver.refresh_table(table, &values).is_empty());
}

#[tokio::test]
async fn editor_preview_reports_failures() {
    let client = MockClient::new().route("/colors", json!({ "items": { "list": ["red", "blue"] } }));
    let mut config = ApiConfig::new("https://api.example.test/colors");
    config.response_path = Some("items.list".into());

    let options = preview_options(&client, &config).await.expect("ok");
    assert_eq!(options.len(), 2);
    assert_eq!((options[1].id.as_str(), options[1].label.as_str()), ("blue", "blue"));

    config.url = "https://api.example.test/missing".into();
    config.map_options = MapOptions {
        id_key: Some("id".into()),
        label_key: None,
    };
    let err = preview_options(&client, &config).await.expect_err("no route");
    assert!(matches!(err, FetchError::Network(_)));
}
