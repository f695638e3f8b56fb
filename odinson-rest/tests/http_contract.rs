//! The HTTP client against an in-process stand-in for the Odinson REST API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use odinson_doc::{Document, Field, Sentence};
use odinson_rest::{
    ClientConfig, HttpOdinsonClient, OdinsonError, PatternQuery, Results, RuleFreqRequest,
    ScoreDoc, SearchBackend,
};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct FakeIndex {
    docs: Arc<Mutex<HashMap<String, Document>>>,
    search_params: Arc<Mutex<Vec<HashMap<String, String>>>>,
    update_routes: Arc<Mutex<Vec<String>>>,
}

const PAGE_SIZE: usize = 2;

fn corpus_hits() -> Vec<ScoreDoc> {
    (0..5u64)
        .map(|i| ScoreDoc {
            sentence_id: 100 + i,
            score: 10.0 - i as f32,
            document_id: "doc-a".to_string(),
            sentence_index: i as usize,
            words: vec!["we".into(), "ate".into(), "pie".into()],
            matches: vec![],
        })
        .collect()
}

async fn execute_pattern(
    State(index): State<FakeIndex>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Results> {
    index.search_params.lock().unwrap().push(params.clone());
    let hits = corpus_hits();
    let start = params
        .get("prevDoc")
        .and_then(|d| d.parse::<u64>().ok())
        .and_then(|d| hits.iter().position(|h| h.sentence_id == d))
        .map_or(0, |i| i + 1);
    let end = (start + PAGE_SIZE).min(hits.len());
    Json(Results {
        odinson_query: params.get("odinsonQuery").cloned().unwrap_or_default(),
        metadata_query: params.get("metadataQuery").cloned(),
        duration: 0.002,
        total_hits: hits.len() as u64,
        score_docs: hits[start..end].to_vec(),
    })
}

async fn index_document(
    State(index): State<FakeIndex>,
    Path(max_tokens): Path<i64>,
    Json(doc): Json<Document>,
) -> StatusCode {
    if max_tokens == 0 {
        return StatusCode::BAD_REQUEST;
    }
    index.docs.lock().unwrap().insert(doc.id().to_string(), doc);
    StatusCode::OK
}

async fn update_capped(
    State(index): State<FakeIndex>,
    Path(max_tokens): Path<i64>,
    Json(doc): Json<Document>,
) -> StatusCode {
    index.update_routes.lock().unwrap().push(format!("capped:{max_tokens}"));
    index.docs.lock().unwrap().insert(doc.id().to_string(), doc);
    StatusCode::OK
}

async fn update_by_id(
    State(index): State<FakeIndex>,
    Path(id): Path<String>,
    Json(doc): Json<Document>,
) -> StatusCode {
    index.update_routes.lock().unwrap().push(format!("id:{id}"));
    index.docs.lock().unwrap().insert(doc.id().to_string(), doc);
    StatusCode::OK
}

async fn delete_document(State(index): State<FakeIndex>, Path(id): Path<String>) -> StatusCode {
    match index.docs.lock().unwrap().remove(&id) {
        Some(_) => StatusCode::OK,
        None => StatusCode::NOT_FOUND,
    }
}

async fn get_document(
    State(index): State<FakeIndex>,
    Path(id): Path<String>,
) -> Result<Json<Document>, StatusCode> {
    index.docs.lock().unwrap().get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn validate_strict(Json(doc): Json<Value>) -> impl IntoResponse {
    if doc["metadata"].as_array().is_some_and(|m| m.is_empty()) {
        let body = json!({"errors": ["document has no metadata"]});
        return (StatusCode::BAD_REQUEST, Json(body));
    }
    (StatusCode::OK, Json(json!({})))
}

async fn numdocs(State(index): State<FakeIndex>) -> Json<u64> {
    let docs = index.docs.lock().unwrap();
    Json(docs.values().map(|d| d.sentences().len() as u64).sum())
}

async fn rule_freq(Json(request): Json<Value>) -> Json<Value> {
    assert_eq!(request["order"], "alpha");
    Json(json!([{"term": "eat-rule", "frequency": 3.0}]))
}

async fn spawn_server() -> (String, FakeIndex, tokio::task::JoinHandle<()>) {
    let index = FakeIndex::default();
    let app = Router::new()
        .route("/api/execute/pattern", get(execute_pattern))
        .route("/api/index/document/maxTokensPerSentence/{max}", post(index_document))
        .route("/api/update/document/maxTokensPerSentence/{max}", post(update_capped))
        .route("/api/update/document/{id}", post(update_by_id))
        .route("/api/delete/document/{id}", delete(delete_document))
        .route("/api/document/{id}", get(get_document))
        .route("/api/validate/strict", post(validate_strict))
        .route("/api/numdocs", get(numdocs))
        .route("/api/tags-vocabulary", get(|| async { Json(json!(["NN", "VBD"])) }))
        .route("/api/rule-freq", post(rule_freq))
        .with_state(index.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{addr}"), index, handle)
}

fn sample_doc(id: &str, metadata: Vec<Field>) -> Document {
    let sentence = Sentence::from_fields(vec![Field::tokens(
        "word",
        vec!["We".into(), "ate".into(), "pie".into()],
    )])
    .unwrap();
    Document::new(id, metadata, vec![sentence])
}

#[tokio::test]
async fn search_all_pages_through_server() {
    let (base, index, handle) = spawn_server().await;
    let client = HttpOdinsonClient::from_address(&base).unwrap();

    let query = PatternQuery::new("[lemma=eat] []").with_metadata_query("year > 2000");
    let hits = client.search_all(query).collect_all().await;
    let ids: Vec<u64> = hits.iter().map(|h| h.sentence_id).collect();
    assert_eq!(ids, vec![100, 101, 102, 103, 104]);

    let params = index.search_params.lock().unwrap().clone();
    assert_eq!(params.len(), 3);
    assert!(!params[0].contains_key("prevDoc"));
    assert!(!params[0].contains_key("commit"));
    assert_eq!(params[0]["metadataQuery"], "year > 2000");
    assert_eq!(params[1]["prevDoc"], "101");
    assert_eq!(params[1]["prevScore"], "9");
    assert_eq!(params[2]["prevDoc"], "103");

    handle.abort();
}

#[tokio::test]
async fn index_retrieve_and_delete_document() {
    let (base, _index, handle) = spawn_server().await;
    let client = HttpOdinsonClient::from_address(&base).unwrap();

    let doc = sample_doc("doc/1", vec![Field::string("title", "Pie")]);
    client.index(&doc, None).await.unwrap();
    assert_eq!(client.numdocs().await.unwrap(), 1);

    let fetched = client.document("doc/1").await.unwrap();
    assert_eq!(fetched, doc);

    client.delete("doc/1").await.unwrap();
    assert_eq!(client.numdocs().await.unwrap(), 0);

    let err = client.delete("doc/1").await.unwrap_err();
    assert!(matches!(err, OdinsonError::RemoteRejected { status: 404, .. }));

    handle.abort();
}

#[tokio::test]
async fn update_uses_configured_token_cap() {
    let (base, index, handle) = spawn_server().await;
    let doc = sample_doc("doc-7", vec![]);

    let uncapped = HttpOdinsonClient::from_address(&base).unwrap();
    uncapped.update(&doc, None).await.unwrap();
    uncapped.update(&doc, Some(40)).await.unwrap();

    let config = ClientConfig::builder().address(base.as_str()).max_tokens_per_sentence(100);
    let capped = HttpOdinsonClient::new(config.build().unwrap()).unwrap();
    capped.update(&doc, None).await.unwrap();
    capped.update(&doc, Some(40)).await.unwrap();

    let routes = index.update_routes.lock().unwrap().clone();
    assert_eq!(routes, vec!["id:doc-7", "capped:40", "capped:100", "capped:40"]);

    handle.abort();
}

#[tokio::test]
async fn rejected_index_request_is_surfaced() {
    let (base, _index, handle) = spawn_server().await;
    let client = HttpOdinsonClient::from_address(&base).unwrap();

    // an empty error body still yields a rejection, with no messages
    let err = client.index(&sample_doc("d", vec![]), Some(0)).await.unwrap_err();
    match err {
        OdinsonError::RemoteRejected { status, errors } => {
            assert_eq!(status, 400);
            assert!(errors.is_empty(), "{errors:?}");
        }
        other => panic!("unexpected error: {other}"),
    }

    handle.abort();
}

#[tokio::test]
async fn validation_errors_are_parsed() {
    let (base, _index, handle) = spawn_server().await;
    let client = HttpOdinsonClient::from_address(&base).unwrap();

    client.validate(&sample_doc("ok", vec![Field::number("year", 2001.0)]), true).await.unwrap();

    match client.validate(&sample_doc("bad", vec![]), true).await.unwrap_err() {
        OdinsonError::RemoteRejected { status, errors } => {
            assert_eq!(status, 400);
            assert_eq!(errors, vec!["document has no metadata"]);
        }
        other => panic!("unexpected error: {other}"),
    }

    handle.abort();
}

#[tokio::test]
async fn statistics_endpoints_decode() {
    let (base, _index, handle) = spawn_server().await;
    let client = HttpOdinsonClient::from_address(&base).unwrap();

    assert_eq!(client.tags_vocabulary().await.unwrap(), vec!["NN", "VBD"]);

    let mut request = RuleFreqRequest::new("rules: []");
    request.order = odinson_rest::FreqOrder::Alpha;
    let stats = client.rule_freq(&request).await.unwrap();
    assert_eq!(stats[0].term, "eat-rule");
    assert!(stats[0].group.is_none());

    handle.abort();
}

#[tokio::test]
async fn unreachable_server_degrades_search_but_not_ingest() {
    // bind then drop to obtain a port with nothing listening
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpOdinsonClient::from_address(&format!("http://{addr}")).unwrap();
    let query = PatternQuery::new("[lemma=pie]");

    let page = client.search(&query, None).await;
    assert_eq!(page.total_hits, 0);
    assert!(page.score_docs.is_empty());
    assert_eq!(page.odinson_query, "[lemma=pie]");

    assert!(matches!(
        client.try_search(&query, None).await,
        Err(OdinsonError::RemoteUnavailable { .. })
    ));
    assert!(matches!(client.delete("x").await, Err(OdinsonError::RemoteUnavailable { .. })));

    let mut pager = client.search_all(query);
    assert!(pager.next().await.is_none());
    assert_eq!(pager.pages_fetched(), 1);
}
