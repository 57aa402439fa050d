mod common;

use common::{client, results, row, CannedExecutor};
use ldmview::LdmError;
use ldmview::model::{UNKNOWN, UNKNOWN_ATTRIBUTE, UNKNOWN_CLASS};

const PERSON: &str = "http://example.org/ldm/Class/Person";

fn class_rows(n: usize) -> Vec<ldmview::sparql::Binding> {
    (0..n)
        .map(|i| {
            let uri = format!("http://example.org/ldm/Class/C{i:02}");
            let name = format!("C{i:02}");
            row(&[("class", uri.as_str()), ("nameContent", name.as_str())])
        })
        .collect()
}

#[tokio::test]
async fn class_list_is_capped_and_keeps_store_order() {
    let executor = CannedExecutor::new(vec![results(&["class", "nameContent"], class_rows(25))]);
    let classes = client(&executor).list_classes().await.expect("list ok");
    assert_eq!(classes.len(), 20, "at most twenty classes");
    assert_eq!(classes[0].uri, "http://example.org/ldm/Class/C00");
    assert_eq!(classes[19].uri, "http://example.org/ldm/Class/C19");
    assert!(classes.iter().all(|c| c.attribute_count == 0), "counts are not computed for the list");
}

#[tokio::test]
async fn class_label_falls_back_through_name_path_plural() {
    let rows = vec![
        row(&[("class", "http://example.org/a"), ("modelPath", "ldm/a"), ("plural", "As")]),
        row(&[("class", "http://example.org/b"), ("nameContent", ""), ("plural", "Bs")]),
        row(&[("class", "http://example.org/c")]),
    ];
    let executor = CannedExecutor::new(vec![results(&["class"], rows)]);
    let classes = client(&executor).list_classes().await.expect("list ok");
    let labels: Vec<_> = classes.iter().map(|c| c.label.as_deref().unwrap()).collect();
    assert_eq!(labels, vec!["ldm/a", "Bs", UNKNOWN_CLASS]);
}

#[tokio::test]
async fn empty_store_gives_empty_list() {
    let executor = CannedExecutor::new(vec![]);
    let classes = client(&executor).list_classes().await.expect("list ok");
    assert!(classes.is_empty());
}

#[tokio::test]
async fn class_details_collects_attributes() {
    let class = results(
        &["class", "nameContent", "oneLinerContent"],
        vec![row(&[("class", PERSON), ("nameContent", "Person"), ("oneLinerContent", "A human being")])],
    );
    let attributes = results(
        &["attr", "nameContent", "dataType", "isOptional", "cardinality"],
        vec![
            row(&[
                ("attr", "http://example.org/ldm/Attribute/name"),
                ("nameContent", "name"),
                ("dataType", "string"),
                ("isOptional", "false"),
                ("cardinality", "1..1"),
            ]),
            row(&[("attr", "http://example.org/ldm/Attribute/nick")]),
            // repeated by a second data type row
            row(&[("attr", "http://example.org/ldm/Attribute/name"), ("dataType", "text")]),
        ],
    );
    let executor = CannedExecutor::new(vec![class, attributes]);
    let detail = client(&executor).class_details(PERSON).await.expect("detail ok");

    assert_eq!(detail.class.label.as_deref(), Some("Person"));
    assert_eq!(detail.class.comment.as_deref(), Some("A human being"));
    assert_eq!(detail.class.attribute_count, 2, "attributes deduplicated by IRI");
    assert_eq!(detail.instances, 0);

    let name = &detail.attributes[0];
    assert_eq!(name.domain.as_deref(), Some(PERSON));
    assert_eq!(name.range.as_deref(), Some("string"), "first row wins");
    assert_eq!(name.is_optional, Some(false));
    assert_eq!(name.cardinality.as_deref(), Some("1..1"));

    let nick = &detail.attributes[1];
    assert_eq!(nick.label.as_deref(), Some(UNKNOWN_ATTRIBUTE));
    assert_eq!(nick.range.as_deref(), Some(UNKNOWN));
    assert_eq!(nick.is_optional, None);

    let queries = executor.queries();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.contains(&format!("<{PERSON}>"))), "class IRI embedded in both queries");
}

#[tokio::test]
async fn missing_class_names_the_uri_and_skips_attributes() {
    let executor = CannedExecutor::new(vec![results(&["class"], vec![])]);
    let err = client(&executor).class_details(PERSON).await.unwrap_err();
    assert!(matches!(err, LdmError::NotFound { .. }));
    assert_eq!(err.to_string(), format!("Class not found: {PERSON}"));
    assert_eq!(err.status_code(), 404);
    assert_eq!(executor.queries().len(), 1, "attribute query not issued");
}

#[tokio::test]
async fn failing_attribute_query_fails_the_detail() {
    let class = results(&["class", "nameContent"], vec![row(&[("class", PERSON), ("nameContent", "Person")])]);
    let executor = CannedExecutor::answering(vec![
        Ok(class),
        Err(LdmError::Upstream { status: 503, reason: "Service Unavailable".into() }),
    ]);
    let err = client(&executor).class_details(PERSON).await.unwrap_err();
    assert!(matches!(err, LdmError::Upstream { status: 503, .. }));
    assert_eq!(executor.queries().len(), 2, "class lookup then attributes");
}

#[tokio::test]
async fn injected_class_iri_is_rejected_before_querying() {
    let executor = CannedExecutor::new(vec![]);
    let err = client(&executor)
        .class_details("http://x.org/a> } DROP ALL; {")
        .await
        .unwrap_err();
    assert!(matches!(err, LdmError::InvalidIdentifier(_)));
    assert!(executor.queries().is_empty(), "nothing reached the store");
}

#[tokio::test]
async fn store_failure_propagates() {
    let executor = CannedExecutor::failing(LdmError::Upstream { status: 503, reason: "Service Unavailable".into() });
    let err = client(&executor).list_classes().await.unwrap_err();
    assert_eq!(err.to_string(), "GraphDB error: Service Unavailable");
    assert_eq!(err.status_code(), 503);
}
