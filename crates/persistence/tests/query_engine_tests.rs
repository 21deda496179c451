//! Query engine tests: predicates, sorting and pagination through the
//! repository surface.

mod common;

use common::*;

use tenantry_persistence::core::Repository;
use tenantry_persistence::error::{StorageError, ValidationError};
use tenantry_persistence::query::{PageRequest, Predicate, Sort, SortDirective};
use tenantry_persistence::AccessInterceptor;

async fn seed(notes: &AccessInterceptor<Note>, items: &[(&str, &str, i64)]) -> Vec<Note> {
    let mut saved = Vec::new();
    for (title, status, priority) in items {
        let note = Note::new(*title)
            .with_status(*status)
            .with_priority(*priority);
        saved.push(notes.save(&alice(), note).await.unwrap());
    }
    saved
}

fn titles(notes: &[Note]) -> Vec<&str> {
    notes.iter().map(|n| n.title.as_str()).collect()
}

// ============================================================================
// Predicate Tests
// ============================================================================

#[tokio::test]
async fn test_equality_and_set_membership() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[("a", "open", 1), ("b", "done", 2), ("c", "archived", 3)],
    )
    .await;

    let open = notes
        .list_by_predicate(&alice(), &Predicate::eq("status", "open"))
        .await
        .unwrap();
    assert_eq!(titles(&open), vec!["a"]);

    let active = Predicate::in_list("status", ["open", "done"]);
    assert_eq!(notes.count(&alice(), &active).await.unwrap(), 2);

    let none = Predicate::in_list("status", Vec::<&str>::new());
    assert_eq!(notes.count(&alice(), &none).await.unwrap(), 0);
}

#[tokio::test]
async fn test_contains_is_case_insensitive() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[
            ("Quarterly INVOICE", "open", 0),
            ("invoice draft", "open", 0),
            ("Meeting notes", "open", 0),
        ],
    )
    .await;

    let found = notes
        .count(&alice(), &Predicate::contains("title", "Invoice"))
        .await
        .unwrap();
    assert_eq!(found, 2);
}

#[tokio::test]
async fn test_contains_folds_non_ascii_case() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[("ÄRGER Bericht", "open", 0), ("Ärger im Büro", "open", 0), ("Straße", "open", 0)],
    )
    .await;

    for needle in ["ärger", "ÄRGER", "Ärger"] {
        let found = notes
            .count(&alice(), &Predicate::contains("title", needle))
            .await
            .unwrap();
        assert_eq!(found, 2, "needle {}", needle);
    }
    let found = notes
        .count(&alice(), &Predicate::contains("title", "BÜRO"))
        .await
        .unwrap();
    assert_eq!(found, 1);
}

#[tokio::test]
async fn test_contains_treats_wildcards_literally() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(&notes, &[("100% done", "open", 0), ("1000 items", "open", 0)]).await;

    let found = notes
        .list_by_predicate(&alice(), &Predicate::contains("title", "0%"))
        .await
        .unwrap();
    assert_eq!(titles(&found), vec!["100% done"]);

    let underscore = notes
        .count(&alice(), &Predicate::contains("title", "_"))
        .await
        .unwrap();
    assert_eq!(underscore, 0);
}

#[tokio::test]
async fn test_comparisons_and_composition() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[
            ("low", "open", 1),
            ("mid", "open", 5),
            ("high", "done", 9),
        ],
    )
    .await;

    let ge5 = Predicate::ge("priority", 5);
    assert_eq!(notes.count(&alice(), &ge5).await.unwrap(), 2);

    let lt5_or_done = Predicate::lt("priority", 5).or(Predicate::eq("status", "done"));
    let mut found = titles(&notes.list_by_predicate(&alice(), &lt5_or_done).await.unwrap())
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    found.sort();
    assert_eq!(found, vec!["high", "low"]);

    let not_open = Predicate::eq("status", "open").not();
    assert_eq!(notes.count(&alice(), &not_open).await.unwrap(), 1);

    let ne = Predicate::ne("status", "open").and(Predicate::le("priority", 9));
    assert_eq!(notes.count(&alice(), &ne).await.unwrap(), 1);
}

#[tokio::test]
async fn test_metadata_fields_are_queryable() {
    let store = create_store();
    let notes = store.repository::<Note>();

    notes.save(&alice(), Note::new("signed")).await.unwrap();
    let anonymous_writer = user("tenant-a", "");
    notes.save(&anonymous_writer, Note::new("unsigned")).await.unwrap();

    let by_alice = notes
        .list_by_predicate(&alice(), &Predicate::eq("createdBy", "alice"))
        .await
        .unwrap();
    assert_eq!(titles(&by_alice), vec!["signed"]);

    let unsigned = notes
        .list_by_predicate(&alice(), &Predicate::is_null("createdBy"))
        .await
        .unwrap();
    assert_eq!(titles(&unsigned), vec!["unsigned"]);
}

#[tokio::test]
async fn test_unknown_predicate_field_is_an_error() {
    let store = create_store();
    let notes = store.repository::<Note>();

    let err = notes
        .count(&alice(), &Predicate::eq("color", "red"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorageError::Validation(ValidationError::UnknownField { ref field, .. }) if field == "color"
    ));
    assert!(!err.is_hard_failure());
}

// ============================================================================
// Sort Tests
// ============================================================================

#[tokio::test]
async fn test_default_order_is_newest_first() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(&notes, &[("first", "open", 0), ("second", "open", 0), ("third", "open", 0)]).await;

    let listed = notes
        .list_sorted(&alice(), &Predicate::True, &Sort::unsorted())
        .await
        .unwrap();
    assert_eq!(titles(&listed), vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_unknown_sort_field_matches_default_order() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[("b", "open", 2), ("a", "open", 3), ("c", "open", 1)],
    )
    .await;

    let default = notes
        .list_sorted(&alice(), &Predicate::True, &Sort::unsorted())
        .await
        .unwrap();

    for bad in ["color", "-color", "title,color", " ", "data.title"] {
        let listed = notes
            .list_sorted(&alice(), &Predicate::True, &Sort::parse(bad))
            .await
            .unwrap();
        assert_eq!(titles(&listed), titles(&default), "sort {:?}", bad);
    }
}

#[tokio::test]
async fn test_multi_key_sort() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[
            ("beta", "open", 1),
            ("alpha", "open", 2),
            ("gamma", "open", 2),
            ("delta", "open", 1),
        ],
    )
    .await;

    let sort = Sort::by(SortDirective::desc("priority")).then(SortDirective::asc("title"));
    let listed = notes
        .list_sorted(&alice(), &Predicate::True, &sort)
        .await
        .unwrap();
    assert_eq!(titles(&listed), vec!["alpha", "gamma", "beta", "delta"]);

    let parsed = notes
        .list_sorted(&alice(), &Predicate::True, &Sort::parse("-priority,title"))
        .await
        .unwrap();
    assert_eq!(titles(&parsed), titles(&listed));
}

// ============================================================================
// Pagination Tests
// ============================================================================

#[tokio::test]
async fn test_page_window_and_total() {
    let store = create_store();
    let notes = store.repository::<Note>();
    for i in 0..25 {
        notes
            .save(&alice(), Note::new(format!("note-{:02}", i)))
            .await
            .unwrap();
    }
    notes.save(&bob(), Note::new("foreign")).await.unwrap();

    let sort = Sort::parse("title");
    let first = notes
        .page(&alice(), &Predicate::True, PageRequest::new(1, 10), &sort)
        .await
        .unwrap();
    assert_eq!(first.total, 25);
    assert_eq!(first.total_pages(), 3);
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.items[0].title, "note-00");
    assert!(first.has_next());

    let last = notes
        .page(&alice(), &Predicate::True, PageRequest::new(3, 10), &sort)
        .await
        .unwrap();
    assert_eq!(last.items.len(), 5);
    assert_eq!(last.items[0].title, "note-20");
    assert!(!last.has_next());

    let beyond = notes
        .page(&alice(), &Predicate::True, PageRequest::new(9, 10), &sort)
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total, 25);
}

#[tokio::test]
async fn test_page_total_uses_the_same_predicate() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(
        &notes,
        &[("a", "open", 0), ("b", "done", 0), ("c", "open", 0)],
    )
    .await;

    let page = notes
        .page(
            &alice(),
            &Predicate::eq("status", "open"),
            PageRequest::new(1, 1),
            &Sort::unsorted(),
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn test_page_request_is_clamped() {
    let store = create_store();
    let notes = store.repository::<Note>();
    seed(&notes, &[("a", "open", 0)]).await;

    let page = notes
        .page(&alice(), &Predicate::True, PageRequest::new(0, 0), &Sort::unsorted())
        .await
        .unwrap();
    assert_eq!(page.page_number, 1);
    assert_eq!(page.page_size, 20);
    assert_eq!(page.items.len(), 1);

    let huge = notes
        .page(&alice(), &Predicate::True, PageRequest::new(1, 50_000), &Sort::unsorted())
        .await
        .unwrap();
    assert_eq!(huge.page_size, 1000);
}
