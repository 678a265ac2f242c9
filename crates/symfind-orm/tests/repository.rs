//! Repository Dispatch Tests
//!
//! These tests drive [`Repository`] against a recording backend and check
//! which backend operation each call ends up in, and with what arguments.
//!
//! **Test Coverage:**
//! - Fast path for plain equality criteria
//! - General path for joins, modifiers, indexing and pass-through criteria
//! - Paging arguments of find_one_by / find_one_like
//! - Count projection
//! - Wildcard option forced by find_like
//! - Error propagation (criteria errors and backend errors)
//!
//! **Fixtures Used:**
//! - backend: recording backend over a Musician / Instrument schema

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rstest::*;
use std::sync::Mutex;
use symfind_core::{
	Association, CriteriaError, EntityDescriptor, EntityMetadata, FieldType, OrderBy, Value,
};
use symfind_orm::{
	Backend, Criteria, EqualityFilter, FindError, MetadataProvider, Projection, Query, Repository,
	RepositorySettings, SearchRequest, SelectableCriteria,
};

#[derive(Debug, thiserror::Error)]
#[error("backend unavailable")]
struct Unavailable;

#[derive(Debug, Clone, PartialEq)]
enum Call {
	FindByEquality {
		filter: EqualityFilter,
		order_by: OrderBy,
		limit: Option<u64>,
		offset: Option<u64>,
	},
	CountByEquality(EqualityFilter),
	Fetch(Query),
	FetchCount(Query),
}

struct RecordingBackend {
	musician: EntityDescriptor,
	instrument: EntityDescriptor,
	rows: Vec<String>,
	fail: bool,
	calls: Mutex<Vec<Call>>,
}

impl RecordingBackend {
	fn returning(mut self, rows: &[&str]) -> Self {
		self.rows = rows.iter().map(|r| r.to_string()).collect();
		self
	}

	fn failing(mut self) -> Self {
		self.fail = true;
		self
	}

	fn record(&self, call: Call) -> Result<(), Unavailable> {
		self.calls.lock().unwrap().push(call);
		if self.fail { Err(Unavailable) } else { Ok(()) }
	}

	fn rows(&self, limit: Option<u64>) -> Vec<String> {
		let limit = limit.map(|l| l as usize).unwrap_or(usize::MAX);
		self.rows.iter().take(limit).cloned().collect()
	}
}

impl MetadataProvider for RecordingBackend {
	fn metadata(&self) -> &dyn EntityMetadata {
		&self.musician
	}

	fn metadata_for(&self, entity: &str) -> Option<&dyn EntityMetadata> {
		match entity {
			"Musician" => Some(&self.musician),
			"Instrument" => Some(&self.instrument),
			_ => None,
		}
	}
}

#[async_trait]
impl Backend for RecordingBackend {
	type Entity = String;
	type Error = Unavailable;

	async fn find_by_equality(
		&self,
		filter: &EqualityFilter,
		order_by: &OrderBy,
		limit: Option<u64>,
		offset: Option<u64>,
	) -> Result<Vec<String>, Unavailable> {
		self.record(Call::FindByEquality {
			filter: filter.clone(),
			order_by: order_by.clone(),
			limit,
			offset,
		})?;
		Ok(self.rows(limit))
	}

	async fn count_by_equality(&self, filter: &EqualityFilter) -> Result<u64, Unavailable> {
		self.record(Call::CountByEquality(filter.clone()))?;
		Ok(self.rows.len() as u64)
	}

	async fn fetch(&self, query: &Query) -> Result<Vec<String>, Unavailable> {
		self.record(Call::Fetch(query.clone()))?;
		Ok(self.rows(query.max_results()))
	}

	async fn fetch_count(&self, query: &Query) -> Result<u64, Unavailable> {
		self.record(Call::FetchCount(query.clone()))?;
		Ok(self.rows.len() as u64)
	}
}

#[fixture]
fn backend() -> RecordingBackend {
	RecordingBackend {
		musician: EntityDescriptor::new("Musician", "musicians")
			.column("id", FieldType::Integer)
			.column("name", FieldType::String)
			.column("city", FieldType::String)
			.association(
				"instruments",
				Association::ManyToMany {
					target: "Instrument".to_string(),
					join_table: "musician_instruments".to_string(),
					source_column: "musician_id".to_string(),
					target_column: "instrument_id".to_string(),
				},
			),
		instrument: EntityDescriptor::new("Instrument", "instruments").column("name", FieldType::String),
		rows: vec!["Mia".to_string(), "Ole".to_string()],
		fail: false,
		calls: Mutex::new(Vec::new()),
	}
}

fn recorded(repository: &Repository<RecordingBackend>) -> Vec<Call> {
	repository.backend().calls.lock().unwrap().clone()
}

/// Test plain equality criteria use the native find
///
/// **Test Intent**: Verify criteria without joins, modifiers, indexing or
/// pass-through criteria are delegated unchanged to find_by_equality
///
/// **Not Intent**: Query compilation
#[rstest]
#[tokio::test]
async fn test_plain_equality_uses_native_find(backend: RecordingBackend) {
	let repository = Repository::new(backend);
	let order_by = OrderBy::new().desc("name");

	let found = repository
		.find_by(
			Criteria::new().term("city", "Berlin").term("id", vec![1, 2]),
			Some(order_by.clone()),
			Some(5),
			Some(10),
		)
		.await
		.unwrap();

	assert_eq!(found, vec!["Mia", "Ole"]);
	let mut expected = EqualityFilter::new();
	expected.push("city", Value::from("Berlin"));
	expected.push("id", Value::from(vec![1, 2]));
	assert_eq!(
		recorded(&repository),
		vec![Call::FindByEquality {
			filter: expected,
			order_by,
			limit: Some(5),
			offset: Some(10),
		}]
	);
}

/// Test advanced criteria are compiled
///
/// **Test Intent**: Verify each advanced feature routes the call through the
/// compiled query
#[rstest]
#[case::join(Criteria::new().term("instruments.name", "piano"), OrderBy::new())]
#[case::modifier(Criteria::new().term("!city", "Berlin"), OrderBy::new())]
#[case::index(Criteria::new().term("city", "Berlin"), OrderBy::new().index("id"))]
#[case::selectable(Criteria::new().selectable(SelectableCriteria::new().max_results(1)), OrderBy::new())]
#[tokio::test]
async fn test_advanced_criteria_are_compiled(
	backend: RecordingBackend,
	#[case] criteria: Criteria,
	#[case] order_by: OrderBy,
) {
	let repository = Repository::new(backend);

	repository.find_by(criteria, Some(order_by), None, None).await.unwrap();

	let calls = recorded(&repository);
	assert_eq!(calls.len(), 1);
	assert!(matches!(&calls[0], Call::Fetch(query) if query.projection() == Projection::Entity));
}

/// Test the fast path can be switched off
///
/// **Test Intent**: Verify RepositorySettings.fast_path = false compiles even plain criteria
#[rstest]
#[tokio::test]
async fn test_fast_path_disabled(backend: RecordingBackend) {
	let repository = Repository::with_settings(backend, RepositorySettings::without_fast_path());

	repository
		.find_by(Criteria::new().term("city", "Berlin"), None, None, None)
		.await
		.unwrap();

	let calls = recorded(&repository);
	match &calls[..] {
		[Call::Fetch(query)] => {
			assert_eq!(
				query.where_condition().map(ToString::to_string).as_deref(),
				Some("main.city = :main_city_0")
			);
			assert_eq!(
				query.parameter("main_city_0").and_then(|p| p.declared_type.clone()),
				Some(FieldType::String)
			);
		}
		other => panic!("unexpected calls {:?}", other),
	}
}

/// Test find_one_by pages to the first row
///
/// **Test Intent**: Verify find_one_by is find_by with limit 1 and offset 0
#[rstest]
#[tokio::test]
async fn test_find_one_by_requests_first_row(backend: RecordingBackend) {
	let repository = Repository::new(backend);

	let found = repository
		.find_one_by(Criteria::new().term("city", "Berlin"), None)
		.await
		.unwrap();

	assert_eq!(found.as_deref(), Some("Mia"));
	assert!(matches!(
		&recorded(&repository)[0],
		Call::FindByEquality { limit: Some(1), offset: Some(0), .. }
	));
}

/// Test count with a join
///
/// **Test Intent**: Verify count compiles to a COUNT(DISTINCT root) projection
/// without grouping
#[rstest]
#[tokio::test]
async fn test_count_with_join(backend: RecordingBackend) {
	let repository = Repository::new(backend);

	let count = repository
		.count(Criteria::new().term("instruments.name", "piano"))
		.await
		.unwrap();

	assert_eq!(count, 2);
	match &recorded(&repository)[..] {
		[Call::FetchCount(query)] => {
			assert_eq!(query.projection(), Projection::CountDistinctRoot);
			assert!(query.group_by().is_empty());
		}
		other => panic!("unexpected calls {:?}", other),
	}
}

/// Test count with plain equality
///
/// **Test Intent**: Verify count delegates plain criteria to count_by_equality
#[rstest]
#[tokio::test]
async fn test_count_plain_equality(backend: RecordingBackend) {
	let repository = Repository::new(backend);

	repository.count(Criteria::new().term("city", "Berlin")).await.unwrap();

	assert!(matches!(&recorded(&repository)[..], [Call::CountByEquality(_)]));
}

/// Test find_like switches on wildcards
///
/// **Test Intent**: Verify a wildcard value compiles to LIKE under find_like
/// even though the criteria carry no options entry
#[rstest]
#[tokio::test]
async fn test_find_like_forces_wildcards(backend: RecordingBackend) {
	let repository = Repository::new(backend);

	repository
		.find_like(Criteria::new().term("name", "M%"), None, None, None)
		.await
		.unwrap();

	match &recorded(&repository)[..] {
		[Call::Fetch(query)] => assert_eq!(
			query.where_condition().map(ToString::to_string).as_deref(),
			Some("main.name LIKE :main_name_0")
		),
		other => panic!("unexpected calls {:?}", other),
	}
}

/// Test find_one_like requires a single row
///
/// **Test Intent**: Verify find_one_like returns the entity only when exactly
/// one row came back
#[rstest]
#[case(&["Mia"], Some("Mia"))]
#[case(&[], None)]
#[tokio::test]
async fn test_find_one_like(
	backend: RecordingBackend,
	#[case] rows: &[&str],
	#[case] expected: Option<&str>,
) {
	let repository = Repository::new(backend.returning(rows));

	let found = repository
		.find_one_like(Criteria::new().term("name", "M%"))
		.await
		.unwrap();

	assert_eq!(found.as_deref(), expected);
	assert!(matches!(
		&recorded(&repository)[0],
		Call::Fetch(query) if query.max_results() == Some(1) && query.first_result().is_none()
	));
}

/// Test criteria errors stop before the backend
///
/// **Test Intent**: Verify parse errors are returned without any backend call
#[rstest]
#[tokio::test]
async fn test_criteria_error_before_backend(backend: RecordingBackend) {
	let repository = Repository::new(backend);

	let result = repository
		.find_by(Criteria::new().term("=deleted", Value::Null), None, None, None)
		.await;

	assert!(matches!(
		result,
		Err(FindError::Criteria(CriteriaError::NullComparison { .. }))
	));
	assert!(recorded(&repository).is_empty());
}

/// Test backend errors are passed through
///
/// **Test Intent**: Verify the backend's own error type reaches the caller
#[rstest]
#[tokio::test]
async fn test_backend_error_passes_through(backend: RecordingBackend) {
	let repository = Repository::new(backend.failing());

	let result = repository
		.find_by(Criteria::new().term("!city", "x"), None, None, None)
		.await;

	match result {
		Err(error) => assert!(error.backend().is_some()),
		Ok(found) => panic!("expected an error, got {:?}", found),
	}
}

/// Test encoded listing requests
///
/// **Test Intent**: Verify a base64 request is decoded and run through find_by
#[rstest]
#[tokio::test]
async fn test_search_request(backend: RecordingBackend) {
	let repository = Repository::new(backend);
	let find_by = STANDARD.encode(r#"{"city": "Berlin", "0": {"city": "Hamburg"}}"#);
	let request = SearchRequest::decode(&find_by, None, Some(20), None).unwrap();

	repository.search(request).await.unwrap();

	match &recorded(&repository)[..] {
		[Call::FindByEquality { filter, limit, .. }] => {
			assert_eq!(filter.terms().len(), 2);
			assert_eq!(*limit, Some(20));
		}
		other => panic!("unexpected calls {:?}", other),
	}
}
