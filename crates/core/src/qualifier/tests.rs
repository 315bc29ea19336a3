use std::any::Any;
use std::cmp::Ordering;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::registry::BeanRegistration;

#[derive(Debug, Clone, PartialEq, Default)]
struct Address {
	city: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Person {
	name: String,
	address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Company {
	ceo: Option<Person>,
}

fn city() -> PropertyQualifier<Address, String> {
	PropertyQualifier::builder("city")
		.getter(|a: &Address| Some(a.city.clone()))
		.setter(|a: &mut Address, v: String| {
			a.city = v;
			Ok(())
		})
		.navigator(|a: &mut Address| Some(&mut a.city))
		.value_comparator(Comparator::natural())
		.build()
}

fn name() -> PropertyQualifier<Person, String> {
	PropertyQualifier::builder("name")
		.getter(|p: &Person| Some(p.name.clone()))
		.setter(|p: &mut Person, v: String| {
			p.name = v;
			Ok(())
		})
		.value_comparator(Comparator::natural())
		.build()
}

fn address() -> PropertyQualifier<Person, Address> {
	PropertyQualifier::builder("address")
		.getter(|p: &Person| p.address.clone())
		.setter(|p: &mut Person, v: Address| {
			p.address = Some(v);
			Ok(())
		})
		.navigator(|p: &mut Person| p.address.as_mut())
		.build()
}

fn address_write_back() -> PropertyQualifier<Person, Address> {
	PropertyQualifier::builder("address")
		.getter(|p: &Person| p.address.clone())
		.setter(|p: &mut Person, v: Address| {
			p.address = Some(v);
			Ok(())
		})
		.build()
}

fn address_read_only() -> PropertyQualifier<Person, Address> {
	PropertyQualifier::builder("address")
		.getter(|p: &Person| p.address.clone())
		.build()
}

fn ceo() -> PropertyQualifier<Company, Person> {
	PropertyQualifier::builder("ceo")
		.getter(|c: &Company| c.ceo.clone())
		.setter(|c: &mut Company, v: Person| {
			c.ceo = Some(v);
			Ok(())
		})
		.navigator(|c: &mut Company| c.ceo.as_mut())
		.build()
}

fn typed_store(ty: &str) -> MetadataStore {
	let mut m = MetadataStore::builder();
	m.put(&keys::TYPE, ty.to_string());
	m.freeze()
}

static ADDRESS_BEAN: LazyLock<BeanQualifier<Address>> = LazyLock::new(|| {
	BeanQualifier::new(
		typed_store("Address"),
		vec![city().as_dyn()],
		Comparator::debug(),
		Some(getter(|a: &Address| Some(a.clone()))),
	)
});

static PERSON_BEAN: LazyLock<BeanQualifier<Person>> = LazyLock::new(|| {
	BeanQualifier::new(
		typed_store("Person"),
		vec![name().as_dyn(), address().as_dyn()],
		Comparator::debug(),
		Some(getter(|p: &Person| Some(p.clone()))),
	)
});

fn address_bean() -> &'static (dyn Any + Send + Sync) {
	&*ADDRESS_BEAN
}

fn person_bean() -> &'static (dyn Any + Send + Sync) {
	&*PERSON_BEAN
}

inventory::submit! { BeanRegistration::new::<Address>(address_bean) }
inventory::submit! { BeanRegistration::new::<Person>(person_bean) }

fn person(name: &str, city: Option<&str>) -> Person {
	Person {
		name: name.to_string(),
		address: city.map(|c| Address { city: c.to_string() }),
	}
}

#[test]
fn get_and_set_plain_property() {
	let mut p = person("Ada", None);
	assert_eq!(name().get(&p), Ok(Some("Ada".to_string())));
	name().set(&mut p, "Grace".to_string()).unwrap();
	assert_eq!(p.name, "Grace");
}

#[test]
fn capabilities_reflect_bound_accessors() {
	let write_only: PropertyQualifier<Person, String> = PropertyQualifier::builder("secret")
		.setter(|_: &mut Person, _: String| Ok(()))
		.build();
	assert!(!write_only.is_readable());
	assert!(write_only.is_writable());
	assert_eq!(
		write_only.get(&Person::default()),
		Err(QualifierError::Unsupported {
			path: "secret".to_string(),
			capability: "not readable",
		})
	);

	let always_null: PropertyQualifier<Person, String> =
		PropertyQualifier::builder("ghost").getter(|_: &Person| None).build();
	assert!(always_null.is_readable());
	assert!(!always_null.is_writable());
	assert_eq!(always_null.get(&Person::default()), Ok(None));
	assert_eq!(
		always_null.set(&mut Person::default(), String::new()),
		Err(QualifierError::Unsupported {
			path: "ghost".to_string(),
			capability: "not settable",
		})
	);
}

#[test]
fn compose_reads_through_and_spans_paths() {
	let address_city = address().compose(&city());
	assert_eq!(address_city.name(), "city");
	assert_eq!(address_city.path(), "address.city");
	assert_eq!(
		address_city.metadata().get(&keys::PATH).as_deref(),
		Some("address.city")
	);
	assert_eq!(address_city.get(&person("Ada", Some("London"))), Ok(Some("London".to_string())));
	assert_eq!(address_city.get(&person("Ada", None)), Ok(None));
}

#[test]
fn null_intermediate_short_circuits_reads() {
	static CALLS: AtomicUsize = AtomicUsize::new(0);
	let counting_city: PropertyQualifier<Address, String> = PropertyQualifier::builder("city")
		.getter(|a: &Address| {
			CALLS.fetch_add(1, AtomicOrdering::SeqCst);
			Some(a.city.clone())
		})
		.build();

	let composed = address().compose(&counting_city);
	assert_eq!(composed.get(&person("Ada", None)), Ok(None));
	assert_eq!(CALLS.load(AtomicOrdering::SeqCst), 0);

	assert_eq!(composed.get(&person("Ada", Some("Oslo"))), Ok(Some("Oslo".to_string())));
	assert_eq!(CALLS.load(AtomicOrdering::SeqCst), 1);
}

#[rstest]
#[case::navigator(address())]
#[case::write_back(address_write_back())]
fn composed_writes_reach_the_nested_value(#[case] outer: PropertyQualifier<Person, Address>) {
	let composed = outer.compose(&city());
	assert!(composed.is_writable());

	let mut p = person("Ada", Some("London"));
	composed.set(&mut p, "Paris".to_string()).unwrap();
	assert_eq!(p.address.map(|a| a.city).as_deref(), Some("Paris"));
}

#[rstest]
#[case::navigator(address())]
#[case::write_back(address_write_back())]
fn composed_writes_never_create_intermediates(#[case] outer: PropertyQualifier<Person, Address>) {
	let composed = outer.compose(&city());
	let mut p = person("Ada", None);
	assert_eq!(
		composed.set(&mut p, "Paris".to_string()),
		Err(QualifierError::NullIntermediate {
			path: "address.city".to_string(),
		})
	);
	assert_eq!(p.address, None);
}

#[rstest]
#[case::missing_ceo(Company { ceo: None })]
#[case::missing_address(Company { ceo: Some(person("Ada", None)) })]
fn null_intermediates_report_the_same_path_for_every_grouping(#[case] company: Company) {
	let left = ceo().compose(&address()).compose(&city());
	let right = ceo().compose(&address().compose(&city()));
	let expected = Err(QualifierError::NullIntermediate {
		path: "ceo.address.city".to_string(),
	});

	let (mut a, mut b) = (company.clone(), company.clone());
	assert_eq!(left.set(&mut a, "Paris".to_string()), expected);
	assert_eq!(right.set(&mut b, "Paris".to_string()), expected);
	assert_eq!((a, b), (company.clone(), company));
}

#[test]
fn read_only_outer_makes_composition_read_only() {
	let composed = address_read_only().compose(&city());
	assert!(composed.is_readable());
	assert!(!composed.is_writable());
}

#[test]
fn dotted_paths_resolve_through_registered_beans() {
	let prop = PERSON_BEAN.property("address.city").unwrap().unwrap();
	assert_eq!(prop.path(), "address.city");
	assert_eq!(prop.name(), "city");

	let mut p = person("Ada", Some("Rome"));
	assert_eq!(prop.get_as::<String>(&p), Ok(Some("Rome".to_string())));
	prop.set_as(&mut p, "Turin".to_string()).unwrap();
	assert_eq!(prop.get_as::<String>(&p), Ok(Some("Turin".to_string())));
	assert_eq!(prop.get_as::<String>(&person("Ada", None)), Ok(None));
	assert!(matches!(prop.get_as::<i64>(&p), Err(QualifierError::TypeMismatch { .. })));
}

#[rstest]
#[case("")]
#[case("address.")]
#[case(".city")]
#[case("address..city")]
fn malformed_paths_are_rejected(#[case] path: &str) {
	assert!(matches!(PERSON_BEAN.property(path), Err(QualifierError::InvalidPath(_))));
}

#[rstest]
#[case("nope")]
#[case("address.nope")]
#[case("name.length")]
fn unmatched_segments_resolve_to_none(#[case] path: &str) {
	assert!(PERSON_BEAN.property(path).unwrap().is_none());
}

#[test]
fn property_is_a_qualifier_of_its_value_type() {
	let addr = address();
	let names: Vec<&str> = Qualifier::<Address>::properties(&addr).iter().map(|p| p.name()).collect();
	assert_eq!(names, ["city"]);
	assert!(Qualifier::<String>::properties(&name()).is_empty());
}

#[test]
fn property_comparator_orders_owners_nulls_first() {
	let by_city = address().compose(&city()).comparator().unwrap();
	let mut people = vec![
		person("a", Some("Zagreb")),
		person("b", None),
		person("c", Some("Athens")),
	];
	by_city.sort(&mut people);
	let order: Vec<&str> = people.iter().map(|p| p.name.as_str()).collect();
	assert_eq!(order, ["b", "c", "a"]);
}

#[test]
fn resolved_path_comparator_matches_typed_composition() {
	let resolved = PERSON_BEAN.property("address.city").unwrap().unwrap();
	let cmp = resolved.comparator().unwrap();
	assert_eq!(
		cmp.compare(&person("x", None), &person("y", Some("A"))),
		Ordering::Less
	);
	assert_eq!(
		cmp.compare(&person("x", Some("B")), &person("y", Some("A"))),
		Ordering::Greater
	);
}

#[test]
fn identity_overrides_rename_the_property() {
	let town = city().with_overrides(|m| {
		m.put(&keys::NAME, "town".to_string());
		m.put(&keys::PATH, "town".to_string());
	});
	assert_eq!((town.name(), town.path()), ("town", "town"));
	assert_eq!(town.metadata().get(&keys::PATH).as_deref(), Some("town"));
	assert_eq!(address().compose(&town).path(), "address.town");
	assert_eq!(city().path(), "city");
}

#[test]
fn property_comparator_override_wins_and_survives_composition() {
	let reversed = city().with_overrides(|m| {
		m.put(&keys::property_comparator::<Address>(), Comparator::by_key(
			|a: &Address| Some(a.city.clone()),
			Comparator::<String>::natural().reversed(),
		));
	});
	let composed = address().compose(&reversed);
	let cmp = composed.comparator().unwrap();
	assert_eq!(
		cmp.compare(&person("x", Some("A")), &person("y", Some("B"))),
		Ordering::Greater
	);
	assert_eq!(
		cmp.compare(&person("x", None), &person("y", Some("B"))),
		Ordering::Less
	);
}

#[test]
fn bean_overrides_are_private_children() {
	let custom = PERSON_BEAN.with_overrides(|m| {
		m.put(&keys::DESCRIPTION, "A human".to_string());
		m.put(&keys::comparator::<Person>(), Comparator::by_key(
			|p: &Person| Some(p.name.len()),
			Comparator::natural(),
		));
	});
	assert_eq!(custom.metadata().get(&keys::DESCRIPTION).as_deref(), Some("A human"));
	assert_eq!(PERSON_BEAN.metadata().get(&keys::DESCRIPTION), None);
	assert_eq!(custom.type_name(), Ok("Person".to_string()));
	assert_eq!(
		custom.comparator().compare(&person("zz", None), &person("aaa", None)),
		Ordering::Less
	);
	assert!(custom.metadata().parent().is_some_and(|p| p.ptr_eq(PERSON_BEAN.metadata())));
}

#[test]
fn missing_type_is_reported() {
	let bean: BeanQualifier<Person> = BeanQualifier::new(MetadataStore::empty(), Vec::new(), Comparator::unordered(), None);
	assert_eq!(
		bean.type_name(),
		Err(QualifierError::MissingMetadata {
			key: "qualia.type".to_string()
		})
	);
}

#[test]
fn identity_property_is_neutral_in_compositions() {
	let this = PERSON_BEAN.as_property();
	assert_eq!(this.name(), "self");
	assert_eq!(this.path(), "");
	assert_eq!(this.metadata().get(&keys::NAME).as_deref(), Some("self"));

	let composed = this.compose(&name());
	assert_eq!(composed.path(), "name");
	assert_eq!(composed.get(&person("Ada", None)), Ok(Some("Ada".to_string())));

	let mut p = person("Ada", None);
	this.set(&mut p, person("Bob", Some("Kyiv"))).unwrap();
	assert_eq!(p, person("Bob", Some("Kyiv")));
}

#[test]
fn typed_recovers_an_erased_property() {
	let erased = PERSON_BEAN.property("address").unwrap().unwrap();
	assert!(typed::<Person, String>(erased.clone()).is_err());

	let addr = typed::<Person, Address>(erased).unwrap();
	let composed = addr.compose(&city());
	let mut p = person("Ada", Some("Lima"));
	assert_eq!(composed.get(&p), Ok(Some("Lima".to_string())));
	composed.set(&mut p, "Quito".to_string()).unwrap();
	assert_eq!(p.address.map(|a| a.city).as_deref(), Some("Quito"));
}

fn company_strategy() -> impl Strategy<Value = Company> {
	prop::option::of((any::<String>(), prop::option::of(any::<String>()))).prop_map(|ceo| Company {
		ceo: ceo.map(|(name, city)| Person {
			name,
			address: city.map(|city| Address { city }),
		}),
	})
}

proptest! {
	#[test]
	fn composition_is_associative(company in company_strategy(), value in any::<String>()) {
		let left = ceo().compose(&address()).compose(&city());
		let right = ceo().compose(&address().compose(&city()));

		prop_assert_eq!(left.path(), right.path());
		prop_assert_eq!(left.get(&company), right.get(&company));

		let (mut a, mut b) = (company.clone(), company.clone());
		prop_assert_eq!(left.set(&mut a, value.clone()), right.set(&mut b, value));
		prop_assert_eq!(a, b);
	}

	#[test]
	fn write_back_and_navigator_compositions_agree(p in (any::<String>(), prop::option::of(any::<String>())), value in any::<String>()) {
		let mut a = person(&p.0, p.1.as_deref());
		let mut b = a.clone();
		let nav = address().compose(&city());
		let back = address_write_back().compose(&city());
		prop_assert_eq!(nav.set(&mut a, value.clone()), back.set(&mut b, value));
		prop_assert_eq!(a, b);
	}
}
