#![allow(unused_crate_dependencies)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use qualia::{ExtensionKey, MetadataRead, Qualifier, keys, qualify};
use rstest::rstest;

/// A temperature; declared without any trait so only the fallback tiers apply.
pub struct Celsius(f64);

/// Temperature accessors.
#[qualify(category = Celsius, meta(unit = "C"))]
pub mod celsius_ext {
	use super::Celsius;

	pub fn get_degrees(c: &Celsius) -> f64 {
		c.0
	}

	pub fn set_degrees(c: &mut Celsius, degrees: f64) {
		c.0 = degrees;
	}

	pub fn is_freezing(c: &Celsius) -> bool {
		c.0 <= 0.0
	}

	pub fn describe(c: &Celsius, precision: usize) -> String {
		format!("{:.*}", precision, c.0)
	}
}

#[qualify(category = std::path::PathBuf, module = paths)]
pub mod path_ext {
	pub fn get_extension(p: &std::path::PathBuf) -> Option<String> {
		p.extension().map(|e| e.to_string_lossy().into_owned())
	}

	pub fn get_file_name(p: &std::path::PathBuf) -> Option<String> {
		p.file_name().map(|e| e.to_string_lossy().into_owned())
	}
}

#[test]
fn category_functions_become_properties() {
	let bean = qualia::bean::<Celsius>().expect("Celsius is registered");
	let names: Vec<&str> = bean.properties().iter().map(|p| p.name()).collect();
	assert_eq!(names, vec!["degrees", "freezing"]);
	assert_eq!(bean.type_name(), Ok("Celsius".to_string()));
	assert_eq!(bean.metadata().get(&ExtensionKey::<String>::named("unit")).as_deref(), Some("C"));
	assert_eq!(bean.metadata().get(&keys::DESCRIPTION).as_deref(), Some("Temperature accessors."));
}

#[rstest]
#[case(-3.5, true)]
#[case(0.0, true)]
#[case(21.0, false)]
fn category_getters_and_setters(#[case] degrees: f64, #[case] freezing: bool) {
	let mut t = Celsius(100.0);
	celsius_qualifier::DEGREES.set(&mut t, degrees).unwrap();
	assert_eq!(celsius_qualifier::DEGREES.get(&t), Ok(Some(degrees)));
	assert_eq!(celsius_qualifier::FREEZING.get(&t), Ok(Some(freezing)));
	assert!(!celsius_qualifier::FREEZING.is_writable());
	assert_eq!(celsius_ext::describe(&t, 1), format!("{degrees:.1}"));
}

#[test]
fn foreign_types_can_be_qualified() {
	let path = PathBuf::from("/tmp/report.json");
	assert_eq!(paths::EXTENSION.get(&path), Ok(Some("json".to_string())));
	assert_eq!(paths::FILE_NAME.get(&PathBuf::from("/")), Ok(None));

	let bean = qualia::bean::<PathBuf>().expect("PathBuf is registered");
	let file_name = bean.property("file_name").unwrap().unwrap();
	assert_eq!(file_name.get_as::<String>(&path), Ok(Some("report.json".to_string())));
}

#[test]
fn unordered_models_compare_equal() {
	let cmp = qualia::bean::<Celsius>().unwrap().comparator();
	assert_eq!(cmp.compare(&Celsius(1.0), &Celsius(2.0)), std::cmp::Ordering::Equal);
	assert!(qualia::bean::<Celsius>().unwrap().as_property().get(&Celsius(1.0)).is_err());
}
