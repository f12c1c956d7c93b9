//! Base-vs-target comparison of resource documents.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::{
    document::{Baseline, ResourceDocument},
    types::QuantityMap,
};

/// What a target document lacks compared with its base language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    /// Entry keys present in the base and absent from the target.
    pub missing_entries: BTreeSet<String>,
    /// Groups to regenerate, each with the base's full quantity map.
    pub missing_groups: BTreeMap<String, QuantityMap>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.missing_entries.is_empty() && self.missing_groups.is_empty()
    }

    /// Every key that is about to be (re)generated.
    pub fn pending_keys(&self) -> BTreeSet<&str> {
        self.missing_entries
            .iter()
            .chain(self.missing_groups.keys())
            .map(String::as_str)
            .collect()
    }
}

fn diff_maps(
    base_entries: &BTreeMap<String, String>,
    base_groups: &BTreeMap<String, QuantityMap>,
    target: &ResourceDocument,
) -> DiffResult {
    let missing_entries = base_entries
        .keys()
        .filter(|key| target.entry(key).is_none())
        .cloned()
        .collect();

    // A group is pending unless the target carries exactly the base's
    // quantities. Languages whose plural rules need other quantities than the
    // base therefore regenerate their groups on every run, the merge keeps
    // their existing text.
    let missing_groups = base_groups
        .iter()
        .filter(|(key, base_forms)| match target.group(key) {
            None => true,
            Some(target_forms) => !base_forms.keys().eq(target_forms.keys()),
        })
        .map(|(key, forms)| (key.clone(), forms.clone()))
        .collect();

    DiffResult {
        missing_entries,
        missing_groups,
    }
}

/// Compares `target` with the merged base-language resources of its module.
pub fn diff(base: &Baseline, target: &ResourceDocument) -> DiffResult {
    diff_maps(&base.entries, &base.groups, target)
}

/// Compares `target` with a single base-language document.
pub fn diff_documents(base: &ResourceDocument, target: &ResourceDocument) -> DiffResult {
    diff_maps(base.entries(), base.groups(), target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, QuantityCategory};

    fn parse(language: &str, xml: &str) -> ResourceDocument {
        let language = Language::from(language);
        ResourceDocument::parse_str(format!("values-{}/strings.xml", language), language, xml)
            .unwrap()
    }

    #[test]
    fn test_missing_entries() {
        let base = parse(
            "default",
            r#"<resources><string name="hello">Hello</string><string name="bye">Bye</string></resources>"#,
        );
        let target = parse("es", r#"<resources><string name="hello">Hola</string></resources>"#);

        let result = diff_documents(&base, &target);
        assert_eq!(
            result.missing_entries,
            BTreeSet::from(["bye".to_string()])
        );
        assert!(result.missing_groups.is_empty());
        assert!(!result.is_empty());
    }

    #[test]
    fn test_extra_target_keys_are_ignored() {
        let base = parse("default", r#"<resources><string name="a">A</string></resources>"#);
        let target = parse(
            "es",
            r#"<resources><string name="a">A</string><string name="legacy">Viejo</string></resources>"#,
        );
        assert!(diff_documents(&base, &target).is_empty());
    }

    #[test]
    fn test_group_with_different_quantities_is_pending_in_full() {
        let base = parse(
            "default",
            r#"<resources><plurals name="days"><item quantity="one">%d day</item><item quantity="other">%d days</item></plurals></resources>"#,
        );
        let target = parse(
            "es",
            r#"<resources><plurals name="days"><item quantity="other">dies</item></plurals></resources>"#,
        );

        let result = diff_documents(&base, &target);
        let pending = &result.missing_groups["days"];
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[&QuantityCategory::One], "%d day");
        assert_eq!(pending[&QuantityCategory::Other], "%d days");
    }

    #[test]
    fn test_group_with_extra_quantities_is_pending() {
        let base = parse(
            "default",
            r#"<resources><plurals name="days"><item quantity="one">%d day</item><item quantity="other">%d days</item></plurals></resources>"#,
        );
        let target = parse(
            "ru",
            r#"<resources><plurals name="days"><item quantity="one">%d день</item><item quantity="few">%d дня</item><item quantity="many">%d дней</item><item quantity="other">%d дня</item></plurals></resources>"#,
        );
        assert!(diff_documents(&base, &target).missing_groups.contains_key("days"));
    }

    #[test]
    fn test_identical_quantity_sets_are_complete() {
        let base = parse(
            "default",
            r#"<resources><plurals name="days"><item quantity="one">%d day</item><item quantity="other">%d days</item></plurals></resources>"#,
        );
        let target = parse(
            "es",
            r#"<resources><plurals name="days"><item quantity="one">%d día</item><item quantity="other">%d días</item></plurals></resources>"#,
        );
        assert!(diff_documents(&base, &target).is_empty());
    }

    #[test]
    fn test_diff_after_merge_is_empty() {
        let base = parse(
            "default",
            r#"<resources><string name="hello">Hello</string><plurals name="days"><item quantity="one">%d day</item><item quantity="other">%d days</item></plurals></resources>"#,
        );
        let mut target = parse(
            "es",
            r#"<resources><plurals name="days"><item quantity="other">dies</item></plurals></resources>"#,
        );

        let result = diff_documents(&base, &target);
        for key in &result.missing_entries {
            target.set_entry(key.clone(), "traducido");
        }
        for (key, forms) in &result.missing_groups {
            target.merge_group(key, forms.clone());
        }

        assert!(diff_documents(&base, &target).is_empty());
        assert_eq!(target.group("days").unwrap()[&QuantityCategory::Other], "dies");
    }

    #[test]
    fn test_pending_keys() {
        let base = parse(
            "default",
            r#"<resources><string name="a">A</string><plurals name="p"><item quantity="other">P</item></plurals></resources>"#,
        );
        let target = parse("es", "<resources/>");
        let result = diff_documents(&base, &target);
        assert_eq!(result.pending_keys(), BTreeSet::from(["a", "p"]));
    }

    #[test]
    fn test_diff_against_baseline() {
        let first = parse("default", r#"<resources><string name="a">A</string></resources>"#);
        let second = parse("default", r#"<resources><string name="b">B</string></resources>"#);
        let baseline = Baseline::from_documents([&first, &second]);
        let target = parse("es", r#"<resources><string name="b">Be</string></resources>"#);
        assert_eq!(
            diff(&baseline, &target).missing_entries,
            BTreeSet::from(["a".to_string()])
        );
    }
}
