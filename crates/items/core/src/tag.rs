//! Hierarchical gameplay tags, ordered tag sets and tag queries.
//!
//! A [`Tag`] is a dotted name such as `Item.AutoSlot.Replace`. Matching is
//! hierarchical: `Item.Weapon.Sword` matches `Item.Weapon` and `Item`, but not
//! `Item.Weap`. Tags are used as container ids, stat keys, rule filters and
//! context flags.

use core::fmt;

/// Dotted hierarchical name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Tag(String);

impl Tag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A tag is valid when it is non-empty and has no empty segments.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.split('.').all(|segment| !segment.is_empty())
    }

    /// Returns true if `self` equals `other` or is nested under it.
    pub fn matches(&self, other: &Tag) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        self.0 == other.0
            || (self.0.len() > other.0.len()
                && self.0.starts_with(other.as_str())
                && self.0.as_bytes()[other.0.len()] == b'.')
    }

    pub fn matches_exact(&self, other: &Tag) -> bool {
        self.is_valid() && self.0 == other.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Tag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Tag {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Insertion-ordered set of tags.
///
/// Order matters: tag-keyed stock rules pick the first tag of an item that
/// has a configured limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds a tag, ignoring duplicates and invalid tags.
    pub fn insert(&mut self, tag: impl Into<Tag>) -> bool {
        let tag = tag.into();
        if !tag.is_valid() || self.0.contains(&tag) {
            return false;
        }
        self.0.push(tag);
        true
    }

    pub fn remove(&mut self, tag: &Tag) -> bool {
        let before = self.0.len();
        self.0.retain(|t| t != tag);
        before != self.0.len()
    }

    pub fn extend_from(&mut self, other: &TagSet) {
        for tag in other.iter() {
            self.insert(tag.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Hierarchical containment: any tag in the set matches `tag`.
    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.0.iter().any(|t| t.matches(tag))
    }

    pub fn has_tag_exact(&self, tag: &Tag) -> bool {
        self.0.iter().any(|t| t.matches_exact(tag))
    }

    /// True when every tag of `other` is matched. Empty `other` is always true.
    pub fn has_all(&self, other: &TagSet) -> bool {
        other.iter().all(|t| self.has_tag(t))
    }

    /// True when at least one tag of `other` is matched. Empty `other` is false.
    pub fn has_any(&self, other: &TagSet) -> bool {
        other.iter().any(|t| self.has_tag(t))
    }
}

impl<T: Into<Tag>> FromIterator<T> for TagSet {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for tag in iter {
            set.insert(tag);
        }
        set
    }
}

/// Boolean expression over a tag set.
///
/// The default query is empty; rules treat an empty query as "no filter".
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagQuery {
    AnyTagsMatch(Vec<Tag>),
    AllTagsMatch(Vec<Tag>),
    NoTagsMatch(Vec<Tag>),
    AnyExprMatch(Vec<TagQuery>),
    AllExprMatch(Vec<TagQuery>),
    NoExprMatch(Vec<TagQuery>),
}

impl Default for TagQuery {
    fn default() -> Self {
        TagQuery::AllExprMatch(Vec::new())
    }
}

impl TagQuery {
    pub fn any(tags: impl IntoIterator<Item = impl Into<Tag>>) -> Self {
        TagQuery::AnyTagsMatch(tags.into_iter().map(Into::into).collect())
    }

    pub fn all(tags: impl IntoIterator<Item = impl Into<Tag>>) -> Self {
        TagQuery::AllTagsMatch(tags.into_iter().map(Into::into).collect())
    }

    /// A query with no tags anywhere in its tree.
    pub fn is_empty(&self) -> bool {
        match self {
            TagQuery::AnyTagsMatch(tags)
            | TagQuery::AllTagsMatch(tags)
            | TagQuery::NoTagsMatch(tags) => tags.is_empty(),
            TagQuery::AnyExprMatch(exprs)
            | TagQuery::AllExprMatch(exprs)
            | TagQuery::NoExprMatch(exprs) => exprs.iter().all(TagQuery::is_empty),
        }
    }

    pub fn matches(&self, tags: &TagSet) -> bool {
        match self {
            TagQuery::AnyTagsMatch(query) => query.iter().any(|t| tags.has_tag(t)),
            TagQuery::AllTagsMatch(query) => query.iter().all(|t| tags.has_tag(t)),
            TagQuery::NoTagsMatch(query) => !query.iter().any(|t| tags.has_tag(t)),
            TagQuery::AnyExprMatch(exprs) => exprs.iter().any(|e| e.matches(tags)),
            TagQuery::AllExprMatch(exprs) => exprs.iter().all(|e| e.matches(tags)),
            TagQuery::NoExprMatch(exprs) => !exprs.iter().any(|e| e.matches(tags)),
        }
    }

    /// Empty queries pass everything.
    pub fn passes(&self, tags: &TagSet) -> bool {
        self.is_empty() || self.matches(tags)
    }
}

/// Require/ignore/query filter shared by requirement and auto-slot rules.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TagFilter {
    pub require_tags: TagSet,
    pub ignore_tags: TagSet,
    pub query: TagQuery,
}

impl TagFilter {
    pub fn passes(&self, tags: &TagSet) -> bool {
        tags.has_all(&self.require_tags) && !tags.has_any(&self.ignore_tags) && self.query.passes(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> TagSet {
        names.iter().copied().collect()
    }

    #[test]
    fn hierarchical_match_respects_segment_boundaries() {
        let sword = Tag::from("Item.Weapon.Sword");
        assert!(sword.matches(&Tag::from("Item.Weapon")));
        assert!(sword.matches(&Tag::from("Item")));
        assert!(!sword.matches(&Tag::from("Item.Weap")));
        assert!(!Tag::from("Item").matches(&sword));
    }

    #[test]
    fn invalid_tags_are_not_inserted() {
        let mut set = TagSet::new();
        assert!(!set.insert(""));
        assert!(!set.insert("Item..Sword"));
        assert!(set.insert("Item.Sword"));
        assert!(!set.insert("Item.Sword"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn tag_set_preserves_insertion_order() {
        let set = tags(&["B", "A", "C"]);
        let order: Vec<_> = set.iter().map(Tag::as_str).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[test]
    fn query_expressions() {
        let item = tags(&["Item.Weapon.Sword", "Item.Rare"]);
        assert!(TagQuery::any(["Item.Weapon"]).matches(&item));
        assert!(!TagQuery::all(["Item.Weapon", "Item.Armor"]).matches(&item));
        assert!(TagQuery::NoTagsMatch(vec!["Item.Armor".into()]).matches(&item));
        let nested = TagQuery::AllExprMatch(vec![
            TagQuery::any(["Item.Rare"]),
            TagQuery::NoExprMatch(vec![TagQuery::any(["Item.Cursed"])]),
        ]);
        assert!(nested.matches(&item));
    }

    #[test]
    fn empty_query_passes_everything() {
        assert!(TagQuery::default().is_empty());
        assert!(TagQuery::default().passes(&TagSet::new()));
        assert!(TagQuery::AnyExprMatch(vec![TagQuery::any(Vec::<Tag>::new())]).is_empty());
    }

    #[test]
    fn filter_combines_require_ignore_and_query() {
        let filter = TagFilter {
            require_tags: tags(&["Item.Weapon"]),
            ignore_tags: tags(&["Item.Broken"]),
            query: TagQuery::default(),
        };
        assert!(filter.passes(&tags(&["Item.Weapon.Axe"])));
        assert!(!filter.passes(&tags(&["Item.Weapon.Axe", "Item.Broken"])));
        assert!(!filter.passes(&tags(&["Item.Armor"])));
    }
}
