use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRange {
    pub start: u64,
    pub end: u64,
    pub description: String,
}

impl DomainRange {
    pub fn contains(&self, site: u64) -> bool {
        self.start <= site && site <= self.end
    }

    pub fn range_string(&self) -> String {
        format!("{}-{}", self.start, self.end)
    }
}

/// Intervals in insertion order; the first interval containing a site wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DomainRangeMap {
    ranges: Vec<DomainRange>,
}

/// Domain annotation for one site; both fields empty when no interval covers it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiteDomain {
    pub domain: String,
    pub range: String,
}

impl DomainRangeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interval, replacing the description of an identical interval in place.
    pub fn insert(&mut self, start: u64, end: u64, description: impl Into<String>) {
        let description = description.into();
        if let Some(existing) = self
            .ranges
            .iter_mut()
            .find(|range| range.start == start && range.end == end)
        {
            existing.description = description;
            return;
        }
        self.ranges.push(DomainRange {
            start,
            end,
            description,
        });
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainRange> {
        self.ranges.iter()
    }

    pub fn lookup(&self, site: u64) -> Option<&DomainRange> {
        self.ranges.iter().find(|range| range.contains(site))
    }

    pub fn resolve(&self, site: Option<u64>) -> SiteDomain {
        match site.and_then(|site| self.lookup(site)) {
            Some(range) => SiteDomain {
                domain: range.description.clone(),
                range: range.range_string(),
            },
            None => SiteDomain::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_containing_interval() {
        let mut map = DomainRangeMap::new();
        map.insert(10, 20, "X");
        assert_eq!(
            map.resolve(Some(15)),
            SiteDomain {
                domain: "X".to_string(),
                range: "10-20".to_string()
            }
        );
        assert_eq!(map.resolve(Some(25)), SiteDomain::default());
    }

    #[test]
    fn bounds_are_inclusive() {
        let mut map = DomainRangeMap::new();
        map.insert(10, 20, "X");
        assert_eq!(map.resolve(Some(10)).range, "10-20");
        assert_eq!(map.resolve(Some(20)).range, "10-20");
        assert_eq!(map.resolve(Some(9)), SiteDomain::default());
        assert_eq!(map.resolve(None), SiteDomain::default());
    }

    #[test]
    fn first_inserted_interval_wins() {
        let mut map = DomainRangeMap::new();
        map.insert(30, 60, "outer");
        map.insert(40, 50, "inner");
        assert_eq!(map.resolve(Some(45)).domain, "outer");
    }

    #[test]
    fn duplicate_interval_replaces_description() {
        let mut map = DomainRangeMap::new();
        map.insert(1, 5, "first");
        map.insert(8, 9, "other");
        map.insert(1, 5, "second");
        assert_eq!(map.len(), 2);
        assert_eq!(map.iter().next().unwrap().description, "second");
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut map = DomainRangeMap::new();
        map.insert(10, 20, "Ig-like");
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "start": 10, "end": 20, "description": "Ig-like" }])
        );
    }
}
