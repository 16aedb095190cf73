use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Per-category aggregate as returned by `/statistics/category-summary`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotals {
    #[serde(default = "nan", deserialize_with = "lenient_f64")]
    pub total: f64,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryEntry {
    pub name: String,
    pub totals: CategoryTotals,
}

/// Category name to totals, kept in the order the keys appear in the response.
///
/// Chart node indices are derived from this order, so it must not be re-sorted
/// (a `HashMap`/`BTreeMap` would lose it).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryBreakdown {
    entries: Vec<CategoryEntry>,
}

impl CategoryBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces; a replaced key keeps its original position.
    pub fn insert(&mut self, name: impl Into<String>, totals: CategoryTotals) {
        let name = name.into();
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.totals = totals,
            None => self.entries.push(CategoryEntry { name, totals }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CategoryTotals> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.totals)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|e| e.totals.total).sum()
    }
}

impl<S: Into<String>> FromIterator<(S, CategoryTotals)> for CategoryBreakdown {
    fn from_iter<I: IntoIterator<Item = (S, CategoryTotals)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (name, totals) in iter {
            out.insert(name, totals);
        }
        out
    }
}

impl Serialize for CategoryBreakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for e in &self.entries {
            map.serialize_entry(&e.name, &e.totals)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryBreakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BreakdownVisitor;

        impl<'de> Visitor<'de> for BreakdownVisitor {
            type Value = CategoryBreakdown;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of category name to {total, count}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = CategoryBreakdown::new();
                while let Some((name, totals)) = access.next_entry::<String, CategoryTotals>()? {
                    out.insert(name, totals);
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(BreakdownVisitor)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTotals {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub income: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub expenses: f64,
}

/// Income/expense totals grouped by category for one date range.
///
/// `income` or `expenses` being absent (or `null`) marks the summary as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    #[serde(default)]
    pub income: Option<CategoryBreakdown>,
    #[serde(default)]
    pub expenses: Option<CategoryBreakdown>,
    #[serde(default)]
    pub totals: SummaryTotals,
}

impl CategorySummary {
    pub fn is_empty(&self) -> bool {
        self.income.is_none() || self.expenses.is_none()
    }
}

fn nan() -> f64 {
    f64::NAN
}

// Totals that are not numbers become NaN instead of failing the whole response.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(deserializer)?;
    Ok(match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    })
}
