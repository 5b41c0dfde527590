use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::money::Money;
use super::period::FiscalYear;
use super::settings::SettingsError;
use super::transaction::{BudgetPath, FundType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
    pub name: String,
    /// Extra keywords that identify this item in a 예산과목 value or a 적요.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategorySpec {
    pub name: String,
    pub items: Vec<ItemSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpec {
    pub name: String,
    /// Fund types this category applies to. Empty means every fund type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funds: Vec<FundType>,
    pub subcategories: Vec<SubcategorySpec>,
}

/// Planned amounts for one budget year, keyed by 예산과목.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedBudget {
    pub year: FiscalYear,
    #[serde(default)]
    pub amounts: BTreeMap<String, Money>,
}

/// Built-in hierarchy: 예산목 → [(세목, [예산과목])].
pub const DEFAULT_TAXONOMY: &[(&str, &[(&str, &[&str])])] = &[
    ("인건비", &[("일용임금", &["일용임금"])]),
    ("민간이전", &[("고용부담금", &["일용직 고용부담금"])]),
    (
        "운영비",
        &[
            ("일반수용비", &["지급수수료", "도서인쇄비", "소모품비", "홍보비"]),
            ("공공요금및제세", &["제세공과금", "통신비", "보험료"]),
            ("피복비", &["피복비"]),
            ("임차료", &["임차료"]),
            ("유류비", &["유류비"]),
            ("시설장비유지비", &["시설장비유지비"]),
            (
                "복리후생비",
                &["급여성복리후생비(일용직)", "일용직 비급여성비용"],
            ),
            ("일반용역비", &["행사비", "일반용역비"]),
        ],
    ),
    (
        "여비",
        &[("국내여비", &["국내여비"]), ("국외여비", &["국외업무여비"])],
    ),
    ("업무추진비", &[("사업추진비", &["사업추진비", "회의비"])]),
];

/// Research-only categories appended after [`DEFAULT_TAXONOMY`], with the
/// keywords that route a research row to them.
pub const RESEARCH_TAXONOMY: &[(&str, &str, &str, &[&str])] = &[
    ("연구개발비", "연구개발비", "연구개발비", &["연구비", "연구개발"]),
    (
        "유형자산",
        "자산취득비",
        "자산취득비",
        &["자산취득", "유형자산", "장비구입", "기자재"],
    ),
];

pub fn default_categories() -> Vec<CategorySpec> {
    let mut categories: Vec<CategorySpec> = DEFAULT_TAXONOMY
        .iter()
        .map(|(category, subcategories)| CategorySpec {
            name: category.to_string(),
            funds: Vec::new(),
            subcategories: subcategories
                .iter()
                .map(|(sub, items)| SubcategorySpec {
                    name: sub.to_string(),
                    items: items
                        .iter()
                        .map(|item| ItemSpec {
                            name: item.to_string(),
                            aliases: Vec::new(),
                        })
                        .collect(),
                })
                .collect(),
        })
        .collect();

    categories.extend(RESEARCH_TAXONOMY.iter().map(|(category, sub, item, aliases)| {
        CategorySpec {
            name: category.to_string(),
            funds: vec![FundType::Research],
            subcategories: vec![SubcategorySpec {
                name: sub.to_string(),
                items: vec![ItemSpec {
                    name: item.to_string(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                }],
            }],
        }
    }));

    categories
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxonomyEntry {
    pub path: BudgetPath,
    pub aliases: Vec<String>,
    funds: Vec<FundType>,
}

impl TaxonomyEntry {
    pub fn applies_to(&self, fund: FundType) -> bool {
        self.funds.is_empty() || self.funds.contains(&fund)
    }

    /// Item name followed by its aliases.
    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.path.item.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Validated, immutable budget hierarchy with planned amounts per year.
/// Entries keep the configured order, which is the order every report uses.
#[derive(Debug, Clone)]
pub struct BudgetTaxonomy {
    entries: Vec<TaxonomyEntry>,
    by_item: HashMap<String, usize>,
    planned: BTreeMap<FiscalYear, BTreeMap<String, Money>>,
}

impl BudgetTaxonomy {
    pub fn new(
        categories: &[CategorySpec],
        planned: &[PlannedBudget],
    ) -> Result<Self, SettingsError> {
        let mut entries = Vec::new();
        let mut by_item = HashMap::new();

        for category in categories {
            if category.funds.contains(&FundType::Unclassified) {
                return Err(SettingsError::Invalid(format!(
                    "category '{}' cannot be scoped to unclassified",
                    category.name
                )));
            }
            for sub in &category.subcategories {
                for item in &sub.items {
                    if item.name.trim().is_empty() {
                        return Err(SettingsError::Invalid(format!(
                            "empty item name under '{}' > '{}'",
                            category.name, sub.name
                        )));
                    }
                    if by_item.insert(item.name.clone(), entries.len()).is_some() {
                        return Err(SettingsError::DuplicateItem(item.name.clone()));
                    }
                    entries.push(TaxonomyEntry {
                        path: BudgetPath {
                            category: category.name.clone(),
                            subcategory: sub.name.clone(),
                            item: item.name.clone(),
                        },
                        aliases: item.aliases.clone(),
                        funds: category.funds.clone(),
                    });
                }
            }
        }

        let mut planned_by_year: BTreeMap<FiscalYear, BTreeMap<String, Money>> = BTreeMap::new();
        for budget in planned {
            let year = planned_by_year.entry(budget.year).or_default();
            for (item, amount) in &budget.amounts {
                if !by_item.contains_key(item) {
                    return Err(SettingsError::UnknownPlannedItem {
                        year: budget.year,
                        item: item.clone(),
                    });
                }
                *year.entry(item.clone()).or_default() += *amount;
            }
        }

        Ok(Self {
            entries,
            by_item,
            planned: planned_by_year,
        })
    }

    pub fn entries(&self) -> &[TaxonomyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position(&self, item: &str) -> Option<usize> {
        self.by_item.get(item).copied()
    }

    pub fn find(&self, item: &str) -> Option<&TaxonomyEntry> {
        self.position(item).map(|i| &self.entries[i])
    }

    pub fn contains(&self, path: &BudgetPath) -> bool {
        self.find(&path.item).is_some_and(|e| &e.path == path)
    }

    /// Entries applicable to `fund`, longest keyword first, paired with the
    /// keyword. Used for partial matching so that a longer name wins over a
    /// name it contains.
    pub fn keyword_index(&self, fund: FundType) -> Vec<(&str, &TaxonomyEntry)> {
        let mut index: Vec<(&str, &TaxonomyEntry)> = self
            .entries
            .iter()
            .filter(|e| e.applies_to(fund))
            .flat_map(|e| e.keywords().map(move |k| (k, e)))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        index.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()));
        index
    }

    pub fn planned(&self, item: &str, year: FiscalYear) -> Money {
        self.planned
            .get(&year)
            .and_then(|amounts| amounts.get(item))
            .copied()
            .unwrap_or_default()
    }

    pub fn planned_total(&self, year: FiscalYear) -> Money {
        self.planned
            .get(&year)
            .map(|amounts| amounts.values().sum())
            .unwrap_or_default()
    }

    pub fn planned_years(&self) -> BTreeSet<FiscalYear> {
        self.planned.keys().copied().collect()
    }

    /// `(year, item, planned)` for every configured figure, by year and then
    /// taxonomy order.
    pub fn planned_history(&self) -> Vec<(FiscalYear, &TaxonomyEntry, Money)> {
        let mut rows = Vec::new();
        for (year, amounts) in &self.planned {
            for entry in &self.entries {
                if let Some(amount) = amounts.get(&entry.path.item) {
                    rows.push((*year, entry, *amount));
                }
            }
        }
        rows
    }
}
