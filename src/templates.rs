use crate::models::{QueryTemplate, TemplateCategory};
use once_cell::sync::Lazy;

/// Editor text for a fresh session with no share token.
pub const DEFAULT_QUERY: &str = "-- Department spending, largest first\nSELECT department, SUM(amount) AS total\nFROM county_budget\nGROUP BY department\nORDER BY total DESC";

static CATALOG: Lazy<Vec<QueryTemplate>> = Lazy::new(|| {
    vec![
        QueryTemplate {
            name: "Department spending",
            description: "Total budgeted amount per department, largest first",
            sql: DEFAULT_QUERY,
            category: TemplateCategory::Budget,
        },
        QueryTemplate {
            name: "Budget growth by year",
            description: "Year-over-year total county budget",
            sql: "-- Total budget per fiscal year\nSELECT fiscal_year, SUM(amount) AS total\nFROM county_budget\nGROUP BY fiscal_year\nORDER BY fiscal_year",
            category: TemplateCategory::Budget,
        },
        QueryTemplate {
            name: "Per-pupil spending",
            description: "District expenditures divided by enrollment",
            sql: "-- Per-pupil current expenditures by district\nSELECT d.district, e.total_expenditure * 1.0 / NULLIF(n.students, 0) AS per_pupil\nFROM districts d\nJOIN expenditures e ON e.leaid = d.leaid\nJOIN enrollment n ON n.leaid = d.leaid\nORDER BY per_pupil DESC",
            category: TemplateCategory::Schools,
        },
        QueryTemplate {
            name: "Enrollment trend",
            description: "Student counts per district per year",
            sql: "-- Enrollment by district and year\nSELECT district, year, students\nFROM enrollment\nORDER BY district, year",
            category: TemplateCategory::Schools,
        },
        QueryTemplate {
            name: "Top taxpayers",
            description: "Owners ranked by total assessed value",
            sql: "-- Largest property owners by assessed value\nSELECT owner, COUNT(*) AS parcels, SUM(assessed_value) AS total_value\nFROM real_estate_tax\nGROUP BY owner\nORDER BY total_value DESC\nLIMIT 50",
            category: TemplateCategory::Property,
        },
        QueryTemplate {
            name: "Tax by district",
            description: "Real-estate tax billed per magisterial district",
            sql: "-- Tax amount per district\nSELECT district, SUM(tax_amount) AS billed, COUNT(*) AS property_count\nFROM real_estate_tax\nGROUP BY district\nORDER BY billed DESC",
            category: TemplateCategory::Property,
        },
        QueryTemplate {
            name: "Salaries by office",
            description: "Government payroll grouped by office",
            sql: "-- Payroll totals per office\nSELECT office, COUNT(*) AS positions, SUM(salary) AS payroll\nFROM county_government_analysis\nGROUP BY office\nORDER BY payroll DESC",
            category: TemplateCategory::Government,
        },
        QueryTemplate {
            name: "Largest parcels",
            description: "Parcels by acreage with coordinates for mapping",
            sql: "-- Biggest parcels with map coordinates\nSELECT parcel_id, owner, acreage, latitude, longitude\nFROM county_parcels\nORDER BY acreage DESC\nLIMIT 200",
            category: TemplateCategory::Gis,
        },
        QueryTemplate {
            name: "Zoning mix",
            description: "Parcel count and acreage per zoning code",
            sql: "-- Acreage by zoning code\nSELECT zoning, COUNT(*) AS parcels, SUM(acreage) AS acres\nFROM county_parcels\nGROUP BY zoning\nORDER BY acres DESC",
            category: TemplateCategory::Gis,
        },
    ]
});

pub fn catalog() -> &'static [QueryTemplate] {
    &CATALOG
}

pub fn template_named(name: &str) -> Option<&'static QueryTemplate> {
    CATALOG.iter().find(|template| template.name == name)
}

/// Collapses every whitespace run to a single space, trims, and lowercases.
/// Matching is insensitive to re-indentation and trailing blank lines.
pub fn normalize(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact match against the catalog after normalization. First entry in
/// catalog order wins; absence is a normal outcome.
pub fn find_match(sql: &str) -> Option<&'static QueryTemplate> {
    let normalized = normalize(sql);
    CATALOG
        .iter()
        .find(|template| normalize(template.sql) == normalized)
}

#[cfg(test)]
mod tests {
    use super::{catalog, find_match, normalize, template_named};
    use crate::models::TemplateCategory;

    #[test]
    fn normalization_collapses_and_lowercases() {
        assert_eq!(normalize("  SELECT   *\n  FROM t  "), "select * from t");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["", "  ", "SELECT\t1", "a  B\n\nc", "d\u{e9}j\u{e0} VU"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn reindented_template_text_still_matches() {
        let template = &catalog()[0];
        let reindented = template
            .sql
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("\n   ");
        let matched = find_match(&format!("  {reindented}  ")).expect("match");
        assert_eq!(matched.name, template.name);
    }

    #[test]
    fn edited_template_text_clears_the_match() {
        let template = &catalog()[0];
        let edited = format!("{} WHERE 1 = 1", template.sql);
        assert!(find_match(&edited).is_none());
    }

    #[test]
    fn catalog_entries_are_distinct_after_normalization() {
        let mut normalized: Vec<String> = catalog().iter().map(|t| normalize(t.sql)).collect();
        normalized.sort();
        normalized.dedup();
        assert_eq!(normalized.len(), catalog().len());
    }

    #[test]
    fn every_category_has_a_label_and_an_entry() {
        let categories = [
            TemplateCategory::Budget,
            TemplateCategory::Schools,
            TemplateCategory::Property,
            TemplateCategory::Government,
            TemplateCategory::Gis,
        ];
        for category in categories {
            assert!(!category.label().is_empty());
            assert!(catalog().iter().any(|t| t.category == category));
        }
    }

    #[test]
    fn lookup_by_name() {
        assert!(template_named("Top taxpayers").is_some());
        assert!(template_named("nope").is_none());
    }
}
