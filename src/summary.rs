// Ledger-level overview used by `edefter inspect`
use crate::flatten::locate_entries;
use crate::model::QName;
use crate::schema::anchors;
use crate::tree::ElementTree;
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub unique_id: Option<String>,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub headers: usize,
    pub details: usize,
    pub max_details_per_header: usize,
    pub empty_headers: usize,
}

impl LedgerSummary {
    pub fn from_tree<T: ElementTree>(tree: &T) -> Result<Self> {
        let entries = locate_entries(tree)?;

        let unique_id = first_text(tree, entries, &QName::new("gl-cor", "uniqueID"))?;
        let period_start = first_date(tree, entries, &QName::new("gl-cor", "periodCoveredStart"))?;
        let period_end = first_date(tree, entries, &QName::new("gl-cor", "periodCoveredEnd"))?;

        let entry_detail = anchors::entry_detail();
        let headers = tree.find_all(entries, &anchors::entry_header())?;

        let mut details = 0;
        let mut max_details_per_header = 0;
        let mut empty_headers = 0;
        for header in &headers {
            let count = tree.find_all(*header, &entry_detail)?.len();
            details += count;
            max_details_per_header = max_details_per_header.max(count);
            if count == 0 {
                empty_headers += 1;
            }
        }

        Ok(Self {
            unique_id,
            period_start,
            period_end,
            headers: headers.len(),
            details,
            max_details_per_header,
            empty_headers,
        })
    }

    /// Inclusive length of the covered period in days.
    pub fn period_days(&self) -> Option<i64> {
        match (self.period_start, self.period_end) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_days() + 1),
            _ => None,
        }
    }
}

fn first_text<T: ElementTree>(tree: &T, scope: T::Node, name: &QName) -> Result<Option<String>> {
    match tree.find_first(scope, name)? {
        Some(node) => Ok(Some(tree.text(node)?)),
        None => Ok(None),
    }
}

fn first_date<T: ElementTree>(tree: &T, scope: T::Node, name: &QName) -> Result<Option<NaiveDate>> {
    let Some(text) = first_text(tree, scope, name)? else {
        return Ok(None);
    };
    match NaiveDate::parse_from_str(text.trim(), DATE_FORMAT) {
        Ok(date) => Ok(Some(date)),
        Err(err) => {
            log::warn!("ignoring unparseable {} '{}': {}", name, text.trim(), err);
            Ok(None)
        }
    }
}
